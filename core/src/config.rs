use std::any::Any;
use std::sync::Arc;

use crate::bridge::Source;
use crate::config_option::ConfigOption;

/// Opaque payload made available to hooks. It takes part in no equality or
/// identity contract.
pub type Context = Arc<dyn Any + Send + Sync>;

#[derive(Debug, Clone, Default)]
pub struct Config {
  pub data: Option<Source>,
  pub instance: Option<Source>,
  pub many: bool,
  pub partial: bool,
  pub context: Option<Context>,
}

impl Config {
  pub fn from(options: impl IntoIterator<Item = ConfigOption>) -> Config {
    let mut config = Config::default();
    for option in options {
      option.apply(&mut config);
    }
    config
  }

  pub fn is_validation_mode(&self) -> bool {
    self.data.is_some()
  }
}
