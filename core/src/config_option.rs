use std::any::Any;
use std::sync::Arc;

use crate::bridge::Source;
use crate::config::{Config, Context};

#[derive(Debug, Clone)]
pub enum ConfigOption {
  SetData(Source),
  SetInstance(Source),
  SetMany(bool),
  SetPartial(bool),
  SetContext(Context),
}

impl ConfigOption {
  pub fn apply(&self, config: &mut Config) {
    match self {
      ConfigOption::SetData(data) => {
        config.data = Some(data.clone());
      }
      ConfigOption::SetInstance(instance) => {
        config.instance = Some(instance.clone());
      }
      ConfigOption::SetMany(many) => {
        config.many = *many;
      }
      ConfigOption::SetPartial(partial) => {
        config.partial = *partial;
      }
      ConfigOption::SetContext(context) => {
        config.context = Some(context.clone());
      }
    }
  }

  /// Raw input to validate.
  pub fn with_data(data: impl Into<Source>) -> ConfigOption {
    ConfigOption::SetData(data.into())
  }

  /// Object, mapping or wire message to represent.
  pub fn with_instance(instance: impl Into<Source>) -> ConfigOption {
    ConfigOption::SetInstance(instance.into())
  }

  pub fn with_many(many: bool) -> ConfigOption {
    ConfigOption::SetMany(many)
  }

  pub fn with_partial(partial: bool) -> ConfigOption {
    ConfigOption::SetPartial(partial)
  }

  pub fn with_context<T: Any + Send + Sync>(context: T) -> ConfigOption {
    ConfigOption::SetContext(Arc::new(context))
  }

  pub fn with_shared_context(context: Context) -> ConfigOption {
    ConfigOption::SetContext(context)
  }
}
