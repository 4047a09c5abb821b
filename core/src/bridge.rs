use serde_json::Value;
use std::sync::Arc;

use crate::error::WireError;
use crate::value::NativeValue;
use crate::wire::WireMessage;

/// Anything that can be handed to a transcoder as data or instance.
#[derive(Debug, Clone)]
pub enum Source {
  Wire(Arc<dyn WireMessage>),
  Mapping(Value),
  Native(NativeValue),
  Sequence(Vec<Source>),
}

impl Source {
  pub fn wire<M: WireMessage>(message: M) -> Self {
    Source::Wire(Arc::new(message))
  }
}

impl From<Value> for Source {
  fn from(value: Value) -> Self {
    Source::Mapping(value)
  }
}

impl From<NativeValue> for Source {
  fn from(value: NativeValue) -> Self {
    Source::Native(value)
  }
}

impl From<Arc<dyn WireMessage>> for Source {
  fn from(message: Arc<dyn WireMessage>) -> Self {
    Source::Wire(message)
  }
}

impl<T: Into<Source>> From<Vec<T>> for Source {
  fn from(items: Vec<T>) -> Self {
    Source::Sequence(items.into_iter().map(Into::into).collect())
  }
}

/// Canonical form of a [`Source`]: wire messages are decoded into mappings
/// and sequences are split so that every element stands on its own.
#[derive(Debug, Clone)]
pub enum Normalized {
  Mapping(Value),
  Native(NativeValue),
  Sequence(Vec<Normalized>),
}

impl Normalized {
  pub fn is_sequence(&self) -> bool {
    matches!(self, Normalized::Sequence(_))
  }

  /// Plain mapping view, as fed to validation.
  pub fn into_raw(self) -> Value {
    match self {
      Normalized::Mapping(value) => value,
      Normalized::Native(value) => value.to_value(),
      Normalized::Sequence(items) => Value::Array(items.into_iter().map(Normalized::into_raw).collect()),
    }
  }

  pub fn to_raw(&self) -> Value {
    self.clone().into_raw()
  }

  /// Native view, as fed to representation. Mappings are read as maps.
  pub fn into_native(self) -> NativeValue {
    match self {
      Normalized::Mapping(value) => NativeValue::from(value),
      Normalized::Native(value) => value,
      Normalized::Sequence(items) => NativeValue::List(items.into_iter().map(Normalized::into_native).collect()),
    }
  }
}

/// Converts any accepted input into its canonical form.
///
/// A JSON array is treated like a sequence, so each of its elements is
/// normalized independently; a native list is kept as a single native value.
pub fn normalize(source: Source) -> Result<Normalized, WireError> {
  match source {
    Source::Wire(message) => {
      tracing::debug!("normalize: decoding wire message {}", message.type_name());
      message.decode().map(|map| Normalized::Mapping(Value::Object(map)))
    }
    Source::Mapping(Value::Array(items)) => items
      .into_iter()
      .map(|item| normalize(Source::Mapping(item)))
      .collect::<Result<Vec<_>, _>>()
      .map(Normalized::Sequence),
    Source::Mapping(value) => Ok(Normalized::Mapping(value)),
    Source::Native(value) => Ok(Normalized::Native(value)),
    Source::Sequence(items) => items
      .into_iter()
      .map(normalize)
      .collect::<Result<Vec<_>, _>>()
      .map(Normalized::Sequence),
  }
}
