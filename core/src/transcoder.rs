use serde_json::Value;
use std::sync::Arc;

use crate::config::{Config, Context};
use crate::config_option::ConfigOption;
use crate::declaration::SerializerDeclaration;
use crate::error::{ErrorDetail, TranscodeError};
use crate::list_serializer::ListSerializer;
use crate::serializer::Serializer;
use crate::value::NativeValue;
use crate::wire::WireMessage;

/// Entry point of the engine: a single composite or a collection of them,
/// depending on [`ConfigOption::with_many`].
#[derive(Debug)]
pub enum Transcoder {
  Single(Serializer),
  Many(ListSerializer),
}

#[derive(Debug, Clone)]
pub enum WirePayload {
  Single(Arc<dyn WireMessage>),
  Many(Vec<Arc<dyn WireMessage>>),
}

impl WirePayload {
  pub fn into_vec(self) -> Vec<Arc<dyn WireMessage>> {
    match self {
      WirePayload::Single(message) => vec![message],
      WirePayload::Many(messages) => messages,
    }
  }
}

impl Transcoder {
  pub fn new(
    declaration: &Arc<SerializerDeclaration>,
    options: impl IntoIterator<Item = ConfigOption>,
  ) -> Result<Self, TranscodeError> {
    let config = Config::from(options);
    tracing::debug!(
      "Transcoder::new: {} (many = {}, partial = {}, validation = {})",
      declaration.name(),
      config.many,
      config.partial,
      config.is_validation_mode()
    );
    if config.many {
      ListSerializer::new(declaration, config).map(Transcoder::Many)
    } else {
      Serializer::new(declaration, config).map(Transcoder::Single)
    }
  }

  pub(crate) fn template(declaration: &Arc<SerializerDeclaration>, many: bool, context: Option<Context>) -> Self {
    if many {
      Transcoder::Many(ListSerializer::template(declaration, context))
    } else {
      Transcoder::Single(Serializer::template(declaration, context))
    }
  }

  pub fn bind(&mut self, field_name: &str) {
    match self {
      Transcoder::Single(serializer) => serializer.bind(field_name),
      Transcoder::Many(serializer) => serializer.bind(field_name),
    }
  }

  pub fn field_name(&self) -> &str {
    match self {
      Transcoder::Single(serializer) => serializer.field_name(),
      Transcoder::Many(serializer) => serializer.field_name(),
    }
  }

  pub fn is_many(&self) -> bool {
    matches!(self, Transcoder::Many(_))
  }

  pub fn as_single(&self) -> Option<&Serializer> {
    match self {
      Transcoder::Single(serializer) => Some(serializer),
      Transcoder::Many(_) => None,
    }
  }

  pub fn as_many(&self) -> Option<&ListSerializer> {
    match self {
      Transcoder::Many(serializer) => Some(serializer),
      Transcoder::Single(_) => None,
    }
  }

  pub fn context(&self) -> Option<&Context> {
    match self {
      Transcoder::Single(serializer) => serializer.context(),
      Transcoder::Many(serializer) => serializer.context(),
    }
  }

  pub fn is_valid(&self, raise_exception: bool) -> Result<bool, TranscodeError> {
    match self {
      Transcoder::Single(serializer) => serializer.is_valid(raise_exception),
      Transcoder::Many(serializer) => serializer.is_valid(raise_exception),
    }
  }

  pub fn errors(&self) -> Result<&ErrorDetail, TranscodeError> {
    match self {
      Transcoder::Single(serializer) => serializer.errors(),
      Transcoder::Many(serializer) => serializer.errors(),
    }
  }

  pub fn validated_data(&self) -> Result<&NativeValue, TranscodeError> {
    match self {
      Transcoder::Single(serializer) => serializer.validated_data(),
      Transcoder::Many(serializer) => serializer.validated_data(),
    }
  }

  pub fn data(&self) -> Result<Value, TranscodeError> {
    match self {
      Transcoder::Single(serializer) => serializer.data().map(|data| Value::Object(data.clone())),
      Transcoder::Many(serializer) => serializer.data().cloned(),
    }
  }

  pub fn wire(&self) -> Result<WirePayload, TranscodeError> {
    match self {
      Transcoder::Single(serializer) => serializer.wire_message().map(WirePayload::Single),
      Transcoder::Many(serializer) => serializer
        .wire_messages()
        .map(|messages| WirePayload::Many(messages.to_vec())),
    }
  }

  /// Validation of a nested value that already passed the emptiness check.
  pub(crate) fn validate_value(&self, raw: &Value) -> Result<NativeValue, ErrorDetail> {
    match self {
      Transcoder::Single(serializer) => serializer.to_internal_value(raw),
      Transcoder::Many(serializer) => serializer.to_internal_value(raw),
    }
  }

  pub(crate) fn to_representation(&self, value: &NativeValue) -> Result<Value, TranscodeError> {
    match self {
      Transcoder::Single(serializer) => serializer.represent(value).map(Value::Object),
      Transcoder::Many(serializer) => serializer.to_representation(value),
    }
  }
}

#[cfg(test)]
mod tests;
