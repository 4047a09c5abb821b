use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Cause attached to a failed field, element or whole input.
///
/// A composite reports `Fields` keyed by field name, a collection reports
/// `Items` positionally (an empty `Fields` at every position that succeeded)
/// and leaves report a `Message`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ErrorDetail {
  Message(String),
  Fields(IndexMap<String, ErrorDetail>),
  Items(Vec<ErrorDetail>),
}

impl ErrorDetail {
  pub fn message(message: impl Into<String>) -> Self {
    ErrorDetail::Message(message.into())
  }

  pub fn empty() -> Self {
    ErrorDetail::Fields(IndexMap::new())
  }

  /// `true` when nothing failed: an empty field mapping, or a sequence made
  /// only of empty entries.
  pub fn is_empty(&self) -> bool {
    match self {
      ErrorDetail::Message(_) => false,
      ErrorDetail::Fields(fields) => fields.is_empty(),
      ErrorDetail::Items(items) => items.iter().all(ErrorDetail::is_empty),
    }
  }

  pub fn get(&self, key: &str) -> Option<&ErrorDetail> {
    match self {
      ErrorDetail::Fields(fields) => fields.get(key),
      _ => None,
    }
  }

  pub fn item(&self, index: usize) -> Option<&ErrorDetail> {
    match self {
      ErrorDetail::Items(items) => items.get(index),
      _ => None,
    }
  }

  pub fn as_message(&self) -> Option<&str> {
    match self {
      ErrorDetail::Message(message) => Some(message),
      _ => None,
    }
  }

  pub fn to_value(&self) -> Value {
    match self {
      ErrorDetail::Message(message) => Value::String(message.clone()),
      ErrorDetail::Fields(fields) => Value::Object(
        fields
          .iter()
          .map(|(key, detail)| (key.clone(), detail.to_value()))
          .collect(),
      ),
      ErrorDetail::Items(items) => Value::Array(items.iter().map(ErrorDetail::to_value).collect()),
    }
  }
}

impl Display for ErrorDetail {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      ErrorDetail::Message(message) => write!(f, "{}", message),
      other => write!(f, "{}", other.to_value()),
    }
  }
}

impl From<&str> for ErrorDetail {
  fn from(message: &str) -> Self {
    ErrorDetail::Message(message.to_string())
  }
}

impl From<String> for ErrorDetail {
  fn from(message: String) -> Self {
    ErrorDetail::Message(message)
  }
}

/// A zero-argument member invoked during attribute resolution raised an error.
///
/// Kept apart from "attribute absent" so that a broken computed attribute is
/// never mistaken for a missing one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("exception raised in callable attribute \"{attribute}\": {message}")]
pub struct CallableFailure {
  pub attribute: String,
  pub message: String,
}

impl CallableFailure {
  pub fn new(attribute: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      attribute: attribute.into(),
      message: message.into(),
    }
  }
}

/// Failure local to one field. Always recovered into the field's entry of the
/// aggregated error mapping.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
  #[error("{message}")]
  ExpectedType { expected: &'static str, message: String },
  #[error("{0}")]
  ValidationFailure(ErrorDetail),
  #[error(transparent)]
  CallableFailure(#[from] CallableFailure),
}

impl FieldError {
  pub fn expected_type(expected: &'static str, message: impl Into<String>) -> Self {
    FieldError::ExpectedType {
      expected,
      message: message.into(),
    }
  }

  /// Rejection raised by a user hook on an otherwise well-typed value.
  pub fn validation(detail: impl Into<ErrorDetail>) -> Self {
    FieldError::ValidationFailure(detail.into())
  }

  pub fn detail(&self) -> ErrorDetail {
    match self {
      FieldError::ValidationFailure(detail) => detail.clone(),
      other => ErrorDetail::Message(other.to_string()),
    }
  }

  pub(crate) fn at_index(self, index: usize) -> Self {
    match self {
      FieldError::ExpectedType { expected, message } => FieldError::ExpectedType {
        expected,
        message: format!("Item {}: {}", index, message),
      },
      other => other,
    }
  }

  pub(crate) fn at_key(self, key: &str) -> Self {
    match self {
      FieldError::ExpectedType { expected, message } => FieldError::ExpectedType {
        expected,
        message: format!("Key \"{}\": {}", key, message),
      },
      other => other,
    }
  }
}

/// Programmer-contract violations. Never aggregated, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
  #[error("wire schema is not defined for serializer `{0}`")]
  MissingSchema(String),
  #[error("`.is_valid()` must be called before accessing `.{0}`")]
  NotValidated(&'static str),
  #[error("serializer `{0}` was constructed without `data`; there is nothing to validate")]
  MissingData(String),
  #[error("field kind `{child}` is not allowed for `{parent}`; allowed kinds are: {allowed}")]
  DisallowedChild {
    parent: &'static str,
    child: &'static str,
    allowed: String,
  },
  #[error("hook registered for `{field}`, which is not a field of serializer `{serializer}`")]
  UnknownField { serializer: String, field: String },
}

/// Failures reported by the wire-schema runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
  #[error("failed to encode `{type_name}`: {message}")]
  Encode { type_name: &'static str, message: String },
  #[error("failed to decode `{type_name}`: {message}")]
  Decode { type_name: &'static str, message: String },
  #[error("message type `{type_name}` has no field named `{field}`")]
  UnknownField { type_name: &'static str, field: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TranscodeError {
  #[error("validation failed: {0}")]
  Invalid(ErrorDetail),
  #[error(transparent)]
  Configuration(#[from] ConfigurationError),
  #[error(transparent)]
  Callable(#[from] CallableFailure),
  #[error(transparent)]
  Wire(#[from] WireError),
  #[error("failed to represent field `{field}`: {source}")]
  Representation { field: String, source: FieldError },
}

impl TranscodeError {
  pub fn detail(&self) -> Option<&ErrorDetail> {
    match self {
      TranscodeError::Invalid(detail) => Some(detail),
      _ => None,
    }
  }

  pub(crate) fn representation(field: &str, source: FieldError) -> Self {
    match source {
      FieldError::CallableFailure(failure) => TranscodeError::Callable(failure),
      source => TranscodeError::Representation {
        field: field.to_string(),
        source,
      },
    }
  }
}

static_assertions::assert_impl_all!(ErrorDetail: Send, Sync);
static_assertions::assert_impl_all!(FieldError: Send, Sync);
static_assertions::assert_impl_all!(TranscodeError: Send, Sync);

#[cfg(test)]
mod tests;
