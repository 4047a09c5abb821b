use once_cell::unsync::OnceCell;
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;

use crate::bridge::{normalize, Normalized};
use crate::config::{Config, Context};
use crate::declaration::SerializerDeclaration;
use crate::error::{ConfigurationError, ErrorDetail, FieldError, TranscodeError, WireError};
use crate::serializer::Serializer;
use crate::value::{value_kind_name, NativeValue};
use crate::wire::WireMessage;

#[derive(Debug)]
struct Validation {
  validated: NativeValue,
  errors: ErrorDetail,
}

/// Errors are reported positionally: an empty mapping at every element that
/// passed, the element's own error mapping everywhere else.
#[derive(Debug)]
pub struct ListSerializer {
  child: Serializer,
  field_name: String,
  initial_data: Option<Normalized>,
  instance: Option<Normalized>,
  context: Option<Context>,
  validation: OnceCell<Validation>,
  data: OnceCell<Value>,
  wire: OnceCell<Vec<Arc<dyn WireMessage>>>,
}

impl ListSerializer {
  pub fn new(declaration: &Arc<SerializerDeclaration>, config: Config) -> Result<Self, TranscodeError> {
    let mut serializer = Self::template(declaration, config.context);
    serializer.child.set_partial(config.partial);
    serializer.initial_data = config.data.map(normalize).transpose()?;
    serializer.instance = config.instance.map(normalize).transpose()?;
    Ok(serializer)
  }

  pub(crate) fn template(declaration: &Arc<SerializerDeclaration>, context: Option<Context>) -> Self {
    let mut child = Serializer::template(declaration, context.clone());
    child.bind("");
    Self {
      child,
      field_name: String::new(),
      initial_data: None,
      instance: None,
      context,
      validation: OnceCell::new(),
      data: OnceCell::new(),
      wire: OnceCell::new(),
    }
  }

  pub fn bind(&mut self, field_name: &str) {
    self.field_name = field_name.to_string();
  }

  pub fn field_name(&self) -> &str {
    &self.field_name
  }

  pub fn child(&self) -> &Serializer {
    &self.child
  }

  pub fn context(&self) -> Option<&Context> {
    self.context.as_ref()
  }

  pub fn context_as<T: Any>(&self) -> Option<&T> {
    self.context.as_deref().and_then(|context| context.downcast_ref::<T>())
  }

  pub fn is_valid(&self, raise_exception: bool) -> Result<bool, TranscodeError> {
    let validation = self.validation()?;
    if validation.errors.is_empty() {
      Ok(true)
    } else if raise_exception {
      Err(TranscodeError::Invalid(validation.errors.clone()))
    } else {
      Ok(false)
    }
  }

  fn validation(&self) -> Result<&Validation, TranscodeError> {
    let initial_data = self
      .initial_data
      .as_ref()
      .ok_or_else(|| ConfigurationError::MissingData(self.child.declaration().name().to_string()))?;
    Ok(self.validation.get_or_init(|| {
      let raw = initial_data.to_raw();
      let outcome = match raw {
        Value::Null => Ok(NativeValue::Null),
        raw => self.to_internal_value(&raw),
      };
      match outcome {
        Ok(validated) => Validation {
          validated,
          errors: ErrorDetail::Items(Vec::new()),
        },
        Err(errors) => Validation {
          validated: NativeValue::List(Vec::new()),
          errors,
        },
      }
    }))
  }

  pub fn validated_data(&self) -> Result<&NativeValue, TranscodeError> {
    if self.initial_data.is_none() {
      return Err(ConfigurationError::MissingData(self.child.declaration().name().to_string()).into());
    }
    self
      .validation
      .get()
      .map(|validation| &validation.validated)
      .ok_or_else(|| ConfigurationError::NotValidated("validated_data").into())
  }

  pub fn errors(&self) -> Result<&ErrorDetail, TranscodeError> {
    self
      .validation
      .get()
      .map(|validation| &validation.errors)
      .ok_or_else(|| ConfigurationError::NotValidated("errors").into())
  }

  /// Validates every element, never stopping at the first failure.
  pub fn to_internal_value(&self, raw: &Value) -> Result<NativeValue, ErrorDetail> {
    let Value::Array(items) = raw else {
      return Err(
        FieldError::expected_type(
          "list",
          format!("Expected a list of items but got type \"{}\".", value_kind_name(raw)),
        )
        .detail(),
      );
    };

    let mut validated = Vec::with_capacity(items.len());
    let mut errors = Vec::with_capacity(items.len());
    let mut failed = 0;
    for item in items {
      match self.child.run_validation(item) {
        Ok(value) => {
          validated.push(value);
          errors.push(ErrorDetail::empty());
        }
        Err(detail) => {
          failed += 1;
          errors.push(detail);
        }
      }
    }

    if failed == 0 {
      Ok(NativeValue::List(validated))
    } else {
      tracing::debug!(
        "ListSerializer::to_internal_value: {} of {} items of {} failed",
        failed,
        items.len(),
        self.child.declaration().name()
      );
      Err(ErrorDetail::Items(errors))
    }
  }

  /// Represents each element with the child; `null` elements stay `null`.
  pub fn to_representation(&self, value: &NativeValue) -> Result<Value, TranscodeError> {
    match value {
      NativeValue::Null => Ok(Value::Null),
      NativeValue::List(items) => items
        .iter()
        .map(|item| self.represent_item(item))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array),
      other => Err(TranscodeError::representation(
        &self.field_name,
        FieldError::expected_type(
          "list",
          format!("Expected a list of items but got type \"{}\".", other.kind_name()),
        ),
      )),
    }
  }

  fn represent_item(&self, item: &NativeValue) -> Result<Value, TranscodeError> {
    match item {
      NativeValue::Null => Ok(Value::Null),
      item => self.child.represent(item).map(Value::Object),
    }
  }

  /// Outgoing sequence; see [`Serializer::data`] for the order in which
  /// instance, validated data and initial data are consulted.
  pub fn data(&self) -> Result<&Value, TranscodeError> {
    if self.initial_data.is_some() && self.validation.get().is_none() {
      return Err(ConfigurationError::NotValidated("data").into());
    }
    self.data.get_or_try_init(|| {
      let failed = self
        .validation
        .get()
        .is_some_and(|validation| !validation.errors.is_empty());
      if !failed {
        if let Some(instance) = &self.instance {
          return self.represent_instance(instance);
        }
        if let Some(validation) = self.validation.get() {
          return self.to_representation(&validation.validated);
        }
      }
      Ok(self.initial_view())
    })
  }

  fn represent_instance(&self, instance: &Normalized) -> Result<Value, TranscodeError> {
    match instance {
      Normalized::Native(value) => self.to_representation(value),
      Normalized::Mapping(Value::Null) => Ok(Value::Null),
      Normalized::Mapping(raw) => {
        let validated = self.to_internal_value(raw).map_err(TranscodeError::Invalid)?;
        self.to_representation(&validated)
      }
      Normalized::Sequence(items) => {
        let mut represented = Vec::with_capacity(items.len());
        let mut errors = Vec::with_capacity(items.len());
        let mut failed = false;
        for item in items {
          let outcome = match item {
            Normalized::Native(value) => Ok(value.clone()),
            other => self.child.run_validation(&other.to_raw()),
          };
          match outcome {
            Ok(value) => {
              represented.push(self.represent_item(&value)?);
              errors.push(ErrorDetail::empty());
            }
            Err(detail) => {
              failed = true;
              errors.push(detail);
            }
          }
        }
        if failed {
          Err(TranscodeError::Invalid(ErrorDetail::Items(errors)))
        } else {
          Ok(Value::Array(represented))
        }
      }
    }
  }

  fn initial_view(&self) -> Value {
    match self.initial_data.as_ref().map(Normalized::to_raw) {
      Some(Value::Array(items)) => Value::Array(
        items
          .iter()
          .map(|item| Value::Object(self.child.initial_view_of(item)))
          .collect(),
      ),
      _ => Value::Array(Vec::new()),
    }
  }

  /// One wire message per element, each passed through the child's
  /// pre-encode hook on its own.
  pub fn wire_messages(&self) -> Result<&[Arc<dyn WireMessage>], TranscodeError> {
    let schema = self
      .child
      .declaration()
      .schema()
      .ok_or_else(|| ConfigurationError::MissingSchema(self.child.declaration().name().to_string()))?;
    self
      .wire
      .get_or_try_init(|| {
        let items = match self.data()? {
          Value::Array(items) => items.clone(),
          Value::Null => Vec::new(),
          other => vec![other.clone()],
        };
        items
          .into_iter()
          .map(|item| match item {
            Value::Object(mapping) => self.child.to_wire(mapping),
            other => Err(
              WireError::Encode {
                type_name: schema.type_name(),
                message: format!("expected a mapping, got {}", value_kind_name(&other)),
              }
              .into(),
            ),
          })
          .collect::<Result<Vec<_>, _>>()
      })
      .map(Vec::as_slice)
  }
}
