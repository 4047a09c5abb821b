//! Composite transcoder: validates incoming mappings field by field and
//! represents instances back into mappings and wire messages.

use indexmap::IndexMap;
use once_cell::unsync::OnceCell;
use serde_json::{Map, Value};
use std::any::Any;
use std::sync::Arc;

use crate::attribute::{lookup_value, resolve_attribute, set_value};
use crate::binding::{BoundField, FieldRegistry};
use crate::bridge::{normalize, Normalized};
use crate::config::{Config, Context};
use crate::declaration::SerializerDeclaration;
use crate::error::{ConfigurationError, ErrorDetail, FieldError, TranscodeError};
use crate::field::Emptiness;
use crate::field_view::FieldView;
use crate::value::{value_kind_name, NativeMap, NativeValue};
use crate::wire::WireMessage;

#[derive(Debug)]
struct Validation {
  validated: NativeValue,
  errors: ErrorDetail,
}

/// A declaration bound to one invocation.
///
/// Results are memoized: validation runs at most once, and so do the
/// computations behind [`Serializer::data`] and [`Serializer::wire_message`].
/// An invalid serializer stays invalid; retrying needs a new instance.
#[derive(Debug)]
pub struct Serializer {
  declaration: Arc<SerializerDeclaration>,
  field_name: String,
  fields: FieldRegistry,
  initial_data: Option<Normalized>,
  instance: Option<Normalized>,
  partial: bool,
  context: Option<Context>,
  validation: OnceCell<Validation>,
  data: OnceCell<Map<String, Value>>,
  wire: OnceCell<Arc<dyn WireMessage>>,
}

impl Serializer {
  pub fn new(declaration: &Arc<SerializerDeclaration>, config: Config) -> Result<Self, TranscodeError> {
    let mut serializer = Self::template(declaration, config.context);
    serializer.partial = config.partial;
    serializer.initial_data = config.data.map(normalize).transpose()?;
    serializer.instance = config.instance.map(normalize).transpose()?;
    Ok(serializer)
  }

  /// Serializer with no input, used as the child of nested fields and
  /// collections.
  pub(crate) fn template(declaration: &Arc<SerializerDeclaration>, context: Option<Context>) -> Self {
    Self {
      declaration: declaration.clone(),
      field_name: String::new(),
      fields: FieldRegistry::bind(declaration),
      initial_data: None,
      instance: None,
      partial: false,
      context,
      validation: OnceCell::new(),
      data: OnceCell::new(),
      wire: OnceCell::new(),
    }
  }

  pub(crate) fn set_partial(&mut self, partial: bool) {
    self.partial = partial;
  }

  pub fn bind(&mut self, field_name: &str) {
    self.field_name = field_name.to_string();
  }

  pub fn field_name(&self) -> &str {
    &self.field_name
  }

  pub fn declaration(&self) -> &Arc<SerializerDeclaration> {
    &self.declaration
  }

  pub fn fields(&self) -> &FieldRegistry {
    &self.fields
  }

  pub fn initial_data(&self) -> Option<&Normalized> {
    self.initial_data.as_ref()
  }

  pub fn instance(&self) -> Option<&Normalized> {
    self.instance.as_ref()
  }

  pub fn is_partial(&self) -> bool {
    self.partial
  }

  pub fn context(&self) -> Option<&Context> {
    self.context.as_ref()
  }

  pub fn context_as<T: Any>(&self) -> Option<&T> {
    self.context.as_deref().and_then(|context| context.downcast_ref::<T>())
  }

  /// Validates the initial data once and reports whether it passed. With
  /// `raise_exception` a failure comes back as [`TranscodeError::Invalid`]
  /// carrying the aggregated errors.
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
      .ok_or_else(|| ConfigurationError::MissingData(self.declaration.name().to_string()))?;
    Ok(self.validation.get_or_init(|| match self.to_internal_value(&initial_data.to_raw()) {
      Ok(validated) => Validation {
        validated,
        errors: ErrorDetail::empty(),
      },
      Err(errors) => {
        tracing::debug!("Serializer::is_valid: {} failed: {}", self.declaration.name(), errors);
        Validation {
          validated: NativeValue::Map(NativeMap::new()),
          errors,
        }
      }
    }))
  }

  pub fn validated_data(&self) -> Result<&NativeValue, TranscodeError> {
    if self.initial_data.is_none() {
      return Err(ConfigurationError::MissingData(self.declaration.name().to_string()).into());
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

  /// Outgoing mapping.
  ///
  /// An instance is represented, after validation when it arrived as a
  /// mapping. Otherwise validated data is represented; when there is none,
  /// the initial view is returned: the declared fields found in the initial
  /// data, or every field's initial value if no data was given.
  pub fn data(&self) -> Result<&Map<String, Value>, TranscodeError> {
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
          let native = match instance {
            Normalized::Native(value) => value.clone(),
            other => self.to_internal_value(&other.to_raw()).map_err(TranscodeError::Invalid)?,
          };
          return self.represent(&native);
        }
        if let Some(validation) = self.validation.get() {
          return self.represent(&validation.validated);
        }
      }
      Ok(self.initial_view())
    })
  }

  /// Encodes [`Serializer::data`] into a wire message of the declared schema.
  pub fn wire_message(&self) -> Result<Arc<dyn WireMessage>, TranscodeError> {
    self.require_schema()?;
    self
      .wire
      .get_or_try_init(|| {
        let data = self.data()?.clone();
        self.to_wire(data)
      })
      .cloned()
  }

  /// Runs the pre-encode hook on `mapping`, then the wire-schema runtime.
  pub fn to_wire(&self, mapping: Map<String, Value>) -> Result<Arc<dyn WireMessage>, TranscodeError> {
    let schema = self.require_schema()?;
    let mapping = match self.declaration.pre_encode() {
      Some(hook) => hook(self, mapping),
      None => mapping,
    };
    tracing::debug!(
      "Serializer::to_wire: {} -> {}",
      self.declaration.name(),
      schema.type_name()
    );
    Ok(schema.encode(&mapping)?)
  }

  fn require_schema(&self) -> Result<&Arc<dyn crate::wire::WireSchema>, ConfigurationError> {
    self
      .declaration
      .schema()
      .ok_or_else(|| ConfigurationError::MissingSchema(self.declaration.name().to_string()))
  }

  /// Representation of `instance`, through the declaration's representer
  /// when one is registered.
  pub fn represent(&self, instance: &NativeValue) -> Result<Map<String, Value>, TranscodeError> {
    match self.declaration.representer() {
      Some(representer) => representer(self, instance),
      None => self.to_representation(instance),
    }
  }

  /// Field-by-field representation. Unresolved attributes become `null`.
  pub fn to_representation(&self, instance: &NativeValue) -> Result<Map<String, Value>, TranscodeError> {
    let mut ret = Map::new();
    for (_, bound) in self.fields.iter() {
      let value = match resolve_attribute(instance, bound.source_path())? {
        None | Some(NativeValue::Null) => Value::Null,
        Some(attribute) => represent_field(bound, &attribute)?,
      };
      ret.insert(bound.output_key().to_string(), value);
    }
    Ok(ret)
  }

  /// Validates every field of `raw` and collects all failures before
  /// reporting them together, keyed by field name.
  pub fn to_internal_value(&self, raw: &Value) -> Result<NativeValue, ErrorDetail> {
    let Value::Object(container) = raw else {
      return Err(ErrorDetail::message(format!(
        "Invalid data. Expected a mapping, but got {}.",
        value_kind_name(raw)
      )));
    };

    let mut validated = NativeMap::new();
    let mut errors = IndexMap::new();
    for (name, bound) in self.fields.iter() {
      match self.validate_field(bound, raw, container) {
        Ok(Some(value)) => {
          if let Err(value) = set_value(&mut validated, bound.source_path(), value) {
            let detail = unwritable(bound, &value);
            tracing::debug!("Serializer::to_internal_value: {}.{}: {}", self.declaration.name(), name, detail);
            errors.insert(name.clone(), detail);
          }
        }
        Ok(None) => {}
        Err(detail) => {
          tracing::debug!("Serializer::to_internal_value: {}.{}: {}", self.declaration.name(), name, detail);
          errors.insert(name.clone(), detail);
        }
      }
    }

    if errors.is_empty() {
      Ok(NativeValue::Map(validated))
    } else {
      Err(ErrorDetail::Fields(errors))
    }
  }

  /// Validation of a value nested in a collection: `null` stays `null`.
  pub(crate) fn run_validation(&self, raw: &Value) -> Result<NativeValue, ErrorDetail> {
    match raw {
      Value::Null => Ok(NativeValue::Null),
      raw => self.to_internal_value(raw),
    }
  }

  /// `Ok(None)` means the field is left out of the result.
  fn validate_field(
    &self,
    bound: &BoundField,
    raw: &Value,
    container: &Map<String, Value>,
  ) -> Result<Option<NativeValue>, ErrorDetail> {
    let field = bound.field();
    let primitive = if field.is_custom() {
      Some(self.custom_value(bound, raw, container).map_err(|err| err.detail())?)
    } else {
      lookup_value(raw, bound.source_path()).cloned()
    };
    if primitive.is_none() && self.partial {
      return Ok(None);
    }

    match field.check_empty(primitive) {
      Emptiness::Empty(value) => Ok(Some(value)),
      Emptiness::Present(primitive) => {
        let value = match (bound.child(), field.kind().as_leaf()) {
          (Some(child), _) => child.validate_value(&primitive)?,
          (None, Some(leaf)) => leaf.validate_and_convert(&primitive).map_err(|err| err.detail())?,
          (None, None) => NativeValue::from(primitive),
        };
        match field.validator() {
          Some(validator) => validator(self, value).map(Some).map_err(|err| err.detail()),
          None => Ok(Some(value)),
        }
      }
    }
  }

  /// Custom fields are filled by the registered getter, `null` without one.
  fn custom_value(&self, bound: &BoundField, raw: &Value, container: &Map<String, Value>) -> Result<Value, FieldError> {
    match bound.field().custom_getter() {
      Some(getter) => getter(self, container, lookup_value(raw, bound.source_path())),
      None => Ok(Value::Null),
    }
  }

  fn initial_view(&self) -> Map<String, Value> {
    match &self.initial_data {
      Some(initial_data) => self.initial_view_of(&initial_data.to_raw()),
      None => self
        .fields
        .iter()
        .map(|(name, bound)| (name.clone(), bound.field().initial().clone()))
        .collect(),
    }
  }

  /// Declared fields that are present in `raw`, unvalidated.
  pub(crate) fn initial_view_of(&self, raw: &Value) -> Map<String, Value> {
    let Value::Object(container) = raw else {
      return Map::new();
    };
    let mut view = Map::new();
    for (name, bound) in self.fields.iter() {
      let value = if bound.field().is_custom() {
        match self.custom_value(bound, raw, container) {
          Ok(value) => Some(value),
          Err(err) => {
            tracing::debug!("Serializer::initial_view_of: {}.{}: {}", self.declaration.name(), name, err);
            None
          }
        }
      } else {
        lookup_value(raw, bound.source_path()).cloned()
      };
      if let Some(value) = value {
        view.insert(name.clone(), value);
      }
    }
    view
  }

  /// Bound view of one field with its current value and error.
  pub fn field_view(&self, name: &str) -> Result<FieldView, TranscodeError> {
    let bound = self.fields.get(name).ok_or_else(|| ConfigurationError::UnknownField {
      serializer: self.declaration.name().to_string(),
      field: name.to_string(),
    })?;
    let data = self.data()?;
    let value = data
      .get(bound.output_key())
      .or_else(|| data.get(name))
      .cloned()
      .unwrap_or(Value::Null);
    let errors = self
      .validation
      .get()
      .and_then(|validation| validation.errors.get(name))
      .cloned();
    Ok(FieldView::new(bound, value, errors, ""))
  }
}

/// A field reading the entire container must produce a mapping to merge; a
/// dotted source must not pass through a key that already holds a value.
fn unwritable(bound: &BoundField, value: &NativeValue) -> ErrorDetail {
  let err = if bound.source_path().is_empty() {
    FieldError::expected_type(
      "dict",
      format!(
        "Expected a mapping to merge into the container but got type \"{}\".",
        value.kind_name()
      ),
    )
  } else {
    FieldError::expected_type(
      bound.field().kind().name(),
      format!(
        "Cannot write to \"{}\": a parent key already holds a value.",
        bound.source_path().join(".")
      ),
    )
  };
  err.detail()
}

fn represent_field(bound: &BoundField, attribute: &NativeValue) -> Result<Value, TranscodeError> {
  match (bound.child(), bound.field().kind().as_leaf()) {
    (Some(child), _) => child.to_representation(attribute),
    (None, Some(leaf)) => leaf
      .represent(attribute)
      .map_err(|err| TranscodeError::representation(bound.name(), err)),
    (None, None) => Ok(attribute.to_value()),
  }
}

#[cfg(test)]
mod tests;
