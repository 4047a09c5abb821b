use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::error::{ConfigurationError, FieldError, TranscodeError};
use crate::field::{CustomGetterFn, Field, ValidatorFn};
use crate::serializer::Serializer;
use crate::value::NativeValue;
use crate::wire::{ProstSchema, WireSchema};

/// Adjusts the outgoing mapping right before it is encoded to a wire message.
pub type PreEncodeFn = Arc<dyn Fn(&Serializer, Map<String, Value>) -> Map<String, Value> + Send + Sync>;

/// Replaces the field-by-field representation of an instance.
pub type RepresenterFn = Arc<dyn Fn(&Serializer, &NativeValue) -> Result<Map<String, Value>, TranscodeError> + Send + Sync>;

pub struct SerializerDeclaration {
  name: String,
  fields: IndexMap<String, Field>,
  validators: IndexMap<String, ValidatorFn>,
  custom_getters: IndexMap<String, CustomGetterFn>,
  schema: Option<Arc<dyn WireSchema>>,
  pre_encode: Option<PreEncodeFn>,
  representer: Option<RepresenterFn>,
}

impl SerializerDeclaration {
  pub fn builder(name: &str) -> DeclarationBuilder {
    DeclarationBuilder::new(name)
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// Merged fields in declaration order, hooks attached.
  pub fn fields(&self) -> &IndexMap<String, Field> {
    &self.fields
  }

  pub fn field(&self, name: &str) -> Option<&Field> {
    self.fields.get(name)
  }

  pub fn field_names(&self) -> Vec<&str> {
    self.fields.keys().map(String::as_str).collect()
  }

  pub fn schema(&self) -> Option<&Arc<dyn WireSchema>> {
    self.schema.as_ref()
  }

  pub fn pre_encode(&self) -> Option<&PreEncodeFn> {
    self.pre_encode.as_ref()
  }

  pub fn representer(&self) -> Option<&RepresenterFn> {
    self.representer.as_ref()
  }
}

impl Debug for SerializerDeclaration {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SerializerDeclaration")
      .field("name", &self.name)
      .field("fields", &self.fields.keys().collect::<Vec<_>>())
      .field("schema", &self.schema)
      .field("pre_encode", &self.pre_encode.is_some())
      .field("representer", &self.representer.is_some())
      .finish()
  }
}

pub struct DeclarationBuilder {
  name: String,
  bases: Vec<Arc<SerializerDeclaration>>,
  fields: Vec<(String, Field)>,
  shadowed: HashSet<String>,
  validators: Vec<(String, ValidatorFn)>,
  custom_getters: Vec<(String, CustomGetterFn)>,
  schema: Option<Arc<dyn WireSchema>>,
  pre_encode: Option<PreEncodeFn>,
  representer: Option<RepresenterFn>,
}

impl DeclarationBuilder {
  pub fn new(name: &str) -> Self {
    Self {
      name: name.to_string(),
      bases: Vec::new(),
      fields: Vec::new(),
      shadowed: HashSet::new(),
      validators: Vec::new(),
      custom_getters: Vec::new(),
      schema: None,
      pre_encode: None,
      representer: None,
    }
  }

  /// Inherits the fields and hooks of `base`. Earlier bases take precedence.
  pub fn extends(mut self, base: &Arc<SerializerDeclaration>) -> Self {
    self.bases.push(base.clone());
    self
  }

  pub fn field(mut self, name: &str, field: Field) -> Self {
    self.fields.push((name.to_string(), field));
    self
  }

  /// Drops an inherited field.
  pub fn without(mut self, name: &str) -> Self {
    self.shadowed.insert(name.to_string());
    self
  }

  pub fn validator<F>(mut self, name: &str, validator: F) -> Self
  where
    F: Fn(&Serializer, NativeValue) -> Result<NativeValue, FieldError> + Send + Sync + 'static, {
    self.validators.push((name.to_string(), Arc::new(validator)));
    self
  }

  pub fn custom_getter<F>(mut self, name: &str, getter: F) -> Self
  where
    F: Fn(&Serializer, &Map<String, Value>, Option<&Value>) -> Result<Value, FieldError> + Send + Sync + 'static, {
    self.custom_getters.push((name.to_string(), Arc::new(getter)));
    self
  }

  pub fn schema(mut self, schema: Arc<dyn WireSchema>) -> Self {
    self.schema = Some(schema);
    self
  }

  pub fn prost_schema<M>(self) -> Self
  where
    M: prost::Message + Serialize + DeserializeOwned + Default + 'static, {
    self.schema(ProstSchema::<M>::shared())
  }

  pub fn pre_encode<F>(mut self, hook: F) -> Self
  where
    F: Fn(&Serializer, Map<String, Value>) -> Map<String, Value> + Send + Sync + 'static, {
    self.pre_encode = Some(Arc::new(hook));
    self
  }

  pub fn representer<F>(mut self, hook: F) -> Self
  where
    F: Fn(&Serializer, &NativeValue) -> Result<Map<String, Value>, TranscodeError> + Send + Sync + 'static, {
    self.representer = Some(Arc::new(hook));
    self
  }

  /// Merges bases and own fields.
  ///
  /// Inherited fields come first, in base order; the first base declaring a
  /// name wins. An own field with an inherited name replaces it in place, and
  /// the remaining own fields follow in creation order.
  pub fn build(self) -> Result<Arc<SerializerDeclaration>, ConfigurationError> {
    let mut own_fields = self.fields;
    own_fields.sort_by_key(|(_, field)| field.creation_index());

    let mut fields = IndexMap::new();
    let mut validators = IndexMap::new();
    let mut custom_getters = IndexMap::new();
    let mut schema = None;
    let mut pre_encode = None;
    let mut representer = None;

    for base in &self.bases {
      for (name, field) in base.fields() {
        if !self.shadowed.contains(name) && !fields.contains_key(name) {
          fields.insert(name.clone(), field.clone());
        }
      }
      for (name, validator) in &base.validators {
        validators.entry(name.clone()).or_insert_with(|| validator.clone());
      }
      for (name, getter) in &base.custom_getters {
        custom_getters.entry(name.clone()).or_insert_with(|| getter.clone());
      }
      schema = schema.or_else(|| base.schema.clone());
      pre_encode = pre_encode.or_else(|| base.pre_encode.clone());
      representer = representer.or_else(|| base.representer.clone());
    }

    for (name, field) in own_fields {
      fields.insert(name, field);
    }

    for (name, validator) in self.validators {
      if !fields.contains_key(&name) {
        return Err(ConfigurationError::UnknownField {
          serializer: self.name,
          field: name,
        });
      }
      validators.insert(name, validator);
    }
    for (name, getter) in self.custom_getters {
      if !fields.contains_key(&name) {
        return Err(ConfigurationError::UnknownField {
          serializer: self.name,
          field: name,
        });
      }
      custom_getters.insert(name, getter);
    }

    validators.retain(|name, _| fields.contains_key(name));
    custom_getters.retain(|name, _| fields.contains_key(name));
    for (name, field) in fields.iter_mut() {
      if let Some(validator) = validators.get(name) {
        field.set_validator(validator.clone());
      }
      if let Some(getter) = custom_getters.get(name) {
        field.set_custom_getter(getter.clone());
      }
    }

    tracing::debug!(
      "DeclarationBuilder::build: {} -> {:?}",
      self.name,
      fields.keys().collect::<Vec<_>>()
    );

    Ok(Arc::new(SerializerDeclaration {
      name: self.name,
      fields,
      validators,
      custom_getters,
      schema: self.schema.or(schema),
      pre_encode: self.pre_encode.or(pre_encode),
      representer: self.representer.or(representer),
    }))
  }
}
