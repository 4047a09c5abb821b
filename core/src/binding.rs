use indexmap::IndexMap;
use std::sync::{Arc, Weak};

use crate::declaration::SerializerDeclaration;
use crate::field::{Field, FieldKind, ENTIRE_CONTAINER};
use crate::transcoder::Transcoder;

/// Splits a source into path segments. [`ENTIRE_CONTAINER`] yields an empty
/// path, meaning the field reads and writes the container itself.
pub fn derive_source_path(name: &str, source: Option<&str>) -> Vec<String> {
  match source.unwrap_or(name) {
    ENTIRE_CONTAINER => Vec::new(),
    source => source.split('.').map(str::to_string).collect(),
  }
}

/// Per-instance copy of a declared field, carrying its binding metadata.
///
/// Nested fields also carry the template transcoder they recurse into,
/// built with the field's own context.
#[derive(Debug)]
pub struct BoundField {
  field: Field,
  name: String,
  owner: Weak<SerializerDeclaration>,
  source_path: Option<Vec<String>>,
  child: Option<Box<Transcoder>>,
}

impl BoundField {
  pub fn new(field: Field) -> Self {
    let child = match field.kind() {
      FieldKind::Nested { declaration, many } => Some(Box::new(Transcoder::template(
        declaration,
        *many,
        field.context().cloned(),
      ))),
      FieldKind::Leaf(_) => None,
    };
    Self {
      field,
      name: String::new(),
      owner: Weak::new(),
      source_path: None,
      child,
    }
  }

  /// Assigns name and owner. The source path is derived on the first bind
  /// only; later binds keep it.
  pub fn bind(&mut self, name: &str, owner: &Arc<SerializerDeclaration>) {
    self.name = name.to_string();
    self.owner = Arc::downgrade(owner);
    if self.source_path.is_none() {
      self.source_path = Some(derive_source_path(name, self.field.source()));
    }
    if let Some(child) = self.child.as_mut() {
      child.bind(name);
    }
    tracing::debug!(
      "BoundField::bind: {}.{} -> {:?}",
      owner.name(),
      self.name,
      self.source_path
    );
  }

  pub fn field(&self) -> &Field {
    &self.field
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn owner(&self) -> Option<Arc<SerializerDeclaration>> {
    self.owner.upgrade()
  }

  pub fn source_path(&self) -> &[String] {
    self.source_path.as_deref().unwrap_or_default()
  }

  /// Outgoing key: the wire rename when configured, the field name otherwise.
  pub fn output_key(&self) -> &str {
    self.field.wire_name().unwrap_or(self.name.as_str())
  }

  pub fn child(&self) -> Option<&Transcoder> {
    self.child.as_deref()
  }

  pub fn is_nested(&self) -> bool {
    self.child.is_some()
  }
}

/// Insertion-ordered mapping of field name to bound field, owned by exactly
/// one composite instance.
#[derive(Debug, Default)]
pub struct FieldRegistry {
  fields: IndexMap<String, BoundField>,
}

impl FieldRegistry {
  /// Copies every declared field of `declaration` and binds it.
  pub fn bind(declaration: &Arc<SerializerDeclaration>) -> Self {
    let mut registry = Self::default();
    for (name, field) in declaration.fields() {
      registry.insert(name, BoundField::new(field.clone()), declaration);
    }
    registry
  }

  pub fn insert(&mut self, name: &str, mut field: BoundField, owner: &Arc<SerializerDeclaration>) {
    field.bind(name, owner);
    self.fields.insert(name.to_string(), field);
  }

  pub fn get(&self, name: &str) -> Option<&BoundField> {
    self.fields.get(name)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&String, &BoundField)> {
    self.fields.iter()
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.fields.keys().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.fields.len()
  }

  pub fn is_empty(&self) -> bool {
    self.fields.is_empty()
  }
}

#[cfg(test)]
mod tests;
