use indexmap::IndexMap;
use serde_json::Value;

use crate::binding::BoundField;
use crate::error::ErrorDetail;

/// Form-like view of one bound field: its current outgoing value and error.
///
/// Views of single nested composites expose one child view per nested field,
/// named with a dotted prefix (`settings.is_public`).
#[derive(Debug, Clone, PartialEq)]
pub struct FieldView {
  name: String,
  kind: &'static str,
  value: Value,
  errors: Option<ErrorDetail>,
  children: IndexMap<String, FieldView>,
}

impl FieldView {
  pub(crate) fn new(bound: &BoundField, value: Value, errors: Option<ErrorDetail>, prefix: &str) -> Self {
    let name = format!("{}{}", prefix, bound.name());
    let nested = bound.child().and_then(|child| child.as_single());
    let Some(nested) = nested else {
      return Self {
        name,
        kind: bound.field().kind().name(),
        value,
        errors,
        children: IndexMap::new(),
      };
    };

    let value = match value {
      Value::Object(map) => Value::Object(map),
      _ => Value::Object(Default::default()),
    };
    let child_prefix = format!("{}.", name);
    let children = nested
      .fields()
      .iter()
      .map(|(field_name, child)| {
        let child_value = value
          .get(child.output_key())
          .or_else(|| value.get(field_name))
          .cloned()
          .unwrap_or(Value::Null);
        let child_errors = errors.as_ref().and_then(|errors| errors.get(field_name)).cloned();
        (
          field_name.clone(),
          FieldView::new(child, child_value, child_errors, &child_prefix),
        )
      })
      .collect();

    Self {
      name,
      kind: bound.field().kind().name(),
      value,
      errors,
      children,
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn kind(&self) -> &'static str {
    self.kind
  }

  pub fn value(&self) -> &Value {
    &self.value
  }

  pub fn errors(&self) -> Option<&ErrorDetail> {
    self.errors.as_ref()
  }

  pub fn is_nested(&self) -> bool {
    !self.children.is_empty()
  }

  pub fn get(&self, name: &str) -> Option<&FieldView> {
    self.children.get(name)
  }

  pub fn iter(&self) -> impl Iterator<Item = &FieldView> {
    self.children.values()
  }
}

#[cfg(test)]
mod tests;
