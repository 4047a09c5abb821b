use super::*;
use crate::binding::FieldRegistry;
use crate::declaration::SerializerDeclaration;
use crate::field::Field;
use serde_json::json;

#[test]
fn test_leaf_view() {
  let declaration = SerializerDeclaration::builder("Account")
    .field("balance", Field::int())
    .build()
    .unwrap();
  let registry = FieldRegistry::bind(&declaration);
  let view = FieldView::new(
    registry.get("balance").unwrap(),
    json!("x"),
    Some(ErrorDetail::message("Expected a number.")),
    "",
  );

  assert_eq!(view.name(), "balance");
  assert_eq!(view.kind(), "int");
  assert_eq!(view.value(), &json!("x"));
  assert!(!view.is_nested());
  assert_eq!(view.iter().count(), 0);
}

#[test]
fn test_nested_view_without_value() {
  let settings = SerializerDeclaration::builder("AccountSettings")
    .field("is_public", Field::boolean().with_wire_name("public"))
    .build()
    .unwrap();
  let declaration = SerializerDeclaration::builder("Account")
    .field("settings", Field::nested(&settings))
    .field("history", Field::nested_many(&settings))
    .build()
    .unwrap();
  let registry = FieldRegistry::bind(&declaration);

  let view = FieldView::new(registry.get("settings").unwrap(), Value::Null, None, "");
  assert_eq!(view.kind(), "nested");
  assert_eq!(view.value(), &json!({}));
  let child = view.get("is_public").unwrap();
  assert_eq!(child.name(), "settings.is_public");
  assert_eq!(child.value(), &Value::Null);
  assert!(child.errors().is_none());

  let view = FieldView::new(registry.get("settings").unwrap(), json!({"public": true}), None, "");
  assert_eq!(view.get("is_public").unwrap().value(), &json!(true));

  // Collections of composites are viewed as plain values.
  let history = FieldView::new(registry.get("history").unwrap(), json!([]), None, "");
  assert!(!history.is_nested());
  assert_eq!(history.kind(), "nested_many");
}
