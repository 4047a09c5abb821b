use super::*;
use crate::error::ConfigurationError;
use crate::field::Field;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct Tag {
  #[prost(string, tag = "1")]
  pub label: String,
}

fn tag() -> Arc<SerializerDeclaration> {
  SerializerDeclaration::builder("Tag")
    .field("label", Field::char())
    .prost_schema::<Tag>()
    .build()
    .unwrap()
}

#[test]
fn test_many_switches_to_collection() {
  let declaration = tag();
  let single = Transcoder::new(&declaration, vec![ConfigOption::with_data(json!({"label": "a"}))]).unwrap();
  assert!(!single.is_many());
  assert!(single.as_single().is_some());

  let many = Transcoder::new(
    &declaration,
    vec![
      ConfigOption::with_data(json!([{"label": "a"}])),
      ConfigOption::with_many(true),
    ],
  )
  .unwrap();
  assert!(many.is_many());
  assert!(many.as_many().is_some());
  assert!(many.is_valid(true).unwrap());
  assert_eq!(many.data().unwrap(), json!([{"label": "a"}]));
}

#[test]
fn test_wire_payload_shapes() {
  let declaration = tag();
  let single = Transcoder::new(&declaration, vec![ConfigOption::with_instance(json!({"label": "a"}))]).unwrap();
  match single.wire().unwrap() {
    WirePayload::Single(message) => assert_eq!(message.downcast_ref::<Tag>().unwrap().label, "a"),
    other => panic!("unexpected payload {:?}", other),
  }

  let many = Transcoder::new(
    &declaration,
    vec![
      ConfigOption::with_instance(json!([{"label": "a"}, {"label": "b"}])),
      ConfigOption::with_many(true),
    ],
  )
  .unwrap();
  let messages = many.wire().unwrap().into_vec();
  assert_eq!(messages.len(), 2);
  assert_eq!(messages[1].downcast_ref::<Tag>().unwrap().label, "b");
}

#[test]
fn test_data_before_validation() {
  let declaration = tag();
  let transcoder = Transcoder::new(&declaration, vec![ConfigOption::with_data(json!({"label": "a"}))]).unwrap();
  assert_eq!(
    transcoder.data().unwrap_err(),
    TranscodeError::Configuration(ConfigurationError::NotValidated("data"))
  );
  assert!(matches!(
    transcoder.wire().unwrap_err(),
    TranscodeError::Configuration(ConfigurationError::NotValidated("data"))
  ));
}

#[test]
fn test_nested_template_is_bound_to_field_name() {
  let mut template = Transcoder::template(&tag(), true, None);
  template.bind("tags");
  assert_eq!(template.field_name(), "tags");
  assert!(template.context().is_none());
  assert_eq!(
    template.validate_value(&json!([{"label": 1}])).unwrap(),
    NativeValue::List(vec![NativeValue::from(
      json!({"label": "1"})
    )])
  );
}
