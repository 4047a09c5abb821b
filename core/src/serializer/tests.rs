use super::*;
use crate::bridge::Source;
use crate::config_option::ConfigOption;
use crate::error::CallableFailure;
use crate::field::Field;
use crate::value::{Attribute, Instance};
use serde_json::json;
use std::io;

fn account() -> Arc<SerializerDeclaration> {
  SerializerDeclaration::builder("Account")
    .field("username", Field::char())
    .field("balance", Field::int())
    .validator("username", |_, value| match value.as_str() {
      Some(name) if name.chars().count() < 3 => Err(FieldError::validation("Username is too short.")),
      _ => Ok(value),
    })
    .validator("balance", |_, value| match value.as_i64() {
      Some(balance) if balance < 0 => Err(FieldError::validation("Balance must not be negative.")),
      _ => Ok(value),
    })
    .build()
    .unwrap()
}

fn serializer(declaration: &Arc<SerializerDeclaration>, options: Vec<ConfigOption>) -> Serializer {
  Serializer::new(declaration, Config::from(options)).unwrap()
}

#[test]
fn test_every_failing_field_is_reported() {
  let declaration = SerializerDeclaration::builder("Profile")
    .extends(&account())
    .field("nickname", Field::char())
    .build()
    .unwrap();
  let serializer = serializer(
    &declaration,
    vec![ConfigOption::with_data(json!({"username": "Jo", "balance": -5, "nickname": "J"}))],
  );

  assert!(!serializer.is_valid(false).unwrap());
  let errors = serializer.errors().unwrap();
  assert_eq!(
    errors.to_value(),
    json!({"username": "Username is too short.", "balance": "Balance must not be negative."})
  );
  assert!(errors.get("nickname").is_none());
  assert_eq!(serializer.validated_data().unwrap(), &NativeValue::Map(NativeMap::new()));
}

#[test]
fn test_raise_mode_returns_aggregated_errors() {
  let declaration = account();
  let serializer = serializer(
    &declaration,
    vec![ConfigOption::with_data(json!({"username": "John", "balance": "lots"}))],
  );

  let err = serializer.is_valid(true).unwrap_err();
  assert_eq!(err.detail().map(ErrorDetail::to_value), Some(json!({"balance": "Expected a number."})));
  assert!(!serializer.is_valid(false).unwrap());
}

#[test]
fn test_validator_result_wins() {
  let declaration = SerializerDeclaration::builder("Account")
    .field("username", Field::char())
    .field("balance", Field::int())
    .validator("balance", |_, value| Ok(NativeValue::from(value.as_i64().unwrap_or_default() * 100)))
    .build()
    .unwrap();
  let serializer = serializer(
    &declaration,
    vec![ConfigOption::with_data(json!({"username": "John Doe", "balance": 123}))],
  );

  assert!(serializer.is_valid(true).unwrap());
  assert_eq!(
    serializer.data().unwrap(),
    json!({"username": "John Doe", "balance": 12300}).as_object().unwrap()
  );
}

#[test]
fn test_absent_fields_take_defaults_unless_partial() {
  let declaration = SerializerDeclaration::builder("Account")
    .field("username", Field::char())
    .field("balance", Field::int().with_default(json!(10)))
    .field("nickname", Field::char())
    .build()
    .unwrap();

  let full = serializer(&declaration, vec![ConfigOption::with_data(json!({"username": "jo"}))]);
  assert!(full.is_valid(false).unwrap());
  assert_eq!(
    full.validated_data().unwrap().to_value(),
    json!({"username": "jo", "balance": 10, "nickname": null})
  );

  let partial = serializer(
    &declaration,
    vec![
      ConfigOption::with_data(json!({"username": "jo"})),
      ConfigOption::with_partial(true),
    ],
  );
  assert!(partial.is_valid(false).unwrap());
  assert_eq!(partial.validated_data().unwrap().to_value(), json!({"username": "jo"}));
}

#[test]
fn test_validators_skip_empty_values() {
  let declaration = SerializerDeclaration::builder("Account")
    .field("balance", Field::int())
    .validator("balance", |_, _| Err(FieldError::validation("never")))
    .build()
    .unwrap();
  let serializer = serializer(&declaration, vec![ConfigOption::with_data(json!({"balance": null}))]);
  assert!(serializer.is_valid(false).unwrap());
}

#[test]
fn test_entire_container_source() {
  let declaration = SerializerDeclaration::builder("Envelope")
    .field("payload", Field::dict().with_source("*"))
    .field("kind", Field::char())
    .build()
    .unwrap();
  let serializer = serializer(
    &declaration,
    vec![ConfigOption::with_data(json!({"kind": "event", "id": 7}))],
  );

  assert!(serializer.is_valid(false).unwrap());
  // The container is merged into the result as it was received.
  assert_eq!(
    serializer.validated_data().unwrap().to_value(),
    json!({"kind": "event", "id": 7})
  );
}

#[test]
fn test_entire_container_hook_sees_everything() {
  let declaration = SerializerDeclaration::builder("Envelope")
    .field("size", Field::dict().with_source("*"))
    .validator("size", |_, value| {
      let mut ret = NativeMap::new();
      ret.insert(
        "size".to_string(),
        NativeValue::from(value.as_map().map(|map| map.len() as i64)),
      );
      Ok(NativeValue::Map(ret))
    })
    .build()
    .unwrap();
  let serializer = serializer(&declaration, vec![ConfigOption::with_data(json!({"a": 1, "b": 2}))]);

  assert!(serializer.is_valid(false).unwrap());
  assert_eq!(serializer.validated_data().unwrap().to_value(), json!({"size": 2}));
}

#[test]
fn test_entire_container_field_must_produce_mapping() {
  let declaration = SerializerDeclaration::builder("Envelope")
    .field("size", Field::dict().with_source("*"))
    .validator("size", |_, value| Ok(NativeValue::from(value.as_map().map(|map| map.len() as i64))))
    .build()
    .unwrap();
  let serializer = serializer(&declaration, vec![ConfigOption::with_data(json!({"a": 1, "b": 2}))]);

  assert!(!serializer.is_valid(false).unwrap());
  assert_eq!(
    serializer.errors().unwrap().get("size").and_then(ErrorDetail::as_message),
    Some("Expected a mapping to merge into the container but got type \"int\".")
  );
  assert_eq!(serializer.validated_data().unwrap(), &NativeValue::Map(NativeMap::new()));
  // Nothing validated is represented: the initial view is returned as received.
  assert_eq!(serializer.data().unwrap(), json!({"size": {"a": 1, "b": 2}}).as_object().unwrap());
}

#[test]
fn test_dotted_source_does_not_overwrite_validated_field() {
  let declaration = SerializerDeclaration::builder("Account")
    .field("address", Field::char())
    .field("city", Field::char().with_source("address.city"))
    .build()
    .unwrap();
  let serializer = serializer(&declaration, vec![ConfigOption::with_data(json!({"address": "Main St"}))]);

  assert!(!serializer.is_valid(false).unwrap());
  assert_eq!(
    serializer.errors().unwrap().to_value(),
    json!({"city": "Cannot write to \"address.city\": a parent key already holds a value."})
  );
}

#[test]
fn test_dotted_source_nests_validated_value() {
  let declaration = SerializerDeclaration::builder("Account")
    .field("city", Field::char().with_source("address.city"))
    .build()
    .unwrap();
  let serializer = serializer(
    &declaration,
    vec![ConfigOption::with_data(json!({"address": {"city": " Oslo "}}))],
  );

  assert!(serializer.is_valid(false).unwrap());
  assert_eq!(
    serializer.validated_data().unwrap().to_value(),
    json!({"address": {"city": "Oslo"}})
  );
  assert_eq!(serializer.data().unwrap(), json!({"city": "Oslo"}).as_object().unwrap());
}

#[test]
fn test_custom_getter_fills_field() {
  let declaration = SerializerDeclaration::builder("Account")
    .field("balance", Field::int())
    .field("doubled", Field::int().as_custom())
    .field("unfilled", Field::computed())
    .custom_getter("doubled", |_, container, own| {
      assert!(own.is_none());
      let balance = container.get("balance").and_then(Value::as_i64).unwrap_or_default();
      Ok(Value::from(balance * 2))
    })
    .build()
    .unwrap();
  let serializer = serializer(&declaration, vec![ConfigOption::with_data(json!({"balance": 597}))]);

  assert!(serializer.is_valid(false).unwrap());
  assert_eq!(
    serializer.data().unwrap(),
    json!({"balance": 597, "doubled": 1194, "unfilled": null}).as_object().unwrap()
  );
}

#[test]
fn test_results_need_validation_first() {
  let declaration = account();
  let serializer = serializer(&declaration, vec![ConfigOption::with_data(json!({"username": "John"}))]);

  assert_eq!(
    serializer.data().unwrap_err(),
    TranscodeError::Configuration(ConfigurationError::NotValidated("data"))
  );
  assert_eq!(
    serializer.errors().unwrap_err(),
    TranscodeError::Configuration(ConfigurationError::NotValidated("errors"))
  );
  assert_eq!(
    serializer.validated_data().unwrap_err(),
    TranscodeError::Configuration(ConfigurationError::NotValidated("validated_data"))
  );
}

#[test]
fn test_validation_needs_data() {
  let declaration = account();
  let serializer = serializer(&declaration, vec![]);
  assert_eq!(
    serializer.is_valid(false).unwrap_err(),
    TranscodeError::Configuration(ConfigurationError::MissingData("Account".to_string()))
  );
}

#[test]
fn test_non_mapping_input() {
  let declaration = account();
  let serializer = serializer(&declaration, vec![ConfigOption::with_data(json!("John"))]);
  assert!(!serializer.is_valid(false).unwrap());
  assert_eq!(
    serializer.errors().unwrap().as_message(),
    Some("Invalid data. Expected a mapping, but got str.")
  );
}

#[test]
fn test_initial_views() {
  let declaration = SerializerDeclaration::builder("Account")
    .field("username", Field::char().with_initial(json!("guest")))
    .field("balance", Field::int())
    .build()
    .unwrap();

  let blank = serializer(&declaration, vec![]);
  assert_eq!(
    blank.data().unwrap(),
    json!({"username": "guest", "balance": null}).as_object().unwrap()
  );

  let invalid = serializer(&declaration, vec![ConfigOption::with_data(json!({"balance": "x", "other": 1}))]);
  assert!(!invalid.is_valid(false).unwrap());
  assert_eq!(invalid.data().unwrap(), json!({"balance": "x"}).as_object().unwrap());
}

#[derive(Debug)]
struct User {
  name: String,
  fail: bool,
}

impl Instance for User {
  fn attribute(&self, name: &str) -> Option<Attribute> {
    match name {
      "username" => Some(Attribute::value(self.name.clone())),
      "balance" => {
        let fail = self.fail;
        Some(Attribute::callable(move || {
          if fail {
            Err(io::Error::new(io::ErrorKind::Other, "ledger offline").into())
          } else {
            Ok(NativeValue::from(42))
          }
        }))
      }
      _ => None,
    }
  }
}

#[test]
fn test_represents_live_objects() {
  let declaration = account();
  let instance = NativeValue::object(User {
    name: "ana".to_string(),
    fail: false,
  });
  let serializer = serializer(&declaration, vec![ConfigOption::with_instance(instance)]);
  assert_eq!(
    serializer.data().unwrap(),
    json!({"username": "ana", "balance": 42}).as_object().unwrap()
  );
}

#[test]
fn test_failing_callable_is_not_absent() {
  let declaration = account();
  let instance = NativeValue::object(User {
    name: "ana".to_string(),
    fail: true,
  });
  let serializer = serializer(&declaration, vec![ConfigOption::with_instance(instance)]);
  assert!(matches!(
    serializer.data().unwrap_err(),
    TranscodeError::Callable(CallableFailure { attribute, .. }) if attribute == "balance"
  ));
}

#[test]
fn test_mapping_instance_is_validated_before_representation() {
  let declaration = SerializerDeclaration::builder("Account")
    .field("username", Field::char().with_wire_name("login"))
    .field("balance", Field::int())
    .build()
    .unwrap();
  let serializer = serializer(
    &declaration,
    vec![ConfigOption::with_instance(json!({"username": " jo ", "balance": "12"}))],
  );
  assert_eq!(
    serializer.data().unwrap(),
    json!({"login": "jo", "balance": 12}).as_object().unwrap()
  );
}

#[test]
fn test_representer_reads_context() {
  let declaration = SerializerDeclaration::builder("Account")
    .field("username", Field::char())
    .representer(|serializer, instance| {
      let mut ret = serializer.to_representation(instance)?;
      let suffix = serializer.context_as::<String>().cloned().unwrap_or_default();
      ret.insert("greeting".to_string(), Value::String(format!("hello {}", suffix)));
      Ok(ret)
    })
    .build()
    .unwrap();
  let serializer = serializer(
    &declaration,
    vec![
      ConfigOption::with_instance(json!({"username": "jo"})),
      ConfigOption::with_context("world".to_string()),
    ],
  );
  assert_eq!(
    serializer.data().unwrap(),
    json!({"username": "jo", "greeting": "hello world"}).as_object().unwrap()
  );
  assert!(serializer.context_as::<i32>().is_none());
}

#[test]
fn test_wire_output_needs_schema() {
  let declaration = account();
  let serializer = serializer(&declaration, vec![ConfigOption::with_instance(json!({"username": "jo"}))]);
  assert_eq!(
    serializer.wire_message().unwrap_err(),
    TranscodeError::Configuration(ConfigurationError::MissingSchema("Account".to_string()))
  );
}

#[test]
fn test_field_views() {
  let settings = SerializerDeclaration::builder("AccountSettings")
    .field("is_public", Field::boolean())
    .build()
    .unwrap();
  let declaration = SerializerDeclaration::builder("Account")
    .field("username", Field::char())
    .field("settings", Field::nested(&settings))
    .build()
    .unwrap();
  let serializer = serializer(
    &declaration,
    vec![ConfigOption::with_data(Source::from(json!({"username": "jo", "settings": {"is_public": "maybe"}})))],
  );
  assert!(!serializer.is_valid(false).unwrap());

  let username = serializer.field_view("username").unwrap();
  assert_eq!(username.value(), &json!("jo"));
  assert!(username.errors().is_none());

  let view = serializer.field_view("settings").unwrap();
  assert!(view.is_nested());
  let is_public = view.get("is_public").unwrap();
  assert_eq!(is_public.name(), "settings.is_public");
  assert_eq!(is_public.value(), &json!("maybe"));
  assert_eq!(
    is_public.errors().and_then(ErrorDetail::as_message),
    Some("Must be a valid boolean.")
  );

  assert!(matches!(
    serializer.field_view("missing").unwrap_err(),
    TranscodeError::Configuration(ConfigurationError::UnknownField { .. })
  ));
}
