use super::*;
use rstest::*;

#[rstest(name, source, expected)]
#[case("username", None, vec!["username"])]
#[case("city", Some("address.city"), vec!["address", "city"])]
#[case("everything", Some("*"), vec![])]
fn test_derive_source_path(name: &str, source: Option<&str>, expected: Vec<&str>) {
  assert_eq!(derive_source_path(name, source), expected);
}

fn account() -> Arc<SerializerDeclaration> {
  let settings = SerializerDeclaration::builder("AccountSettings")
    .field("is_public", Field::boolean())
    .build()
    .unwrap();
  SerializerDeclaration::builder("Account")
    .field("username", Field::char().with_wire_name("login"))
    .field("city", Field::char().with_source("address.city"))
    .field("settings", Field::nested(&settings))
    .build()
    .unwrap()
}

#[test]
fn test_registry_binds_every_field() {
  let declaration = account();
  let registry = FieldRegistry::bind(&declaration);

  assert_eq!(registry.len(), 3);
  assert_eq!(registry.names().collect::<Vec<_>>(), vec!["username", "city", "settings"]);

  let username = registry.get("username").unwrap();
  assert_eq!(username.name(), "username");
  assert_eq!(username.output_key(), "login");
  assert_eq!(username.source_path(), ["username".to_string()]);
  assert!(Arc::ptr_eq(&username.owner().unwrap(), &declaration));

  let city = registry.get("city").unwrap();
  assert_eq!(city.output_key(), "city");
  assert_eq!(city.source_path(), ["address".to_string(), "city".to_string()]);
}

#[test]
fn test_nested_field_carries_child() {
  let declaration = account();
  let registry = FieldRegistry::bind(&declaration);
  let settings = registry.get("settings").unwrap();
  assert!(settings.is_nested());
  assert!(!registry.get("username").unwrap().is_nested());
  assert_eq!(settings.child().unwrap().field_name(), "settings");
}

#[test]
fn test_rebinding_keeps_source_path() {
  let declaration = account();
  let mut field = BoundField::new(Field::int());
  field.bind("first", &declaration);
  field.bind("second", &declaration);
  assert_eq!(field.name(), "second");
  assert_eq!(field.source_path(), ["first".to_string()]);
}

#[test]
fn test_owner_is_not_kept_alive() {
  let mut field = BoundField::new(Field::int());
  {
    let declaration = account();
    field.bind("balance", &declaration);
    assert!(field.owner().is_some());
  }
  assert!(field.owner().is_none());
}

#[test]
fn test_registries_are_independent() {
  let declaration = account();
  let mut first = FieldRegistry::bind(&declaration);
  let second = FieldRegistry::bind(&declaration);
  first.insert("extra", BoundField::new(Field::int()), &declaration);
  assert_eq!(first.len(), 4);
  assert_eq!(second.len(), 3);
  assert!(!second.is_empty());
}
