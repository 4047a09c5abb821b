use super::*;
use serde_json::json;

#[test]
fn test_positional_errors_with_only_empty_entries_are_empty() {
  let detail = ErrorDetail::Items(vec![ErrorDetail::empty(), ErrorDetail::empty()]);
  assert!(detail.is_empty());
  assert!(ErrorDetail::Items(vec![]).is_empty());
  assert!(!ErrorDetail::message("boom").is_empty());
}

#[test]
fn test_nested_detail_renders_as_json() {
  let mut inner = IndexMap::new();
  inner.insert("is_public".to_string(), ErrorDetail::message("Must be a valid boolean."));
  let mut outer = IndexMap::new();
  outer.insert("settings".to_string(), ErrorDetail::Fields(inner));
  outer.insert("balance".to_string(), ErrorDetail::message("Expected a number."));
  let detail = ErrorDetail::Items(vec![ErrorDetail::empty(), ErrorDetail::Fields(outer)]);

  assert_eq!(
    detail.to_value(),
    json!([{}, {"settings": {"is_public": "Must be a valid boolean."}, "balance": "Expected a number."}])
  );
  assert_eq!(serde_json::to_value(&detail).unwrap(), detail.to_value());
  assert_eq!(
    detail.item(1).and_then(|d| d.get("balance")).and_then(ErrorDetail::as_message),
    Some("Expected a number.")
  );
}

#[test]
fn test_field_error_detail_keeps_hook_payload() {
  let error = FieldError::validation("Balance must be positive");
  assert_eq!(error.detail(), ErrorDetail::message("Balance must be positive"));

  let error = FieldError::expected_type("int", "Expected a number.").at_index(2);
  assert_eq!(error.detail(), ErrorDetail::message("Item 2: Expected a number."));
}

#[test]
fn test_callable_failure_surfaces_as_its_own_variant() {
  let error = TranscodeError::representation("total", FieldError::from(CallableFailure::new("total", "boom")));
  assert!(matches!(error, TranscodeError::Callable(ref failure) if failure.attribute == "total"));
  assert_eq!(
    error.to_string(),
    "exception raised in callable attribute \"total\": boom"
  );
}
