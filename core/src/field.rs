use chrono::{DateTime, NaiveDateTime};
use serde_json::{Map, Value};
use std::fmt::{Debug, Formatter, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::Context;
use crate::declaration::SerializerDeclaration;
use crate::error::{ConfigurationError, FieldError};
use crate::serializer::Serializer;
use crate::value::{float_to_value, value_kind_name, NativeMap, NativeValue};

/// Source path meaning "the whole container" instead of a single key.
pub const ENTIRE_CONTAINER: &str = "*";

pub const DEFAULT_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const TRUE_LITERALS: [&str; 6] = ["t", "T", "true", "True", "TRUE", "1"];
const FALSE_LITERALS: [&str; 6] = ["f", "F", "false", "False", "FALSE", "0"];
const NULL_LITERALS: [&str; 6] = ["n", "N", "null", "Null", "NULL", ""];

static CREATION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Per-field override applied to the leaf-validated value. Its result
/// replaces the value; an error becomes the field's entry in the error map.
pub type ValidatorFn = Arc<dyn Fn(&Serializer, NativeValue) -> Result<NativeValue, FieldError> + Send + Sync>;

/// Computes a custom field from the whole incoming container and the raw value
/// found at the field's own key, if any.
pub type CustomGetterFn =
  Arc<dyn Fn(&Serializer, &Map<String, Value>, Option<&Value>) -> Result<Value, FieldError> + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub enum LeafKind {
  Boolean,
  Char { trim_whitespace: bool },
  Int,
  Float,
  ObjectId,
  DateTime { format: Option<String> },
  Timestamp(Box<LeafKind>),
  List(Option<Box<LeafKind>>),
  Dict(Option<Box<LeafKind>>),
  Custom(Option<Box<LeafKind>>),
}

#[derive(Debug, Clone)]
pub enum FieldKind {
  Leaf(LeafKind),
  Nested {
    declaration: Arc<SerializerDeclaration>,
    many: bool,
  },
}

impl FieldKind {
  pub fn name(&self) -> &'static str {
    match self {
      FieldKind::Leaf(leaf) => leaf.name(),
      FieldKind::Nested { many: false, .. } => "nested",
      FieldKind::Nested { many: true, .. } => "nested_many",
    }
  }

  pub fn as_leaf(&self) -> Option<&LeafKind> {
    match self {
      FieldKind::Leaf(leaf) => Some(leaf),
      FieldKind::Nested { .. } => None,
    }
  }
}

const LIST_CHILDREN: [&str; 7] = ["char", "datetime", "int", "object_id", "custom", "boolean", "float"];
const DICT_CHILDREN: [&str; 8] = ["char", "datetime", "int", "object_id", "custom", "boolean", "float", "list"];
const TIMESTAMP_CHILDREN: [&str; 3] = ["int", "char", "float"];

fn restricted_child(parent: &'static str, child: Field, allowed: &[&str]) -> Result<LeafKind, ConfigurationError> {
  let name = child.kind.name();
  match child.kind {
    FieldKind::Leaf(leaf) if allowed.contains(&name) => Ok(leaf),
    _ => Err(ConfigurationError::DisallowedChild {
      parent,
      child: name,
      allowed: allowed.join(", "),
    }),
  }
}

impl LeafKind {
  pub fn name(&self) -> &'static str {
    match self {
      LeafKind::Boolean => "boolean",
      LeafKind::Char { .. } => "char",
      LeafKind::Int => "int",
      LeafKind::Float => "float",
      LeafKind::ObjectId => "object_id",
      LeafKind::DateTime { .. } => "datetime",
      LeafKind::Timestamp(_) => "timestamp",
      LeafKind::List(_) => "list",
      LeafKind::Dict(_) => "dict",
      LeafKind::Custom(_) => "custom",
    }
  }

  /// Converts present, non-empty incoming data into its native form.
  pub fn validate_and_convert(&self, raw: &Value) -> Result<NativeValue, FieldError> {
    match self {
      LeafKind::Boolean => match boolean_literal(raw) {
        Some(value) => Ok(NativeValue::from(value)),
        None => Err(FieldError::expected_type("boolean", "Must be a valid boolean.")),
      },
      LeafKind::Char { trim_whitespace } => {
        let text = match raw {
          Value::String(text) => text.clone(),
          Value::Number(number) => number.to_string(),
          Value::Bool(value) => value.to_string(),
          other => {
            return Err(FieldError::expected_type(
              "char",
              format!("Not a valid string, got type \"{}\".", value_kind_name(other)),
            ))
          }
        };
        Ok(NativeValue::Text(if *trim_whitespace {
          text.trim().to_string()
        } else {
          text
        }))
      }
      LeafKind::Int => integer_from_value(raw)
        .map(NativeValue::Int)
        .ok_or_else(|| FieldError::expected_type("int", "Expected a number.")),
      LeafKind::Float => float_from_value(raw)
        .map(NativeValue::Float)
        .ok_or_else(|| FieldError::expected_type("float", "Expected a number.")),
      LeafKind::ObjectId => match raw {
        Value::String(text) => Ok(NativeValue::Text(text.clone())),
        Value::Number(number) => Ok(NativeValue::Text(number.to_string())),
        Value::Bool(value) => Ok(NativeValue::Text(value.to_string())),
        other => Err(FieldError::expected_type(
          "object_id",
          format!("Not a valid identifier, got type \"{}\".", value_kind_name(other)),
        )),
      },
      LeafKind::DateTime { format } => match (format, raw) {
        (Some(format), Value::String(text)) => NaiveDateTime::parse_from_str(text, format)
          .map(NativeValue::DateTime)
          .map_err(|_| {
            FieldError::expected_type(
              "datetime",
              format!("Datetime has wrong format. Use the format: {}.", format),
            )
          }),
        (None, Value::Number(_)) => float_from_value(raw)
          .and_then(datetime_from_epoch)
          .map(NativeValue::DateTime)
          .ok_or_else(|| FieldError::expected_type("datetime", "Expected an epoch timestamp.")),
        (Some(_), _) => Err(FieldError::expected_type("datetime", "Expected a datetime string.")),
        (None, _) => Err(FieldError::expected_type("datetime", "Expected an epoch timestamp.")),
      },
      LeafKind::Timestamp(child) => child.validate_and_convert(raw),
      LeafKind::List(child) => match raw {
        Value::Array(items) => items
          .iter()
          .enumerate()
          .map(|(index, item)| convert_with(child.as_deref(), item).map_err(|err| err.at_index(index)))
          .collect::<Result<Vec<_>, _>>()
          .map(NativeValue::List),
        other => Err(FieldError::expected_type(
          "list",
          format!("Expected a list of items but got type \"{}\".", value_kind_name(other)),
        )),
      },
      LeafKind::Dict(child) => match raw {
        Value::Object(map) => map
          .iter()
          .map(|(key, item)| {
            convert_with(child.as_deref(), item)
              .map(|value| (key.clone(), value))
              .map_err(|err| err.at_key(key))
          })
          .collect::<Result<NativeMap, _>>()
          .map(NativeValue::Map),
        other => Err(FieldError::expected_type(
          "dict",
          format!("Expected a dictionary of items but got type \"{}\".", value_kind_name(other)),
        )),
      },
      LeafKind::Custom(child) => match (child.as_deref(), raw) {
        (None, raw) => Ok(NativeValue::from(raw)),
        (Some(child), Value::Array(items)) => items
          .iter()
          .enumerate()
          .map(|(index, item)| child.validate_and_convert(item).map_err(|err| err.at_index(index)))
          .collect::<Result<Vec<_>, _>>()
          .map(NativeValue::List),
        (Some(child), raw) => child.validate_and_convert(raw),
      },
    }
  }

  /// Produces the outgoing mapping form of a native value. `null` passes
  /// through untouched.
  pub fn represent(&self, value: &NativeValue) -> Result<Value, FieldError> {
    if value.is_null() {
      return Ok(Value::Null);
    }
    match self {
      LeafKind::Boolean => Ok(Value::Bool(truthy(value))),
      LeafKind::Char { .. } => match value {
        NativeValue::Text(text) => Ok(Value::String(text.clone())),
        NativeValue::Int(number) => Ok(Value::String(number.to_string())),
        NativeValue::Float(number) => Ok(Value::String(number.to_string())),
        NativeValue::Bool(flag) => Ok(Value::String(flag.to_string())),
        NativeValue::DateTime(_) => Ok(value.to_value()),
        other => Err(unrepresentable("char", other)),
      },
      LeafKind::Int => match value {
        NativeValue::Int(number) => Ok(Value::from(*number)),
        NativeValue::Float(number) if number.is_finite() => Ok(Value::from(number.trunc() as i64)),
        NativeValue::Bool(flag) => Ok(Value::from(i64::from(*flag))),
        NativeValue::Text(text) => text
          .trim()
          .parse::<i64>()
          .map(Value::from)
          .map_err(|_| FieldError::expected_type("int", "Expected a number.")),
        other => Err(unrepresentable("int", other)),
      },
      LeafKind::Float => match value {
        NativeValue::Float(number) => Ok(float_to_value(*number)),
        NativeValue::Int(number) => Ok(float_to_value(*number as f64)),
        NativeValue::Bool(flag) => Ok(float_to_value(if *flag { 1.0 } else { 0.0 })),
        NativeValue::Text(text) => text
          .trim()
          .parse::<f64>()
          .map(float_to_value)
          .map_err(|_| FieldError::expected_type("float", "Expected a number.")),
        other => Err(unrepresentable("float", other)),
      },
      LeafKind::ObjectId => match value {
        NativeValue::Text(text) => Ok(Value::String(text.clone())),
        NativeValue::Int(number) => Ok(Value::String(number.to_string())),
        NativeValue::Float(number) => Ok(Value::String(number.to_string())),
        NativeValue::Bool(flag) => Ok(Value::String(flag.to_string())),
        other => Err(unrepresentable("object_id", other)),
      },
      LeafKind::DateTime { format } => match (value, format) {
        (NativeValue::DateTime(at), Some(format)) => format_datetime(at, format).map(Value::String),
        (NativeValue::DateTime(at), None) => Ok(epoch_value(at)),
        (NativeValue::Text(_) | NativeValue::Int(_) | NativeValue::Float(_), _) => Ok(value.to_value()),
        (other, _) => Err(unrepresentable("datetime", other)),
      },
      LeafKind::Timestamp(child) => match value {
        NativeValue::DateTime(at) => Ok(epoch_value(at)),
        other => child.represent(other),
      },
      LeafKind::List(child) => match value {
        NativeValue::List(items) => items
          .iter()
          .map(|item| represent_with(child.as_deref(), item))
          .collect::<Result<Vec<_>, _>>()
          .map(Value::Array),
        other => Err(unrepresentable("list", other)),
      },
      LeafKind::Dict(child) => match value {
        NativeValue::Map(map) => map
          .iter()
          .map(|(key, item)| represent_with(child.as_deref(), item).map(|value| (key.clone(), value)))
          .collect::<Result<Map<String, Value>, _>>()
          .map(Value::Object),
        other => Err(unrepresentable("dict", other)),
      },
      LeafKind::Custom(child) => match (child.as_deref(), value) {
        (None, value) => Ok(value.to_value()),
        (Some(child), NativeValue::List(items)) => items
          .iter()
          .map(|item| child.represent(item))
          .collect::<Result<Vec<_>, _>>()
          .map(Value::Array),
        (Some(child), value) => child.represent(value),
      },
    }
  }

  /// Wire-compatible form: the representation, with `null` meaning "leave
  /// the wire field unset".
  pub fn to_wire(&self, value: &NativeValue) -> Result<Option<Value>, FieldError> {
    self
      .represent(value)
      .map(|value| if value.is_null() { None } else { Some(value) })
  }
}

fn convert_with(child: Option<&LeafKind>, raw: &Value) -> Result<NativeValue, FieldError> {
  match child {
    Some(child) => child.validate_and_convert(raw),
    None => Ok(NativeValue::from(raw)),
  }
}

fn represent_with(child: Option<&LeafKind>, value: &NativeValue) -> Result<Value, FieldError> {
  match child {
    Some(child) => child.represent(value),
    None => Ok(value.to_value()),
  }
}

fn unrepresentable(expected: &'static str, value: &NativeValue) -> FieldError {
  FieldError::expected_type(
    expected,
    format!("Cannot represent a value of type \"{}\" as {}.", value.kind_name(), expected),
  )
}

/// Tri-state literal match: `Some(Some(b))` for a boolean literal,
/// `Some(None)` for a null literal, `None` when the value is neither.
fn boolean_literal(raw: &Value) -> Option<Option<bool>> {
  match raw {
    Value::Bool(value) => Some(Some(*value)),
    Value::Null => Some(None),
    Value::Number(number) => match number.as_f64() {
      Some(value) if value == 1.0 => Some(Some(true)),
      Some(value) if value == 0.0 => Some(Some(false)),
      _ => None,
    },
    Value::String(text) => {
      let text = text.as_str();
      if TRUE_LITERALS.contains(&text) {
        Some(Some(true))
      } else if FALSE_LITERALS.contains(&text) {
        Some(Some(false))
      } else if NULL_LITERALS.contains(&text) {
        Some(None)
      } else {
        None
      }
    }
    _ => None,
  }
}

fn truthy(value: &NativeValue) -> bool {
  match value {
    NativeValue::Null => false,
    NativeValue::Bool(flag) => *flag,
    NativeValue::Int(number) => *number != 0,
    NativeValue::Float(number) => *number != 0.0,
    NativeValue::Text(text) => match boolean_literal(&Value::String(text.clone())) {
      Some(literal) => literal.unwrap_or(false),
      None => !text.is_empty(),
    },
    NativeValue::List(items) => !items.is_empty(),
    NativeValue::Map(map) => !map.is_empty(),
    NativeValue::DateTime(_) | NativeValue::Object(_) => true,
  }
}

fn integer_from_value(raw: &Value) -> Option<i64> {
  match raw {
    Value::Number(number) => number.as_i64().or_else(|| {
      number
        .as_f64()
        .filter(|value| value.is_finite() && value.abs() < i64::MAX as f64)
        .map(|value| value.trunc() as i64)
    }),
    Value::String(text) => text.trim().parse::<i64>().ok(),
    Value::Bool(flag) => Some(i64::from(*flag)),
    _ => None,
  }
}

fn float_from_value(raw: &Value) -> Option<f64> {
  match raw {
    Value::Number(number) => number.as_f64(),
    Value::String(text) => text.trim().parse::<f64>().ok(),
    Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
    _ => None,
  }
}

fn datetime_from_epoch(seconds: f64) -> Option<NaiveDateTime> {
  if !seconds.is_finite() {
    return None;
  }
  let whole = seconds.floor();
  let nanos = ((seconds - whole) * 1_000_000_000.0).round() as u32;
  DateTime::from_timestamp(whole as i64, nanos.min(999_999_999)).map(|at| at.naive_utc())
}

fn epoch_value(at: &NaiveDateTime) -> Value {
  let utc = at.and_utc();
  if utc.timestamp_subsec_nanos() == 0 {
    Value::from(utc.timestamp())
  } else {
    float_to_value(utc.timestamp() as f64 + f64::from(utc.timestamp_subsec_nanos()) / 1_000_000_000.0)
  }
}

fn format_datetime(at: &NaiveDateTime, format: &str) -> Result<String, FieldError> {
  let mut text = String::new();
  write!(text, "{}", at.format(format))
    .map_err(|_| FieldError::expected_type("datetime", format!("Invalid datetime format: {}.", format)))?;
  Ok(text)
}

/// Outcome of the emptiness check that runs before any leaf conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum Emptiness {
  /// Absent or `null`: the value to use without further validation.
  Empty(NativeValue),
  /// Data that must go through validation.
  Present(Value),
}

/// Declarative description of one named attribute.
///
/// Fields are immutable once declared; binding to a serializer happens on a
/// per-instance copy (see [`crate::binding::BoundField`]).
#[derive(Clone)]
pub struct Field {
  kind: FieldKind,
  creation_index: u64,
  initial: Value,
  default: Value,
  custom: bool,
  context: Option<Context>,
  wire_name: Option<String>,
  source: Option<String>,
  validator: Option<ValidatorFn>,
  custom_getter: Option<CustomGetterFn>,
}

impl Field {
  fn new(kind: FieldKind) -> Self {
    Self {
      kind,
      creation_index: CREATION_COUNTER.fetch_add(1, Ordering::Relaxed),
      initial: Value::Null,
      default: Value::Null,
      custom: false,
      context: None,
      wire_name: None,
      source: None,
      validator: None,
      custom_getter: None,
    }
  }

  fn leaf(kind: LeafKind) -> Self {
    Self::new(FieldKind::Leaf(kind))
  }

  pub fn boolean() -> Self {
    Self::leaf(LeafKind::Boolean)
  }

  pub fn char() -> Self {
    Self::leaf(LeafKind::Char { trim_whitespace: true })
  }

  pub fn int() -> Self {
    Self::leaf(LeafKind::Int)
  }

  pub fn float() -> Self {
    Self::leaf(LeafKind::Float)
  }

  pub fn object_id() -> Self {
    Self::leaf(LeafKind::ObjectId)
  }

  pub fn datetime() -> Self {
    Self::datetime_with_format(Some(DEFAULT_DATETIME_FORMAT))
  }

  /// `None` switches to epoch seconds on both sides.
  pub fn datetime_with_format(format: Option<&str>) -> Self {
    Self::leaf(LeafKind::DateTime {
      format: format.map(str::to_string),
    })
  }

  pub fn timestamp() -> Self {
    Self::leaf(LeafKind::Timestamp(Box::new(LeafKind::Int)))
  }

  pub fn timestamp_of(child: Field) -> Result<Self, ConfigurationError> {
    let child = restricted_child("timestamp", child, &TIMESTAMP_CHILDREN)?;
    Ok(Self::leaf(LeafKind::Timestamp(Box::new(child))))
  }

  pub fn list() -> Self {
    Self::leaf(LeafKind::List(None))
  }

  pub fn list_of(child: Field) -> Result<Self, ConfigurationError> {
    let child = restricted_child("list", child, &LIST_CHILDREN)?;
    Ok(Self::leaf(LeafKind::List(Some(Box::new(child)))))
  }

  pub fn dict() -> Self {
    Self::leaf(LeafKind::Dict(None))
  }

  pub fn dict_of(child: Field) -> Result<Self, ConfigurationError> {
    let child = restricted_child("dict", child, &DICT_CHILDREN)?;
    Ok(Self::leaf(LeafKind::Dict(Some(Box::new(child)))))
  }

  /// A field always filled by the owning serializer's custom getter.
  pub fn computed() -> Self {
    let mut field = Self::leaf(LeafKind::Custom(None));
    field.custom = true;
    field
  }

  pub fn computed_of(child: Field) -> Result<Self, ConfigurationError> {
    let child = restricted_child("custom", child, &LIST_CHILDREN)?;
    let mut field = Self::leaf(LeafKind::Custom(Some(Box::new(child))));
    field.custom = true;
    Ok(field)
  }

  pub fn nested(declaration: &Arc<SerializerDeclaration>) -> Self {
    Self::new(FieldKind::Nested {
      declaration: declaration.clone(),
      many: false,
    })
  }

  pub fn nested_many(declaration: &Arc<SerializerDeclaration>) -> Self {
    Self::new(FieldKind::Nested {
      declaration: declaration.clone(),
      many: true,
    })
  }

  pub fn with_initial(mut self, initial: Value) -> Self {
    self.initial = initial;
    self
  }

  pub fn with_default(mut self, default: Value) -> Self {
    self.default = default;
    self
  }

  /// Marks the field as filled by a custom getter rather than read from input.
  pub fn as_custom(mut self) -> Self {
    self.custom = true;
    self
  }

  pub fn with_context<T: std::any::Any + Send + Sync>(mut self, context: T) -> Self {
    self.context = Some(Arc::new(context));
    self
  }

  /// Outgoing key used instead of the field name.
  pub fn with_wire_name(mut self, wire_name: &str) -> Self {
    self.wire_name = Some(wire_name.to_string());
    self
  }

  /// Dotted path the field reads from, or [`ENTIRE_CONTAINER`].
  pub fn with_source(mut self, source: &str) -> Self {
    self.source = Some(source.to_string());
    self
  }

  /// Only meaningful for text fields.
  pub fn trim_whitespace(mut self, trim: bool) -> Self {
    if let FieldKind::Leaf(LeafKind::Char { trim_whitespace }) = &mut self.kind {
      *trim_whitespace = trim;
    }
    self
  }

  pub(crate) fn set_validator(&mut self, validator: ValidatorFn) {
    self.validator = Some(validator);
  }

  pub(crate) fn set_custom_getter(&mut self, getter: CustomGetterFn) {
    self.custom_getter = Some(getter);
  }

  pub fn kind(&self) -> &FieldKind {
    &self.kind
  }

  pub fn creation_index(&self) -> u64 {
    self.creation_index
  }

  pub fn initial(&self) -> &Value {
    &self.initial
  }

  pub fn default_value(&self) -> &Value {
    &self.default
  }

  pub fn is_custom(&self) -> bool {
    self.custom
  }

  pub fn context(&self) -> Option<&Context> {
    self.context.as_ref()
  }

  pub fn wire_name(&self) -> Option<&str> {
    self.wire_name.as_deref()
  }

  pub fn source(&self) -> Option<&str> {
    self.source.as_deref()
  }

  pub fn validator(&self) -> Option<&ValidatorFn> {
    self.validator.as_ref()
  }

  pub fn custom_getter(&self) -> Option<&CustomGetterFn> {
    self.custom_getter.as_ref()
  }

  pub fn reads_entire_container(&self) -> bool {
    self.source.as_deref() == Some(ENTIRE_CONTAINER)
  }

  /// Absent data takes the default; `null` stays `null` unless the field
  /// reads the entire container, in which case it is handed to validation.
  pub fn check_empty(&self, raw: Option<Value>) -> Emptiness {
    match raw {
      None => Emptiness::Empty(NativeValue::from(&self.default)),
      Some(Value::Null) if !self.reads_entire_container() => Emptiness::Empty(NativeValue::Null),
      Some(raw) => Emptiness::Present(raw),
    }
  }
}

impl Debug for Field {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Field")
      .field("kind", &self.kind.name())
      .field("creation_index", &self.creation_index)
      .field("default", &self.default)
      .field("custom", &self.custom)
      .field("wire_name", &self.wire_name)
      .field("source", &self.source)
      .field("validator", &self.validator.is_some())
      .field("custom_getter", &self.custom_getter.is_some())
      .finish()
  }
}
