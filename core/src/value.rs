use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde_json::{Map, Number, Value};
use std::error::Error;
use std::fmt::Debug;
use std::sync::Arc;

pub type NativeMap = IndexMap<String, NativeValue>;

pub type CallableResult = Result<NativeValue, Box<dyn Error + Send + Sync>>;

pub type CallableFn = Arc<dyn Fn() -> CallableResult + Send + Sync>;

pub(crate) const DATETIME_ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// A live object that can be represented without first being turned into a
/// mapping. Members are looked up by name during attribute-path resolution.
pub trait Instance: Debug + Send + Sync {
  fn attribute(&self, name: &str) -> Option<Attribute>;
}

/// A resolved member: either a plain value, or something to invoke with no
/// arguments whose result replaces it.
#[derive(Clone)]
pub enum Attribute {
  Value(NativeValue),
  Callable(CallableFn),
}

impl Attribute {
  pub fn value(value: impl Into<NativeValue>) -> Self {
    Attribute::Value(value.into())
  }

  pub fn callable<F>(f: F) -> Self
  where
    F: Fn() -> CallableResult + Send + Sync + 'static, {
    Attribute::Callable(Arc::new(f))
  }
}

impl Debug for Attribute {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Attribute::Value(value) => f.debug_tuple("Value").field(value).finish(),
      Attribute::Callable(_) => f.write_str("Callable(..)"),
    }
  }
}

#[derive(Debug, Clone)]
pub enum NativeValue {
  Null,
  Bool(bool),
  Int(i64),
  Float(f64),
  Text(String),
  DateTime(NaiveDateTime),
  List(Vec<NativeValue>),
  Map(NativeMap),
  Object(Arc<dyn Instance>),
}

impl NativeValue {
  pub fn object<I: Instance + 'static>(instance: I) -> Self {
    NativeValue::Object(Arc::new(instance))
  }

  pub fn is_null(&self) -> bool {
    matches!(self, NativeValue::Null)
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      NativeValue::Bool(value) => Some(*value),
      _ => None,
    }
  }

  pub fn as_i64(&self) -> Option<i64> {
    match self {
      NativeValue::Int(value) => Some(*value),
      _ => None,
    }
  }

  pub fn as_f64(&self) -> Option<f64> {
    match self {
      NativeValue::Float(value) => Some(*value),
      NativeValue::Int(value) => Some(*value as f64),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      NativeValue::Text(value) => Some(value),
      _ => None,
    }
  }

  pub fn as_map(&self) -> Option<&NativeMap> {
    match self {
      NativeValue::Map(map) => Some(map),
      _ => None,
    }
  }

  pub fn as_list(&self) -> Option<&[NativeValue]> {
    match self {
      NativeValue::List(items) => Some(items),
      _ => None,
    }
  }

  pub fn get(&self, key: &str) -> Option<&NativeValue> {
    self.as_map().and_then(|map| map.get(key))
  }

  pub fn kind_name(&self) -> &'static str {
    match self {
      NativeValue::Null => "null",
      NativeValue::Bool(_) => "bool",
      NativeValue::Int(_) => "int",
      NativeValue::Float(_) => "float",
      NativeValue::Text(_) => "str",
      NativeValue::DateTime(_) => "datetime",
      NativeValue::List(_) => "list",
      NativeValue::Map(_) => "dict",
      NativeValue::Object(_) => "object",
    }
  }

  /// Mapping form of a value that went through no field-specific
  /// representation. Live objects have no mapping form and become `null`.
  pub fn to_value(&self) -> Value {
    match self {
      NativeValue::Null => Value::Null,
      NativeValue::Bool(value) => Value::Bool(*value),
      NativeValue::Int(value) => Value::from(*value),
      NativeValue::Float(value) => float_to_value(*value),
      NativeValue::Text(value) => Value::String(value.clone()),
      NativeValue::DateTime(value) => Value::String(value.format(DATETIME_ISO_FORMAT).to_string()),
      NativeValue::List(items) => Value::Array(items.iter().map(NativeValue::to_value).collect()),
      NativeValue::Map(map) => Value::Object(
        map
          .iter()
          .map(|(key, value)| (key.clone(), value.to_value()))
          .collect::<Map<String, Value>>(),
      ),
      NativeValue::Object(object) => {
        tracing::debug!("NativeValue::to_value: no mapping form for {:?}", object);
        Value::Null
      }
    }
  }
}

pub(crate) fn float_to_value(value: f64) -> Value {
  Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
}

pub(crate) fn value_kind_name(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "bool",
    Value::Number(number) if number.is_f64() => "float",
    Value::Number(_) => "int",
    Value::String(_) => "str",
    Value::Array(_) => "list",
    Value::Object(_) => "dict",
  }
}

impl PartialEq for NativeValue {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (NativeValue::Null, NativeValue::Null) => true,
      (NativeValue::Bool(a), NativeValue::Bool(b)) => a == b,
      (NativeValue::Int(a), NativeValue::Int(b)) => a == b,
      (NativeValue::Float(a), NativeValue::Float(b)) => a == b,
      (NativeValue::Text(a), NativeValue::Text(b)) => a == b,
      (NativeValue::DateTime(a), NativeValue::DateTime(b)) => a == b,
      (NativeValue::List(a), NativeValue::List(b)) => a == b,
      (NativeValue::Map(a), NativeValue::Map(b)) => a == b,
      (NativeValue::Object(a), NativeValue::Object(b)) => Arc::ptr_eq(a, b),
      _ => false,
    }
  }
}

impl From<Value> for NativeValue {
  fn from(value: Value) -> Self {
    match value {
      Value::Null => NativeValue::Null,
      Value::Bool(value) => NativeValue::Bool(value),
      Value::Number(number) => match number.as_i64() {
        Some(value) => NativeValue::Int(value),
        None => NativeValue::Float(number.as_f64().unwrap_or(f64::NAN)),
      },
      Value::String(value) => NativeValue::Text(value),
      Value::Array(items) => NativeValue::List(items.into_iter().map(NativeValue::from).collect()),
      Value::Object(map) => NativeValue::Map(
        map
          .into_iter()
          .map(|(key, value)| (key, NativeValue::from(value)))
          .collect(),
      ),
    }
  }
}

impl From<&Value> for NativeValue {
  fn from(value: &Value) -> Self {
    NativeValue::from(value.clone())
  }
}

impl From<bool> for NativeValue {
  fn from(value: bool) -> Self {
    NativeValue::Bool(value)
  }
}

impl From<i64> for NativeValue {
  fn from(value: i64) -> Self {
    NativeValue::Int(value)
  }
}

impl From<i32> for NativeValue {
  fn from(value: i32) -> Self {
    NativeValue::Int(i64::from(value))
  }
}

impl From<f64> for NativeValue {
  fn from(value: f64) -> Self {
    NativeValue::Float(value)
  }
}

impl From<&str> for NativeValue {
  fn from(value: &str) -> Self {
    NativeValue::Text(value.to_string())
  }
}

impl From<String> for NativeValue {
  fn from(value: String) -> Self {
    NativeValue::Text(value)
  }
}

impl From<NaiveDateTime> for NativeValue {
  fn from(value: NaiveDateTime) -> Self {
    NativeValue::DateTime(value)
  }
}

impl From<Vec<NativeValue>> for NativeValue {
  fn from(value: Vec<NativeValue>) -> Self {
    NativeValue::List(value)
  }
}

impl From<NativeMap> for NativeValue {
  fn from(value: NativeMap) -> Self {
    NativeValue::Map(value)
  }
}

impl<T: Into<NativeValue>> From<Option<T>> for NativeValue {
  fn from(value: Option<T>) -> Self {
    value.map(Into::into).unwrap_or(NativeValue::Null)
  }
}

static_assertions::assert_impl_all!(NativeValue: Send, Sync);
