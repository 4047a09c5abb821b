use serde_json::Value;

use crate::error::CallableFailure;
use crate::value::{Attribute, NativeMap, NativeValue};

/// Walks `path` from `instance`, tolerating missing segments.
///
/// Maps are read by key, lists by numeric index and objects by member name.
/// A callable member is invoked and its result replaces it before the walk
/// goes on. Any missing key, index or member resolves the whole path to
/// `None`; only a failing callable is an error. An empty path yields the
/// instance itself.
pub fn resolve_attribute(instance: &NativeValue, path: &[String]) -> Result<Option<NativeValue>, CallableFailure> {
  let mut current = instance.clone();
  for segment in path {
    let next = match &current {
      NativeValue::Map(map) => map.get(segment).cloned(),
      NativeValue::List(items) => segment.parse::<usize>().ok().and_then(|index| items.get(index).cloned()),
      NativeValue::Object(object) => match object.attribute(segment) {
        Some(Attribute::Value(value)) => Some(value),
        Some(Attribute::Callable(callable)) => match callable() {
          Ok(value) => Some(value),
          Err(err) => {
            tracing::warn!("resolve_attribute: callable `{}` failed: {}", segment, err);
            return Err(CallableFailure::new(segment.as_str(), err.to_string()));
          }
        },
        None => None,
      },
      _ => None,
    };
    match next {
      Some(value) => current = value,
      None => return Ok(None),
    }
  }
  Ok(Some(current))
}

/// Strict counterpart of [`resolve_attribute`] over incoming raw data. `None`
/// means the value is absent, which is different from an explicit `null`.
pub fn lookup_value<'a>(container: &'a Value, path: &[String]) -> Option<&'a Value> {
  path.iter().try_fold(container, |current, segment| match current {
    Value::Object(map) => map.get(segment),
    Value::Array(items) => segment.parse::<usize>().ok().and_then(|index| items.get(index)),
    _ => None,
  })
}

/// Writes `value` at the nested `keys` of `target`, creating intermediate
/// maps on the way. A `null` intermediate is replaced by a map; any other
/// non-map intermediate is left untouched and the value is handed back as
/// `Err`.
///
/// With no keys the value must itself be a map, which is merged into
/// `target`; any other value is handed back as `Err`.
///
/// ```text
/// set_value({a: 1}, [], {b: 2})     -> {a: 1, b: 2}
/// set_value({a: 1}, [x], 2)         -> {a: 1, x: 2}
/// set_value({a: 1}, [x, y], 2)      -> {a: 1, x: {y: 2}}
/// ```
pub fn set_value(target: &mut NativeMap, keys: &[String], value: NativeValue) -> Result<(), NativeValue> {
  let Some((last, parents)) = keys.split_last() else {
    return match value {
      NativeValue::Map(map) => {
        target.extend(map);
        Ok(())
      }
      other => Err(other),
    };
  };

  let mut current = target;
  for key in parents {
    let entry = current.entry(key.clone()).or_insert(NativeValue::Null);
    if entry.is_null() {
      *entry = NativeValue::Map(NativeMap::new());
    }
    current = match entry {
      NativeValue::Map(map) => map,
      _ => return Err(value),
    };
  }
  current.insert(last.clone(), value);
  Ok(())
}
