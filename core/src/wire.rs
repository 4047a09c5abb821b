//! Boundary with the wire-schema runtime.
//!
//! The engine only ever hands a mapping to [`WireSchema::encode`] and reads a
//! mapping back through [`WireMessage::decode`]; it never looks at the binary
//! layout. [`ProstSchema`] provides both sides for prost messages that also
//! derive serde.

use prost::Message as ProstMessage;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::any::Any;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::WireError;

pub trait WireMessage: Debug + Send + Sync + 'static {
  fn type_name(&self) -> &'static str;

  /// Field-name-preserving mapping form of the message.
  fn decode(&self) -> Result<Map<String, Value>, WireError>;

  fn encode_to_vec(&self) -> Vec<u8>;

  fn as_any(&self) -> &dyn Any;
}

impl dyn WireMessage {
  pub fn downcast_ref<M: WireMessage>(&self) -> Option<&M> {
    self.as_any().downcast_ref::<M>()
  }
}

impl<M> WireMessage for M
where
  M: ProstMessage + Serialize + 'static,
{
  fn type_name(&self) -> &'static str {
    std::any::type_name::<M>()
  }

  fn decode(&self) -> Result<Map<String, Value>, WireError> {
    match serde_json::to_value(self) {
      Ok(Value::Object(map)) => Ok(map),
      Ok(other) => Err(WireError::Decode {
        type_name: std::any::type_name::<M>(),
        message: format!("expected a message, got {}", other),
      }),
      Err(e) => Err(WireError::Decode {
        type_name: std::any::type_name::<M>(),
        message: e.to_string(),
      }),
    }
  }

  fn encode_to_vec(&self) -> Vec<u8> {
    ProstMessage::encode_to_vec(self)
  }

  fn as_any(&self) -> &dyn Any {
    self
  }
}

/// Schema type a composite may be associated with.
pub trait WireSchema: Debug + Send + Sync {
  fn type_name(&self) -> &'static str;

  fn encode(&self, mapping: &Map<String, Value>) -> Result<Arc<dyn WireMessage>, WireError>;

  /// Restores a message previously produced by [`WireMessage::encode_to_vec`].
  fn decode_bytes(&self, bytes: &[u8]) -> Result<Arc<dyn WireMessage>, WireError>;
}

pub struct ProstSchema<M> {
  _phantom: PhantomData<fn() -> M>,
}

impl<M> ProstSchema<M>
where
  M: ProstMessage + Serialize + DeserializeOwned + Default + 'static,
{
  pub fn new() -> Self {
    Self { _phantom: PhantomData }
  }

  pub fn shared() -> Arc<dyn WireSchema> {
    Arc::new(Self::new())
  }
}

impl<M> Default for ProstSchema<M>
where
  M: ProstMessage + Serialize + DeserializeOwned + Default + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}

impl<M> Debug for ProstSchema<M> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "ProstSchema<{}>", std::any::type_name::<M>())
  }
}

impl<M> WireSchema for ProstSchema<M>
where
  M: ProstMessage + Serialize + DeserializeOwned + Default + 'static,
{
  fn type_name(&self) -> &'static str {
    std::any::type_name::<M>()
  }

  fn encode(&self, mapping: &Map<String, Value>) -> Result<Arc<dyn WireMessage>, WireError> {
    let type_name = std::any::type_name::<M>();
    let pruned = prune_nulls(Value::Object(mapping.clone()));
    let message: M = serde_json::from_value(pruned.clone()).map_err(|e| WireError::Encode {
      type_name,
      message: e.to_string(),
    })?;
    let echoed = serde_json::to_value(&message).map_err(|e| WireError::Encode {
      type_name,
      message: e.to_string(),
    })?;
    check_known_fields(type_name, "", &pruned, &echoed)?;
    tracing::debug!("ProstSchema::encode: type_name = {}", type_name);
    Ok(Arc::new(message))
  }

  fn decode_bytes(&self, bytes: &[u8]) -> Result<Arc<dyn WireMessage>, WireError> {
    <M as ProstMessage>::decode(bytes)
      .map(|message| Arc::new(message) as Arc<dyn WireMessage>)
      .map_err(|e| WireError::Decode {
        type_name: std::any::type_name::<M>(),
        message: e.to_string(),
      })
  }
}

/// `null` means "unset" on the wire, so null entries are dropped from every
/// nested mapping before decoding into the message type.
fn prune_nulls(value: Value) -> Value {
  match value {
    Value::Object(map) => Value::Object(
      map
        .into_iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| (key, prune_nulls(value)))
        .collect(),
    ),
    Value::Array(items) => Value::Array(items.into_iter().map(prune_nulls).collect()),
    other => other,
  }
}

/// Serde silently ignores keys the message type does not declare; the wire
/// runtime rejects them instead. Every key of the submitted mapping must come
/// back when the decoded message is turned into a mapping again.
fn check_known_fields(type_name: &'static str, prefix: &str, submitted: &Value, echoed: &Value) -> Result<(), WireError> {
  match (submitted, echoed) {
    (Value::Object(submitted), Value::Object(echoed)) => {
      for (key, value) in submitted {
        let path = if prefix.is_empty() {
          key.clone()
        } else {
          format!("{}.{}", prefix, key)
        };
        match echoed.get(key) {
          Some(echoed_value) => check_known_fields(type_name, &path, value, echoed_value)?,
          None => return Err(WireError::UnknownField { type_name, field: path }),
        }
      }
      Ok(())
    }
    (Value::Array(submitted), Value::Array(echoed)) => {
      for (index, (value, echoed_value)) in submitted.iter().zip(echoed.iter()).enumerate() {
        check_known_fields(type_name, &format!("{}.{}", prefix, index), value, echoed_value)?;
      }
      Ok(())
    }
    _ => Ok(()),
  }
}
