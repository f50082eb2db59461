//! Generic object codec backed by serde.
//!
//! Types registered with [`SerializationService::register_serde`] are written
//! as their type name followed by their JSON form. The type name selects the
//! decoder on the way back.
//!
//! [`SerializationService::register_serde`]: super::SerializationService::register_serde

use super::serializer::TypeSerializer;
use super::type_key::TypeKey;
use super::value::{TypedObject, Value};
use super::{DataInput, DataOutput, ObjectDataInput, ObjectDataOutput};
use crate::error::{HazelcastError, Result};
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Type ID of the generic serde codec.
pub const SERIALIZABLE_TYPE_ID: i32 = -101;

type EncodeFn = dyn Fn(&Arc<dyn TypedObject>) -> Result<Vec<u8>> + Send + Sync;
type DecodeFn = dyn Fn(&[u8]) -> Result<Arc<dyn TypedObject>> + Send + Sync;

struct SerdeAdapter {
    type_name: &'static str,
    encode: Box<EncodeFn>,
    decode: Box<DecodeFn>,
}

impl SerdeAdapter {
    fn new<T>() -> Self
    where
        T: TypedObject + Serialize + DeserializeOwned,
    {
        let type_name = std::any::type_name::<T>();
        Self {
            type_name,
            encode: Box::new(move |object: &Arc<dyn TypedObject>| {
                let any: &dyn Any = object.as_ref();
                let typed = any.downcast_ref::<T>().ok_or_else(|| {
                    HazelcastError::Serialization(format!(
                        "{} is registered for serde encoding, got {:?}",
                        type_name, object
                    ))
                })?;
                serde_json::to_vec(typed).map_err(|e| {
                    HazelcastError::Serialization(format!("serde encode failed: {}", e))
                })
            }),
            decode: Box::new(move |bytes: &[u8]| {
                let typed: T = serde_json::from_slice(bytes).map_err(|e| {
                    HazelcastError::Serialization(format!(
                        "serde decode of {} failed: {}",
                        type_name, e
                    ))
                })?;
                Ok(Arc::new(typed) as Arc<dyn TypedObject>)
            }),
        }
    }
}

impl fmt::Debug for SerdeAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerdeAdapter")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Fallback-style codec for user types that implement serde traits.
#[derive(Debug, Default)]
pub struct GenericSerializer {
    adapters: DashMap<TypeKey, Arc<SerdeAdapter>>,
}

impl GenericSerializer {
    /// Creates a codec with no registered types.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `T` encodable under `key`. A later registration of the same key
    /// replaces the earlier one.
    pub fn register<T>(&self, key: TypeKey)
    where
        T: TypedObject + Serialize + DeserializeOwned,
    {
        self.adapters.insert(key, Arc::new(SerdeAdapter::new::<T>()));
    }

    /// Returns true if a type is registered under `key`.
    pub fn contains(&self, key: &TypeKey) -> bool {
        self.adapters.contains_key(key)
    }

    fn adapter(&self, key: &TypeKey) -> Result<Arc<SerdeAdapter>> {
        self.adapters
            .get(key)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| {
                HazelcastError::NotSerializable(format!(
                    "no serde registration for type {}",
                    key
                ))
            })
    }
}

impl TypeSerializer for GenericSerializer {
    fn type_id(&self) -> i32 {
        SERIALIZABLE_TYPE_ID
    }

    fn write(&self, output: &mut ObjectDataOutput<'_>, value: &Value) -> Result<()> {
        let Value::Object(object) = value else {
            return Err(HazelcastError::Serialization(format!(
                "GenericSerializer cannot encode {:?}",
                value
            )));
        };
        let key = object.type_key();
        let adapter = self.adapter(&key)?;
        let json = (adapter.encode)(object)?;
        output.write_string(key.name())?;
        output.write_byte_array(&json)
    }

    fn read(&self, input: &mut ObjectDataInput<'_>) -> Result<Value> {
        let key = TypeKey::from(input.read_string()?);
        let adapter = self.adapter(&key).map_err(|_| {
            HazelcastError::Serialization(format!("no serde registration for type {}", key))
        })?;
        let json = input.read_byte_array()?;
        (adapter.decode)(&json).map(Value::Object)
    }

    fn destroy(&self) {
        self.adapters.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Session {
        user: String,
        ttl: u32,
    }

    impl TypedObject for Session {
        fn type_key(&self) -> TypeKey {
            TypeKey::from_static("app.Session")
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Other;

    impl TypedObject for Other {
        fn type_key(&self) -> TypeKey {
            TypeKey::from_static("app.Session")
        }
    }

    fn codec() -> GenericSerializer {
        let codec = GenericSerializer::new();
        codec.register::<Session>(TypeKey::from_static("app.Session"));
        codec
    }

    #[test]
    fn test_round_trip() {
        let codec = codec();
        let value = Value::object(Session {
            user: "ada".to_string(),
            ttl: 30,
        });
        let mut output = ObjectDataOutput::new();
        codec.write(&mut output, &value).unwrap();
        let bytes = output.into_bytes();

        let mut input = ObjectDataInput::new(&bytes);
        let decoded = codec.read(&mut input).unwrap();
        let session = decoded.downcast_object::<Session>().unwrap();
        assert_eq!(session.user, "ada");
        assert_eq!(session.ttl, 30);
    }

    #[test]
    fn test_wire_form_starts_with_type_name() {
        let codec = codec();
        let value = Value::object(Session {
            user: String::new(),
            ttl: 0,
        });
        let mut output = ObjectDataOutput::new();
        codec.write(&mut output, &value).unwrap();
        let bytes = output.into_bytes();
        assert_eq!(&bytes[..4], &11i32.to_be_bytes());
        assert_eq!(&bytes[4..15], b"app.Session");
    }

    #[test]
    fn test_unregistered_type_is_not_serializable() {
        let codec = GenericSerializer::new();
        let value = Value::object(Session {
            user: String::new(),
            ttl: 0,
        });
        let mut output = ObjectDataOutput::new();
        assert!(matches!(
            codec.write(&mut output, &value),
            Err(HazelcastError::NotSerializable(_))
        ));
    }

    #[test]
    fn test_key_bound_to_other_type_is_rejected() {
        let codec = codec();
        let mut output = ObjectDataOutput::new();
        assert!(matches!(
            codec.write(&mut output, &Value::object(Other)),
            Err(HazelcastError::Serialization(_))
        ));
    }

    #[test]
    fn test_destroy_forgets_registrations() {
        let codec = codec();
        assert!(codec.contains(&TypeKey::from_static("app.Session")));
        codec.destroy();
        assert!(!codec.contains(&TypeKey::from_static("app.Session")));
    }
}
