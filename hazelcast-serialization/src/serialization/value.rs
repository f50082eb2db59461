//! The closed set of values the serialization service encodes.

use super::data::Data;
use super::identified::IdentifiedDataSerializable;
use super::portable::Portable;
use super::type_key::TypeKey;
use crate::partition_aware::PartitionAware;
use chrono::{DateTime, Utc};
use num_bigint::BigInt;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A user-defined runtime type handled by registered serializers.
///
/// The [`TypeKey`] it reports is what the serializer registry resolves,
/// exactly or through the declared type hierarchy.
pub trait TypedObject: Any + Send + Sync + fmt::Debug {
    /// Returns the runtime type of this object.
    fn type_key(&self) -> TypeKey;

    /// Returns the partition key view of this object, if it has one.
    fn partition_aware(&self) -> Option<&dyn PartitionAware> {
        None
    }
}

/// A value accepted by [`SerializationService`](super::SerializationService).
#[derive(Debug, Clone)]
pub enum Value {
    /// Absence of a value. Encodes to no envelope.
    Null,
    /// UTF-8 text.
    String(String),
    /// 32-bit signed integer.
    Integer(i32),
    /// 64-bit signed integer.
    Long(i64),
    /// Boolean.
    Boolean(bool),
    /// Raw bytes.
    ByteArray(Vec<u8>),
    /// Instant with millisecond precision.
    Date(DateTime<Utc>),
    /// Arbitrary precision integer.
    BigInteger(BigInt),
    /// A Portable object.
    Portable(Arc<dyn Portable>),
    /// An object that writes its own fields and is created by factory id.
    DataSerializable(Arc<dyn IdentifiedDataSerializable>),
    /// Any other user type.
    Object(Arc<dyn TypedObject>),
    /// An already encoded envelope.
    Data(Data),
}

impl Value {
    /// Wraps a user object.
    pub fn object<T: TypedObject>(object: T) -> Self {
        Value::Object(Arc::new(object))
    }

    /// Wraps a Portable object.
    pub fn portable<P: Portable>(portable: P) -> Self {
        Value::Portable(Arc::new(portable))
    }

    /// Wraps an identified data serializable object.
    pub fn data_serializable<D: IdentifiedDataSerializable>(object: D) -> Self {
        Value::DataSerializable(Arc::new(object))
    }

    /// Returns true for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the runtime type used to resolve a serializer.
    ///
    /// `Null` and already encoded envelopes have none.
    pub fn type_key(&self) -> Option<TypeKey> {
        match self {
            Value::Null | Value::Data(_) => None,
            Value::String(_) => Some(TypeKey::STRING),
            Value::Integer(_) => Some(TypeKey::INTEGER),
            Value::Long(_) => Some(TypeKey::LONG),
            Value::Boolean(_) => Some(TypeKey::BOOLEAN),
            Value::ByteArray(_) => Some(TypeKey::BYTE_ARRAY),
            Value::Date(_) => Some(TypeKey::DATE),
            Value::BigInteger(_) => Some(TypeKey::BIG_INTEGER),
            Value::Portable(_) => Some(TypeKey::PORTABLE),
            Value::DataSerializable(_) => Some(TypeKey::DATA_SERIALIZABLE),
            Value::Object(object) => Some(object.type_key()),
        }
    }

    /// Returns the partition key view of the wrapped object, if any.
    pub fn partition_aware(&self) -> Option<&dyn PartitionAware> {
        match self {
            Value::Portable(p) => p.partition_aware(),
            Value::DataSerializable(d) => d.partition_aware(),
            Value::Object(o) => o.partition_aware(),
            _ => None,
        }
    }

    /// Returns the text of a `String` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer of an `Integer` value.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the integer of a `Long` value.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the flag of a `Boolean` value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Borrows the wrapped user object as `T`.
    pub fn downcast_object<T: TypedObject>(&self) -> Option<&T> {
        match self {
            Value::Object(object) => {
                let any: &dyn Any = object.as_ref();
                any.downcast_ref::<T>()
            }
            _ => None,
        }
    }

    /// Borrows the wrapped Portable as `P`.
    pub fn downcast_portable<P: Portable>(&self) -> Option<&P> {
        match self {
            Value::Portable(portable) => {
                let any: &dyn Any = portable.as_ref();
                any.downcast_ref::<P>()
            }
            _ => None,
        }
    }

    /// Borrows the wrapped identified data serializable object as `D`.
    pub fn downcast_data_serializable<D: IdentifiedDataSerializable>(&self) -> Option<&D> {
        match self {
            Value::DataSerializable(object) => {
                let any: &dyn Any = object.as_ref();
                any.downcast_ref::<D>()
            }
            _ => None,
        }
    }
}

impl PartialEq for Value {
    /// Built-in variants compare by content. Wrapped user objects compare by
    /// identity, since their types carry no equality of their own.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::ByteArray(a), Value::ByteArray(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::BigInteger(a), Value::BigInteger(b)) => a == b,
            (Value::Portable(a), Value::Portable(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            (Value::DataSerializable(a), Value::DataSerializable(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            (Value::Object(a), Value::Object(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            (Value::Data(a), Value::Data(b)) => a == b,
            _ => false,
        }
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::ByteArray(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Date(v)
    }
}

impl From<BigInt> for Value {
    fn from(v: BigInt) -> Self {
        Value::BigInteger(v)
    }
}

impl From<Data> for Value {
    fn from(v: Data) -> Self {
        Value::Data(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Widget {
        id: u32,
    }

    impl TypedObject for Widget {
        fn type_key(&self) -> TypeKey {
            TypeKey::from_static("acme.Widget")
        }
    }

    #[test]
    fn test_builtin_type_keys() {
        assert_eq!(Value::from(1).type_key(), Some(TypeKey::INTEGER));
        assert_eq!(Value::from(1i64).type_key(), Some(TypeKey::LONG));
        assert_eq!(Value::from("x").type_key(), Some(TypeKey::STRING));
        assert_eq!(Value::Null.type_key(), None);
        assert_eq!(Value::Data(Data::new(-7, vec![])).type_key(), None);
    }

    #[test]
    fn test_object_type_key_and_downcast() {
        let value = Value::object(Widget { id: 7 });
        assert_eq!(value.type_key(), Some(TypeKey::from_static("acme.Widget")));
        assert_eq!(value.downcast_object::<Widget>().unwrap().id, 7);
        assert!(Value::from(1).downcast_object::<Widget>().is_none());
    }

    #[test]
    fn test_object_equality_is_identity() {
        let a = Value::object(Widget { id: 1 });
        let b = a.clone();
        let c = Value::object(Widget { id: 1 });
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_content_equality() {
        assert_eq!(Value::from(vec![1u8, 2]), Value::ByteArray(vec![1, 2]));
        assert_ne!(Value::from(1), Value::from(1i64));
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some(true)), Value::Boolean(true));
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::from("abc").as_str(), Some("abc"));
        assert_eq!(Value::from(5).as_i32(), Some(5));
        assert_eq!(Value::from(5).as_i64(), None);
        assert_eq!(Value::from(false).as_bool(), Some(false));
        assert!(Value::Null.is_null());
        assert!(Value::from(1).partition_aware().is_none());
    }
}
