//! Codecs for the built-in value kinds.

use super::serializer::TypeSerializer;
use super::traits::{Deserializable, Serializable};
use super::type_key::TypeKey;
use super::value::Value;
use super::{ObjectDataInput, ObjectDataOutput};
use crate::error::{HazelcastError, Result};
use chrono::{DateTime, Utc};
use num_bigint::BigInt;
use std::sync::Arc;

/// Type id of [`Value::Boolean`].
pub const BOOLEAN_TYPE_ID: i32 = -4;
/// Type id of [`Value::Integer`].
pub const INTEGER_TYPE_ID: i32 = -7;
/// Type id of [`Value::Long`].
pub const LONG_TYPE_ID: i32 = -8;
/// Type id of [`Value::String`].
pub const STRING_TYPE_ID: i32 = -11;
/// Type id of [`Value::ByteArray`].
pub const BYTE_ARRAY_TYPE_ID: i32 = -12;
/// Type id of [`Value::Date`].
pub const DATE_TYPE_ID: i32 = -21;
/// Type id of [`Value::BigInteger`].
pub const BIG_INTEGER_TYPE_ID: i32 = -22;

fn mismatch(codec: &str, value: &Value) -> HazelcastError {
    HazelcastError::Serialization(format!("{} cannot encode {:?}", codec, value))
}

macro_rules! builtin_serializer {
    ($(#[$doc:meta])* $name:ident, $type_id:expr, $variant:ident, $ty:ty) => {
        $(#[$doc])*
        #[derive(Debug, Default, Clone, Copy)]
        pub struct $name;

        impl TypeSerializer for $name {
            fn type_id(&self) -> i32 {
                $type_id
            }

            fn write(&self, output: &mut ObjectDataOutput<'_>, value: &Value) -> Result<()> {
                match value {
                    Value::$variant(v) => v.serialize(output),
                    other => Err(mismatch(stringify!($name), other)),
                }
            }

            fn read(&self, input: &mut ObjectDataInput<'_>) -> Result<Value> {
                <$ty>::deserialize(input).map(Value::$variant)
            }
        }
    };
}

builtin_serializer!(
    /// UTF-8 text with a 4-byte length prefix.
    StringSerializer,
    STRING_TYPE_ID,
    String,
    String
);
builtin_serializer!(
    /// Big-endian 32-bit integer.
    IntegerSerializer,
    INTEGER_TYPE_ID,
    Integer,
    i32
);
builtin_serializer!(
    /// Big-endian 64-bit integer.
    LongSerializer,
    LONG_TYPE_ID,
    Long,
    i64
);
builtin_serializer!(
    /// One byte, 0 or 1.
    BooleanSerializer,
    BOOLEAN_TYPE_ID,
    Boolean,
    bool
);
builtin_serializer!(
    /// Raw bytes with a 4-byte length prefix.
    ByteArraySerializer,
    BYTE_ARRAY_TYPE_ID,
    ByteArray,
    Vec<u8>
);
builtin_serializer!(
    /// Milliseconds since the Unix epoch as a 64-bit integer.
    DateSerializer,
    DATE_TYPE_ID,
    Date,
    DateTime<Utc>
);
builtin_serializer!(
    /// Two's-complement big-endian bytes with a 4-byte length prefix.
    BigIntegerSerializer,
    BIG_INTEGER_TYPE_ID,
    BigInteger,
    BigInt
);

/// Bindings installed into every new registry.
pub(crate) fn builtin_serializers() -> Vec<(TypeKey, Arc<dyn TypeSerializer>)> {
    let bindings: [(TypeKey, Arc<dyn TypeSerializer>); 7] = [
        (TypeKey::STRING, Arc::new(StringSerializer)),
        (TypeKey::INTEGER, Arc::new(IntegerSerializer)),
        (TypeKey::LONG, Arc::new(LongSerializer)),
        (TypeKey::BOOLEAN, Arc::new(BooleanSerializer)),
        (TypeKey::BYTE_ARRAY, Arc::new(ByteArraySerializer)),
        (TypeKey::DATE, Arc::new(DateSerializer)),
        (TypeKey::BIG_INTEGER, Arc::new(BigIntegerSerializer)),
    ];
    bindings.into()
}
