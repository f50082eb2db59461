//! Primitive encoders shared by the built-in codecs.
//!
//! Every built-in value kind has a fixed wire form: booleans take one byte,
//! integers are big-endian, text and byte arrays carry a 4-byte length prefix,
//! dates are epoch milliseconds and big integers are two's-complement
//! big-endian bytes.

use super::{DataInput, DataOutput};
use crate::error::{HazelcastError, Result};
use chrono::{DateTime, TimeZone, Utc};
use num_bigint::BigInt;

/// Trait for types that can be serialized to Hazelcast's binary format.
pub trait Serializable {
    /// Serializes this value to the given output.
    fn serialize<W: DataOutput>(&self, output: &mut W) -> Result<()>;

    /// Convenience method: serializes this value to a byte vector.
    fn to_bytes(&self) -> Result<Vec<u8>>
    where
        Self: Sized,
    {
        let mut output = super::ObjectDataOutput::new();
        self.serialize(&mut output)?;
        Ok(output.into_bytes())
    }
}

/// Trait for types that can be deserialized from Hazelcast's binary format.
pub trait Deserializable: Sized {
    /// Deserializes a value from the given input.
    fn deserialize<R: DataInput>(input: &mut R) -> Result<Self>;

    /// Convenience method: deserializes a value from a byte slice.
    fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut input = super::ObjectDataInput::new(data);
        Self::deserialize(&mut input)
    }
}

impl Serializable for i8 {
    fn serialize<W: DataOutput>(&self, output: &mut W) -> Result<()> {
        output.write_byte(*self)
    }
}

impl Deserializable for i8 {
    fn deserialize<R: DataInput>(input: &mut R) -> Result<Self> {
        input.read_byte()
    }
}

impl Serializable for i16 {
    fn serialize<W: DataOutput>(&self, output: &mut W) -> Result<()> {
        output.write_short(*self)
    }
}

impl Deserializable for i16 {
    fn deserialize<R: DataInput>(input: &mut R) -> Result<Self> {
        input.read_short()
    }
}

impl Serializable for i32 {
    fn serialize<W: DataOutput>(&self, output: &mut W) -> Result<()> {
        output.write_int(*self)
    }
}

impl Deserializable for i32 {
    fn deserialize<R: DataInput>(input: &mut R) -> Result<Self> {
        input.read_int()
    }
}

impl Serializable for i64 {
    fn serialize<W: DataOutput>(&self, output: &mut W) -> Result<()> {
        output.write_long(*self)
    }
}

impl Deserializable for i64 {
    fn deserialize<R: DataInput>(input: &mut R) -> Result<Self> {
        input.read_long()
    }
}

impl Serializable for bool {
    fn serialize<W: DataOutput>(&self, output: &mut W) -> Result<()> {
        output.write_bool(*self)
    }
}

impl Deserializable for bool {
    fn deserialize<R: DataInput>(input: &mut R) -> Result<Self> {
        input.read_bool()
    }
}

impl Serializable for String {
    fn serialize<W: DataOutput>(&self, output: &mut W) -> Result<()> {
        output.write_string(self)
    }
}

impl Deserializable for String {
    fn deserialize<R: DataInput>(input: &mut R) -> Result<Self> {
        input.read_string()
    }
}

impl Serializable for str {
    fn serialize<W: DataOutput>(&self, output: &mut W) -> Result<()> {
        output.write_string(self)
    }
}

impl Serializable for Vec<u8> {
    fn serialize<W: DataOutput>(&self, output: &mut W) -> Result<()> {
        output.write_byte_array(self)
    }
}

impl Deserializable for Vec<u8> {
    fn deserialize<R: DataInput>(input: &mut R) -> Result<Self> {
        input.read_byte_array()
    }
}

impl Serializable for [u8] {
    fn serialize<W: DataOutput>(&self, output: &mut W) -> Result<()> {
        output.write_byte_array(self)
    }
}

// ============================================================================
// Dates and big integers
// ============================================================================

impl Serializable for DateTime<Utc> {
    fn serialize<W: DataOutput>(&self, output: &mut W) -> Result<()> {
        output.write_long(self.timestamp_millis())
    }
}

impl Deserializable for DateTime<Utc> {
    fn deserialize<R: DataInput>(input: &mut R) -> Result<Self> {
        let millis = input.read_long()?;
        Utc.timestamp_millis_opt(millis).single().ok_or_else(|| {
            HazelcastError::Serialization(format!("timestamp out of range: {} ms", millis))
        })
    }
}

impl Serializable for BigInt {
    fn serialize<W: DataOutput>(&self, output: &mut W) -> Result<()> {
        output.write_byte_array(&self.to_signed_bytes_be())
    }
}

impl Deserializable for BigInt {
    fn deserialize<R: DataInput>(input: &mut R) -> Result<Self> {
        let bytes = input.read_byte_array()?;
        if bytes.is_empty() {
            return Err(HazelcastError::Serialization(
                "big integer encoding must contain at least one byte".to_string(),
            ));
        }
        Ok(BigInt::from_signed_bytes_be(&bytes))
    }
}

// ============================================================================
// Option<T> support for nullable fields
// ============================================================================

impl<T: Serializable> Serializable for Option<T> {
    fn serialize<W: DataOutput>(&self, output: &mut W) -> Result<()> {
        match self {
            Some(value) => {
                output.write_bool(true)?;
                value.serialize(output)
            }
            None => output.write_bool(false),
        }
    }
}

impl<T: Deserializable> Deserializable for Option<T> {
    fn deserialize<R: DataInput>(input: &mut R) -> Result<Self> {
        let is_present = input.read_bool()?;
        if is_present {
            T::deserialize(input).map(Some)
        } else {
            Ok(None)
        }
    }
}

// ============================================================================
// Collection serialization helpers
// ============================================================================

/// Serializes a list of items with a length prefix.
///
/// Format: `i32` length followed by each element serialized in order.
pub fn serialize_list<T: Serializable, W: DataOutput>(items: &[T], output: &mut W) -> Result<()> {
    let len = i32::try_from(items.len()).map_err(|_| {
        HazelcastError::Serialization(format!("list too long: {} items", items.len()))
    })?;
    output.write_int(len)?;
    for item in items {
        item.serialize(output)?;
    }
    Ok(())
}

/// Deserializes a list of items with a length prefix.
pub fn deserialize_list<T: Deserializable, R: DataInput>(input: &mut R) -> Result<Vec<T>> {
    let len = input.read_int()?;
    if len < 0 {
        return Err(HazelcastError::Serialization(format!(
            "invalid list length: {}",
            len
        )));
    }
    // The length is untrusted; grow as elements actually decode.
    let mut items = Vec::new();
    for _ in 0..len {
        items.push(T::deserialize(input)?);
    }
    Ok(items)
}
