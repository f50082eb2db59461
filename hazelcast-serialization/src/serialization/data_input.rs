//! Data input traits and implementations for Hazelcast serialization.

use super::data::Data;
use super::service::SerializationService;
use super::value::Value;
use crate::error::{HazelcastError, Result};
use bytes::{Buf, Bytes};
use std::io::Cursor;

/// Trait for reading primitive values from Hazelcast's binary format.
///
/// All multi-byte values are read in big-endian byte order.
pub trait DataInput {
    /// Reads a single byte (i8).
    fn read_byte(&mut self) -> Result<i8>;

    /// Reads a boolean from a single byte.
    fn read_bool(&mut self) -> Result<bool>;

    /// Reads a 16-bit signed integer in big-endian order.
    fn read_short(&mut self) -> Result<i16>;

    /// Reads a 32-bit signed integer in big-endian order.
    fn read_int(&mut self) -> Result<i32>;

    /// Reads a 64-bit signed integer in big-endian order.
    fn read_long(&mut self) -> Result<i64>;

    /// Reads a 32-bit floating point in big-endian order.
    fn read_float(&mut self) -> Result<f32>;

    /// Reads a 64-bit floating point in big-endian order.
    fn read_double(&mut self) -> Result<f64>;

    /// Reads the specified number of raw bytes.
    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>>;

    /// Reads a length-prefixed string.
    fn read_string(&mut self) -> Result<String>;

    /// Reads a byte array with its 4-byte length prefix.
    fn read_byte_array(&mut self) -> Result<Vec<u8>> {
        let len = self.read_int()?;
        if len < 0 {
            return Err(HazelcastError::Serialization(format!(
                "invalid byte array length: {}",
                len
            )));
        }
        self.read_bytes(len as usize)
    }
}

/// A buffer-based implementation of `DataInput`.
///
/// Inputs created by a [`SerializationService`] can decode nested objects and
/// envelopes, importing any class definition they carry.
#[derive(Debug)]
pub struct ObjectDataInput<'a> {
    cursor: Cursor<&'a [u8]>,
    service: Option<&'a SerializationService>,
}

impl<'a> ObjectDataInput<'a> {
    /// Creates a new `ObjectDataInput` from the given byte slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
            service: None,
        }
    }

    /// Creates an input bound to a serialization service.
    pub fn with_service(data: &'a [u8], service: &'a SerializationService) -> Self {
        Self {
            cursor: Cursor::new(data),
            service: Some(service),
        }
    }

    /// Returns the service this input is bound to, if any.
    pub fn service(&self) -> Option<&'a SerializationService> {
        self.service
    }

    /// Returns the number of bytes remaining to be read.
    pub fn remaining(&self) -> usize {
        self.cursor.remaining()
    }

    /// Returns the current position in the buffer.
    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    /// Reads a nested object written by
    /// [`ObjectDataOutput::write_object`](super::ObjectDataOutput::write_object).
    pub fn read_object(&mut self) -> Result<Value> {
        let service = self.require_service("read_object")?;
        service.read_value(self)
    }

    /// Reads an envelope written by
    /// [`ObjectDataOutput::write_data`](super::ObjectDataOutput::write_data).
    ///
    /// A class definition this service has not seen yet is imported before
    /// the envelope is returned.
    pub fn read_data(&mut self) -> Result<Option<Data>> {
        if !self.read_bool()? {
            return Ok(None);
        }
        let type_id = self.read_int()?;
        let class_definition = if self.read_bool()? {
            let class_id = self.read_int()?;
            let version = self.read_int()?;
            let binary = self.read_byte_array()?;
            let context = self.require_service("read_data")?.portable_context();
            let cd = match context.lookup_versioned(class_id, version) {
                Some(cd) => cd,
                None => context.create_class_definition(&binary)?,
            };
            if cd.class_id() != class_id || cd.version() != version {
                return Err(HazelcastError::SchemaFailure(format!(
                    "envelope header names class definition {}/{} but carries {}/{}",
                    class_id,
                    version,
                    cd.class_id(),
                    cd.version()
                )));
            }
            Some(cd)
        } else {
            None
        };
        let partition_hash = if self.read_bool()? {
            Some(self.read_int()?)
        } else {
            None
        };
        let buffer = Bytes::from(self.read_byte_array()?);

        let mut data = Data::new(type_id, buffer);
        if let Some(cd) = class_definition {
            data = data.with_class_definition(cd);
        }
        if let Some(hash) = partition_hash {
            data = data.with_partition_hash(hash);
        }
        Ok(Some(data))
    }

    /// Borrows the next `len` bytes without copying them.
    pub(crate) fn read_slice(&mut self, len: usize) -> Result<&'a [u8]> {
        self.ensure_remaining(len)?;
        let data: &'a [u8] = self.cursor.get_ref();
        let start = self.cursor.position() as usize;
        self.cursor.advance(len);
        Ok(&data[start..start + len])
    }

    fn require_service(&self, operation: &str) -> Result<&'a SerializationService> {
        self.service.ok_or_else(|| {
            HazelcastError::Serialization(format!(
                "{} requires an input bound to a serialization service",
                operation
            ))
        })
    }

    fn ensure_remaining(&self, n: usize) -> Result<()> {
        if self.cursor.remaining() < n {
            Err(HazelcastError::Serialization(format!(
                "insufficient data: need {} bytes, have {}",
                n,
                self.cursor.remaining()
            )))
        } else {
            Ok(())
        }
    }
}

impl DataInput for ObjectDataInput<'_> {
    fn read_byte(&mut self) -> Result<i8> {
        self.ensure_remaining(1)?;
        Ok(self.cursor.get_i8())
    }

    fn read_bool(&mut self) -> Result<bool> {
        self.ensure_remaining(1)?;
        Ok(self.cursor.get_u8() != 0)
    }

    fn read_short(&mut self) -> Result<i16> {
        self.ensure_remaining(2)?;
        Ok(self.cursor.get_i16())
    }

    fn read_int(&mut self) -> Result<i32> {
        self.ensure_remaining(4)?;
        Ok(self.cursor.get_i32())
    }

    fn read_long(&mut self) -> Result<i64> {
        self.ensure_remaining(8)?;
        Ok(self.cursor.get_i64())
    }

    fn read_float(&mut self) -> Result<f32> {
        self.ensure_remaining(4)?;
        Ok(self.cursor.get_f32())
    }

    fn read_double(&mut self) -> Result<f64> {
        self.ensure_remaining(8)?;
        Ok(self.cursor.get_f64())
    }

    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        self.ensure_remaining(len)?;
        let mut buf = Vec::new();
        buf.try_reserve_exact(len).map_err(|e| {
            HazelcastError::ResourceExhausted(format!("cannot allocate {} bytes: {}", len, e))
        })?;
        buf.resize(len, 0);
        self.cursor.copy_to_slice(&mut buf);
        Ok(buf)
    }

    fn read_string(&mut self) -> Result<String> {
        let len = self.read_int()?;
        if len < 0 {
            return Err(HazelcastError::Serialization(format!(
                "invalid string length: {}",
                len
            )));
        }
        let bytes = self.read_bytes(len as usize)?;
        String::from_utf8(bytes)
            .map_err(|e| HazelcastError::Serialization(format!("invalid UTF-8 string: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_input() {
        let data = [1, 2, 3, 4];
        let input = ObjectDataInput::new(&data);
        assert_eq!(input.remaining(), 4);
        assert_eq!(input.position(), 0);
        assert!(input.service().is_none());
    }

    #[test]
    fn test_read_bool_nonzero_is_true() {
        let data = [42u8];
        let mut input = ObjectDataInput::new(&data);
        assert!(input.read_bool().unwrap());
    }

    #[test]
    fn test_read_int_big_endian() {
        let data = [0x01, 0x02, 0x03, 0x04];
        let mut input = ObjectDataInput::new(&data);
        assert_eq!(input.read_int().unwrap(), 0x01020304);
    }

    #[test]
    fn test_read_long_big_endian() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        let mut input = ObjectDataInput::new(&data);
        assert_eq!(input.read_long().unwrap(), 0x0102030405060708);
    }

    #[test]
    fn test_read_double() {
        let data = [0x3F, 0xF0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        let mut input = ObjectDataInput::new(&data);
        assert_eq!(input.read_double().unwrap(), 1.0f64);
    }

    #[test]
    fn test_read_bytes() {
        let data = [1, 2, 3, 4, 5];
        let mut input = ObjectDataInput::new(&data);
        assert_eq!(input.read_bytes(3).unwrap(), vec![1, 2, 3]);
        assert_eq!(input.remaining(), 2);
    }

    #[test]
    fn test_read_string() {
        let data = [0, 0, 0, 4, b't', b'e', b's', b't'];
        let mut input = ObjectDataInput::new(&data);
        assert_eq!(input.read_string().unwrap(), "test");
    }

    #[test]
    fn test_read_byte_array() {
        let data = [0, 0, 0, 2, 7, 9, 1];
        let mut input = ObjectDataInput::new(&data);
        assert_eq!(input.read_byte_array().unwrap(), vec![7, 9]);
        assert_eq!(input.remaining(), 1);
    }

    #[test]
    fn test_negative_byte_array_length() {
        let data = [0xFF, 0xFF, 0xFF, 0xFE];
        let mut input = ObjectDataInput::new(&data);
        assert!(input.read_byte_array().is_err());
    }

    #[test]
    fn test_insufficient_data_int() {
        let data = [0x01, 0x02, 0x03];
        let mut input = ObjectDataInput::new(&data);
        assert!(input.read_int().is_err());
    }

    #[test]
    fn test_insufficient_data_bytes() {
        let data = [1, 2, 3];
        let mut input = ObjectDataInput::new(&data);
        assert!(input.read_bytes(5).is_err());
    }

    #[test]
    fn test_invalid_utf8_string() {
        let data = [0, 0, 0, 2, 0xFF, 0xFE];
        let mut input = ObjectDataInput::new(&data);
        assert!(input.read_string().is_err());
    }

    #[test]
    fn test_negative_string_length() {
        let data = [0xFF, 0xFF, 0xFF, 0xFF];
        let mut input = ObjectDataInput::new(&data);
        assert!(input.read_string().is_err());
    }

    #[test]
    fn test_read_object_requires_service() {
        let data = [0, 0, 0, 0];
        let mut input = ObjectDataInput::new(&data);
        assert!(matches!(
            input.read_object(),
            Err(HazelcastError::Serialization(_))
        ));
    }

    #[test]
    fn test_read_null_data() {
        let data = [0];
        let mut input = ObjectDataInput::new(&data);
        assert!(input.read_data().unwrap().is_none());
    }

    #[test]
    fn test_read_data_without_schema() {
        let data = [
            1, // present
            0xFF, 0xFF, 0xFF, 0xF9, // type id -7
            0, // no class definition
            0, // no partition hash
            0, 0, 0, 4, 0, 0, 0, 42, // payload
        ];
        let mut input = ObjectDataInput::new(&data);
        let envelope = input.read_data().unwrap().unwrap();
        assert_eq!(envelope.type_id(), -7);
        assert_eq!(envelope.buffer(), &[0, 0, 0, 42]);
        assert!(envelope.class_definition().is_none());
        assert_eq!(input.remaining(), 0);
    }

    #[test]
    fn test_position_advances() {
        let data = [0, 0, 0, 42, 1, 2, 3, 4];
        let mut input = ObjectDataInput::new(&data);
        input.read_int().unwrap();
        assert_eq!(input.position(), 4);
        input.read_int().unwrap();
        assert_eq!(input.position(), 8);
    }
}
