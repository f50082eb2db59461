//! Data output traits and implementations for Hazelcast serialization.

use super::buffer_pool::PooledBuffer;
use super::data::Data;
use super::service::SerializationService;
use super::value::Value;
use crate::error::{HazelcastError, Result};
use bytes::{BufMut, Bytes, BytesMut};

/// Trait for writing primitive values in Hazelcast's binary format.
///
/// All multi-byte values are written in big-endian byte order.
pub trait DataOutput {
    /// Writes a single byte (i8).
    fn write_byte(&mut self, v: i8) -> Result<()>;

    /// Writes a boolean as a single byte (0 for false, 1 for true).
    fn write_bool(&mut self, v: bool) -> Result<()>;

    /// Writes a 16-bit signed integer in big-endian order.
    fn write_short(&mut self, v: i16) -> Result<()>;

    /// Writes a 32-bit signed integer in big-endian order.
    fn write_int(&mut self, v: i32) -> Result<()>;

    /// Writes a 64-bit signed integer in big-endian order.
    fn write_long(&mut self, v: i64) -> Result<()>;

    /// Writes a 32-bit floating point in big-endian order.
    fn write_float(&mut self, v: f32) -> Result<()>;

    /// Writes a 64-bit floating point in big-endian order.
    fn write_double(&mut self, v: f64) -> Result<()>;

    /// Writes raw bytes without length prefix.
    fn write_bytes(&mut self, v: &[u8]) -> Result<()>;

    /// Writes a string with its length prefix.
    fn write_string(&mut self, v: &str) -> Result<()>;

    /// Writes a byte array with its 4-byte length prefix.
    fn write_byte_array(&mut self, v: &[u8]) -> Result<()> {
        let len = i32::try_from(v.len()).map_err(|_| {
            HazelcastError::Serialization(format!("byte array too long: {} bytes", v.len()))
        })?;
        self.write_int(len)?;
        self.write_bytes(v)
    }
}

/// A buffer-based implementation of `DataOutput`.
///
/// Outputs created by a [`SerializationService`] write into a pooled buffer
/// and can encode nested objects through [`write_object`](Self::write_object).
/// Standalone outputs own a private buffer.
#[derive(Debug)]
pub struct ObjectDataOutput<'a> {
    buffer: PooledBuffer<'a>,
    service: Option<&'a SerializationService>,
}

impl ObjectDataOutput<'static> {
    /// Creates a new `ObjectDataOutput` with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Creates a new `ObjectDataOutput` with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: PooledBuffer::detached(BytesMut::with_capacity(capacity)),
            service: None,
        }
    }
}

impl<'a> ObjectDataOutput<'a> {
    pub(crate) fn bound(buffer: PooledBuffer<'a>, service: &'a SerializationService) -> Self {
        Self {
            buffer,
            service: Some(service),
        }
    }

    pub(crate) fn pooled(buffer: PooledBuffer<'a>) -> Self {
        Self {
            buffer,
            service: None,
        }
    }

    /// Overwrites four already written bytes at `position` with `v`.
    pub fn write_int_at(&mut self, position: usize, v: i32) -> Result<()> {
        let end = position.checked_add(4).filter(|&end| end <= self.buffer.len());
        match end {
            Some(end) => {
                self.buffer[position..end].copy_from_slice(&v.to_be_bytes());
                Ok(())
            }
            None => Err(HazelcastError::Serialization(format!(
                "cannot patch int at {} in a buffer of {} bytes",
                position,
                self.buffer.len()
            ))),
        }
    }

    /// Returns the service this output is bound to, if any.
    pub fn service(&self) -> Option<&'a SerializationService> {
        self.service
    }

    /// Returns the written bytes as a slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Copies the written bytes into an immutable buffer.
    ///
    /// The underlying buffer stays with the output so it can be reused.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(&self.buffer)
    }

    /// Consumes the output and returns the written bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer.to_vec()
    }

    /// Returns the number of bytes written.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if no bytes have been written.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clears the buffer, removing all written data.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Writes a nested object: its type id followed by its encoded form.
    ///
    /// Requires an output created by a [`SerializationService`].
    pub fn write_object(&mut self, value: &Value) -> Result<()> {
        let service = self.service.ok_or_else(|| {
            HazelcastError::Serialization(
                "write_object requires an output bound to a serialization service".to_string(),
            )
        })?;
        service.write_value(self, value)
    }

    /// Writes an envelope, including its compressed class definition.
    ///
    /// `None` is written as a null marker and read back as `None`.
    pub fn write_data(&mut self, data: Option<&Data>) -> Result<()> {
        let Some(data) = data else {
            self.write_bool(false)?;
            return Ok(());
        };
        self.write_bool(true)?;
        self.write_int(data.type_id())?;
        match data.class_definition() {
            Some(cd) => {
                let binary = match cd.binary() {
                    Some(binary) => binary.clone(),
                    None => {
                        let service = self.service.ok_or_else(|| {
                            HazelcastError::SchemaFailure(format!(
                                "class definition {}/{} has no compressed form and no service \
                                 is available to compute it",
                                cd.class_id(),
                                cd.version()
                            ))
                        })?;
                        service.portable_context().binary_of(cd)?
                    }
                };
                self.write_bool(true)?;
                self.write_int(cd.class_id())?;
                self.write_int(cd.version())?;
                self.write_byte_array(&binary)?;
            }
            None => self.write_bool(false)?,
        }
        match data.explicit_partition_hash() {
            Some(hash) => {
                self.write_bool(true)?;
                self.write_int(hash)?;
            }
            None => self.write_bool(false)?,
        }
        self.write_byte_array(data.buffer())
    }

    fn ensure_writable(&self, additional: usize) -> Result<()> {
        match self.buffer.len().checked_add(additional) {
            Some(total) if total <= isize::MAX as usize => Ok(()),
            _ => Err(HazelcastError::ResourceExhausted(format!(
                "cannot grow output buffer of {} bytes by {} bytes",
                self.buffer.len(),
                additional
            ))),
        }
    }
}

impl Default for ObjectDataOutput<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl DataOutput for ObjectDataOutput<'_> {
    fn write_byte(&mut self, v: i8) -> Result<()> {
        self.buffer.put_i8(v);
        Ok(())
    }

    fn write_bool(&mut self, v: bool) -> Result<()> {
        self.buffer.put_u8(if v { 1 } else { 0 });
        Ok(())
    }

    fn write_short(&mut self, v: i16) -> Result<()> {
        self.buffer.put_i16(v);
        Ok(())
    }

    fn write_int(&mut self, v: i32) -> Result<()> {
        self.buffer.put_i32(v);
        Ok(())
    }

    fn write_long(&mut self, v: i64) -> Result<()> {
        self.buffer.put_i64(v);
        Ok(())
    }

    fn write_float(&mut self, v: f32) -> Result<()> {
        self.buffer.put_f32(v);
        Ok(())
    }

    fn write_double(&mut self, v: f64) -> Result<()> {
        self.buffer.put_f64(v);
        Ok(())
    }

    fn write_bytes(&mut self, v: &[u8]) -> Result<()> {
        self.ensure_writable(v.len())?;
        self.buffer.put_slice(v);
        Ok(())
    }

    fn write_string(&mut self, v: &str) -> Result<()> {
        let bytes = v.as_bytes();
        let len = i32::try_from(bytes.len()).map_err(|_| {
            HazelcastError::Serialization(format!("string too long: {} bytes", bytes.len()))
        })?;
        self.write_int(len)?;
        self.write_bytes(bytes)
    }
}
