//! Portable serialization: versioned, self-describing objects.
//!
//! A Portable object is encoded against a [`ClassDefinition`] that names each
//! field, its kind and its position. Class definitions travel with the data
//! in compressed form so that a receiver that has never seen a schema can
//! import it before decoding.

mod class_definition;
mod context;
mod reader_writer;
mod serializer;

use crate::error::{HazelcastError, Result};
use crate::partition_aware::PartitionAware;
use std::any::Any;
use std::fmt;

pub use class_definition::{ClassDefinition, ClassDefinitionBuilder, FieldDefinition};
pub use context::PortableContext;
pub use reader_writer::{ClassDefinitionWriter, DefaultPortableReader, DefaultPortableWriter};
pub use serializer::{PortableSerializer, PORTABLE_TYPE_ID};

/// Supported field types in Portable serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum FieldType {
    /// Signed 8-bit integer.
    Byte = 1,
    /// Boolean value.
    Bool = 2,
    /// 16-bit Unicode character.
    Char = 3,
    /// Signed 16-bit integer.
    Short = 4,
    /// Signed 32-bit integer.
    Int = 5,
    /// Signed 64-bit integer.
    Long = 6,
    /// 32-bit floating point.
    Float = 7,
    /// 64-bit floating point.
    Double = 8,
    /// UTF-8 string.
    Utf8 = 9,
    /// Nested Portable object.
    Portable = 10,
    /// Array of bytes.
    ByteArray = 11,
    /// Array of booleans.
    BoolArray = 12,
    /// Array of chars.
    CharArray = 13,
    /// Array of shorts.
    ShortArray = 14,
    /// Array of ints.
    IntArray = 15,
    /// Array of longs.
    LongArray = 16,
    /// Array of floats.
    FloatArray = 17,
    /// Array of doubles.
    DoubleArray = 18,
    /// Array of strings.
    Utf8Array = 19,
    /// Array of Portable objects.
    PortableArray = 20,
}

impl FieldType {
    /// Creates a FieldType from its wire representation.
    pub fn from_id(id: i32) -> Result<Self> {
        match id {
            1 => Ok(Self::Byte),
            2 => Ok(Self::Bool),
            3 => Ok(Self::Char),
            4 => Ok(Self::Short),
            5 => Ok(Self::Int),
            6 => Ok(Self::Long),
            7 => Ok(Self::Float),
            8 => Ok(Self::Double),
            9 => Ok(Self::Utf8),
            10 => Ok(Self::Portable),
            11 => Ok(Self::ByteArray),
            12 => Ok(Self::BoolArray),
            13 => Ok(Self::CharArray),
            14 => Ok(Self::ShortArray),
            15 => Ok(Self::IntArray),
            16 => Ok(Self::LongArray),
            17 => Ok(Self::FloatArray),
            18 => Ok(Self::DoubleArray),
            19 => Ok(Self::Utf8Array),
            20 => Ok(Self::PortableArray),
            _ => Err(HazelcastError::SchemaFailure(format!(
                "unknown field type id: {}",
                id
            ))),
        }
    }

    /// Returns the wire representation of this field type.
    pub fn id(&self) -> i32 {
        *self as i32
    }

    /// Returns true if this is an array type.
    pub fn is_array(&self) -> bool {
        matches!(
            self,
            Self::ByteArray
                | Self::BoolArray
                | Self::CharArray
                | Self::ShortArray
                | Self::IntArray
                | Self::LongArray
                | Self::FloatArray
                | Self::DoubleArray
                | Self::Utf8Array
                | Self::PortableArray
        )
    }

    /// Returns true if fields of this type reference a nested class definition.
    pub fn is_portable(&self) -> bool {
        matches!(self, Self::Portable | Self::PortableArray)
    }
}

/// Creates empty Portable instances for decoding, keyed by class id.
///
/// Any `Fn(i32) -> Option<Box<dyn Portable>>` closure is a factory.
pub trait PortableFactory: Send + Sync {
    /// Creates a new instance for the given class ID.
    fn create(&self, class_id: i32) -> Option<Box<dyn Portable>>;
}

impl<F> PortableFactory for F
where
    F: Fn(i32) -> Option<Box<dyn Portable>> + Send + Sync,
{
    fn create(&self, class_id: i32) -> Option<Box<dyn Portable>> {
        self(class_id)
    }
}

/// Trait for reading Portable fields during deserialization.
///
/// Fields may be read in any order. Reading a field the writer's class
/// definition does not declare, or with the wrong kind, is an error.
pub trait PortableReader {
    /// Returns the schema version being read.
    fn version(&self) -> i32;

    /// Returns true if a field with the given name exists.
    fn has_field(&self, name: &str) -> bool;

    /// Returns the declared type of a field.
    fn field_type(&self, name: &str) -> Option<FieldType>;

    /// Reads a byte field.
    fn read_byte(&mut self, name: &str) -> Result<i8>;

    /// Reads a boolean field.
    fn read_bool(&mut self, name: &str) -> Result<bool>;

    /// Reads a char field.
    fn read_char(&mut self, name: &str) -> Result<char>;

    /// Reads a short field.
    fn read_short(&mut self, name: &str) -> Result<i16>;

    /// Reads an int field.
    fn read_int(&mut self, name: &str) -> Result<i32>;

    /// Reads a long field.
    fn read_long(&mut self, name: &str) -> Result<i64>;

    /// Reads a float field.
    fn read_float(&mut self, name: &str) -> Result<f32>;

    /// Reads a double field.
    fn read_double(&mut self, name: &str) -> Result<f64>;

    /// Reads a string field.
    fn read_string(&mut self, name: &str) -> Result<Option<String>>;

    /// Reads a nested Portable field.
    fn read_portable(&mut self, name: &str) -> Result<Option<Box<dyn Portable>>>;

    /// Reads a byte array field.
    fn read_byte_array(&mut self, name: &str) -> Result<Option<Vec<i8>>>;

    /// Reads a boolean array field.
    fn read_bool_array(&mut self, name: &str) -> Result<Option<Vec<bool>>>;

    /// Reads a char array field.
    fn read_char_array(&mut self, name: &str) -> Result<Option<Vec<char>>>;

    /// Reads a short array field.
    fn read_short_array(&mut self, name: &str) -> Result<Option<Vec<i16>>>;

    /// Reads an int array field.
    fn read_int_array(&mut self, name: &str) -> Result<Option<Vec<i32>>>;

    /// Reads a long array field.
    fn read_long_array(&mut self, name: &str) -> Result<Option<Vec<i64>>>;

    /// Reads a float array field.
    fn read_float_array(&mut self, name: &str) -> Result<Option<Vec<f32>>>;

    /// Reads a double array field.
    fn read_double_array(&mut self, name: &str) -> Result<Option<Vec<f64>>>;

    /// Reads a string array field.
    fn read_string_array(&mut self, name: &str) -> Result<Option<Vec<String>>>;

    /// Reads a Portable array field.
    fn read_portable_array(&mut self, name: &str) -> Result<Option<Vec<Box<dyn Portable>>>>;
}

/// Typed access to nested Portable fields.
pub trait PortableReaderExt: PortableReader {
    /// Reads a nested Portable field as a concrete type.
    fn read_portable_as<P: Portable>(&mut self, name: &str) -> Result<Option<P>> {
        self.read_portable(name)?.map(downcast_portable).transpose()
    }

    /// Reads a Portable array field as a vector of a concrete type.
    fn read_portable_array_as<P: Portable>(&mut self, name: &str) -> Result<Option<Vec<P>>> {
        match self.read_portable_array(name)? {
            Some(items) => items
                .into_iter()
                .map(downcast_portable)
                .collect::<Result<Vec<P>>>()
                .map(Some),
            None => Ok(None),
        }
    }
}

impl<R: PortableReader + ?Sized> PortableReaderExt for R {}

/// Trait for writing Portable fields during serialization.
///
/// Every field of the class definition must be written exactly once.
pub trait PortableWriter {
    /// Writes a byte field.
    fn write_byte(&mut self, name: &str, value: i8) -> Result<()>;

    /// Writes a boolean field.
    fn write_bool(&mut self, name: &str, value: bool) -> Result<()>;

    /// Writes a char field. Only characters of the Basic Multilingual Plane
    /// fit the 16-bit wire form.
    fn write_char(&mut self, name: &str, value: char) -> Result<()>;

    /// Writes a short field.
    fn write_short(&mut self, name: &str, value: i16) -> Result<()>;

    /// Writes an int field.
    fn write_int(&mut self, name: &str, value: i32) -> Result<()>;

    /// Writes a long field.
    fn write_long(&mut self, name: &str, value: i64) -> Result<()>;

    /// Writes a float field.
    fn write_float(&mut self, name: &str, value: f32) -> Result<()>;

    /// Writes a double field.
    fn write_double(&mut self, name: &str, value: f64) -> Result<()>;

    /// Writes a string field.
    fn write_string(&mut self, name: &str, value: Option<&str>) -> Result<()>;

    /// Writes a nested Portable field.
    ///
    /// A `None` can only be written once the field's class definition is
    /// known; otherwise use [`write_null_portable`](Self::write_null_portable).
    fn write_portable(&mut self, name: &str, value: Option<&dyn Portable>) -> Result<()>;

    /// Writes an absent nested Portable field of the given class.
    fn write_null_portable(&mut self, name: &str, class_id: i32) -> Result<()>;

    /// Writes a byte array field.
    fn write_byte_array(&mut self, name: &str, value: Option<&[i8]>) -> Result<()>;

    /// Writes a boolean array field.
    fn write_bool_array(&mut self, name: &str, value: Option<&[bool]>) -> Result<()>;

    /// Writes a char array field.
    fn write_char_array(&mut self, name: &str, value: Option<&[char]>) -> Result<()>;

    /// Writes a short array field.
    fn write_short_array(&mut self, name: &str, value: Option<&[i16]>) -> Result<()>;

    /// Writes an int array field.
    fn write_int_array(&mut self, name: &str, value: Option<&[i32]>) -> Result<()>;

    /// Writes a long array field.
    fn write_long_array(&mut self, name: &str, value: Option<&[i64]>) -> Result<()>;

    /// Writes a float array field.
    fn write_float_array(&mut self, name: &str, value: Option<&[f32]>) -> Result<()>;

    /// Writes a double array field.
    fn write_double_array(&mut self, name: &str, value: Option<&[f64]>) -> Result<()>;

    /// Writes a string array field.
    fn write_string_array(&mut self, name: &str, value: Option<&[String]>) -> Result<()>;

    /// Writes a Portable array field whose elements are all of `class_id`.
    fn write_portable_array(
        &mut self,
        name: &str,
        class_id: i32,
        value: Option<&[&dyn Portable]>,
    ) -> Result<()>;
}

/// Trait for types that can be serialized using Portable serialization.
pub trait Portable: Any + Send + Sync + fmt::Debug {
    /// Returns the class ID for this type.
    fn class_id(&self) -> i32;

    /// Returns the schema version this object writes.
    ///
    /// `None` uses the version configured on the serialization service.
    fn version(&self) -> Option<i32> {
        None
    }

    /// Writes this object's fields to the given writer.
    fn write_portable(&self, writer: &mut dyn PortableWriter) -> Result<()>;

    /// Reads this object's fields from the given reader.
    fn read_portable(&mut self, reader: &mut dyn PortableReader) -> Result<()>;

    /// Returns the partition key view of this object, if it has one.
    fn partition_aware(&self) -> Option<&dyn PartitionAware> {
        None
    }
}

/// Converts a decoded Portable into its concrete type.
pub fn downcast_portable<P: Portable>(portable: Box<dyn Portable>) -> Result<P> {
    let class_id = portable.class_id();
    let any: Box<dyn Any> = portable;
    any.downcast::<P>().map(|p| *p).map_err(|_| {
        HazelcastError::Serialization(format!(
            "portable of class {} is not a {}",
            class_id,
            std::any::type_name::<P>()
        ))
    })
}
