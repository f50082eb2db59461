//! Default implementations of PortableReader and PortableWriter.
//!
//! A Portable frame is the class id, the version and a length-prefixed body.
//! The body opens with one `i32` offset per field, in field index order,
//! followed by the field data. A field that was never written keeps the
//! offset `-1` and reads back as its default.

use super::{
    ClassDefinition, ClassDefinitionBuilder, FieldType, Portable, PortableContext, PortableReader,
    PortableWriter,
};
use crate::error::{HazelcastError, Result};
use crate::serialization::{DataInput, DataOutput, ObjectDataInput, ObjectDataOutput};
use std::sync::Arc;

const UNWRITTEN: i32 = -1;

/// Limit on Portable objects nested inside each other while decoding.
const MAX_PORTABLE_DEPTH: usize = 128;

/// Encodes `portable` as a frame and returns the class definition used.
pub(crate) fn write_portable_frame<W: DataOutput + ?Sized>(
    context: &PortableContext,
    output: &mut W,
    portable: &dyn Portable,
) -> Result<Arc<ClassDefinition>> {
    let class_def = context.class_definition_for(portable)?;
    let mut writer = DefaultPortableWriter::new(context, Arc::clone(&class_def))?;
    portable.write_portable(&mut writer)?;
    output.write_int(class_def.class_id())?;
    output.write_int(class_def.version())?;
    output.write_byte_array(writer.as_bytes())?;
    Ok(class_def)
}

/// Decodes a frame written by [`write_portable_frame`].
pub(crate) fn read_portable_frame(
    context: &PortableContext,
    input: &mut ObjectDataInput<'_>,
    depth: usize,
) -> Result<Box<dyn Portable>> {
    if depth > MAX_PORTABLE_DEPTH {
        return Err(HazelcastError::Serialization(format!(
            "portable objects nested deeper than {} levels",
            MAX_PORTABLE_DEPTH
        )));
    }
    let class_id = input.read_int()?;
    let version = input.read_int()?;
    let len = input.read_int()?;
    if len < 0 {
        return Err(HazelcastError::Serialization(format!(
            "invalid portable body length: {}",
            len
        )));
    }
    let body = input.read_slice(len as usize)?;

    let class_def = context
        .lookup_versioned(class_id, version)
        .ok_or_else(|| {
            HazelcastError::SchemaFailure(format!(
                "no class definition for class {} version {}",
                class_id, version
            ))
        })?;
    let mut instance = context.create_portable(class_id)?;
    let mut reader = DefaultPortableReader::new(context, class_def, body, depth)?;
    instance.read_portable(&mut reader)?;
    Ok(instance)
}

fn len_as_i32(len: usize) -> Result<i32> {
    i32::try_from(len)
        .map_err(|_| HazelcastError::Serialization(format!("array too long: {} items", len)))
}

/// Default implementation of `PortableWriter`.
///
/// Writes into a buffer borrowed from the context's pool.
#[derive(Debug)]
pub struct DefaultPortableWriter<'a> {
    context: &'a PortableContext,
    class_def: Arc<ClassDefinition>,
    body: ObjectDataOutput<'a>,
    written: Vec<bool>,
}

impl<'a> DefaultPortableWriter<'a> {
    /// Creates a new writer for the given class definition.
    pub fn new(context: &'a PortableContext, class_def: Arc<ClassDefinition>) -> Result<Self> {
        let mut body = ObjectDataOutput::pooled(context.pool().acquire());
        for _ in 0..class_def.field_count() {
            body.write_int(UNWRITTEN)?;
        }
        let written = vec![false; class_def.field_count()];
        Ok(Self {
            context,
            class_def,
            body,
            written,
        })
    }

    /// Returns the class definition.
    pub fn class_definition(&self) -> &ClassDefinition {
        &self.class_def
    }

    /// Returns the encoded body: offset table followed by field data.
    pub fn as_bytes(&self) -> &[u8] {
        self.body.as_bytes()
    }

    /// Validates `name` against the class definition and records where its
    /// data starts. Returns the nested class id of the field.
    fn begin_field(&mut self, name: &str, expected: FieldType) -> Result<i32> {
        let (index, nested_class_id) = {
            let field = self.class_def.field(name).ok_or_else(|| {
                HazelcastError::Serialization(format!(
                    "unknown field '{}' for class {}",
                    name,
                    self.class_def.class_id()
                ))
            })?;
            if field.field_type() != expected {
                return Err(HazelcastError::Serialization(format!(
                    "field '{}' type mismatch: expected {:?}, got {:?}",
                    name,
                    field.field_type(),
                    expected
                )));
            }
            (field.index() as usize, field.class_id())
        };
        if self.written[index] {
            return Err(HazelcastError::Serialization(format!(
                "field '{}' written twice",
                name
            )));
        }
        self.written[index] = true;
        let offset = i32::try_from(self.body.len()).map_err(|_| {
            HazelcastError::Serialization("portable body exceeds 2 GiB".to_string())
        })?;
        self.body.write_int_at(index * 4, offset)?;
        Ok(nested_class_id)
    }

    fn write_array<T>(
        &mut self,
        name: &str,
        field_type: FieldType,
        value: Option<&[T]>,
        mut write_item: impl FnMut(&mut ObjectDataOutput<'a>, &T) -> Result<()>,
    ) -> Result<()> {
        self.begin_field(name, field_type)?;
        match value {
            Some(items) => {
                self.body.write_bool(true)?;
                self.body.write_int(len_as_i32(items.len())?)?;
                for item in items {
                    write_item(&mut self.body, item)?;
                }
                Ok(())
            }
            None => self.body.write_bool(false),
        }
    }

    fn check_nested(&self, name: &str, expected: i32, actual: i32) -> Result<()> {
        if expected != actual {
            return Err(HazelcastError::Serialization(format!(
                "field '{}' holds class {}, got class {}",
                name, expected, actual
            )));
        }
        Ok(())
    }
}

fn write_char<W: DataOutput + ?Sized>(output: &mut W, value: char) -> Result<()> {
    let code = u16::try_from(u32::from(value)).map_err(|_| {
        HazelcastError::Serialization(format!("char {:?} does not fit in 16 bits", value))
    })?;
    output.write_short(code as i16)
}

impl PortableWriter for DefaultPortableWriter<'_> {
    fn write_byte(&mut self, name: &str, value: i8) -> Result<()> {
        self.begin_field(name, FieldType::Byte)?;
        self.body.write_byte(value)
    }

    fn write_bool(&mut self, name: &str, value: bool) -> Result<()> {
        self.begin_field(name, FieldType::Bool)?;
        self.body.write_bool(value)
    }

    fn write_char(&mut self, name: &str, value: char) -> Result<()> {
        self.begin_field(name, FieldType::Char)?;
        write_char(&mut self.body, value)
    }

    fn write_short(&mut self, name: &str, value: i16) -> Result<()> {
        self.begin_field(name, FieldType::Short)?;
        self.body.write_short(value)
    }

    fn write_int(&mut self, name: &str, value: i32) -> Result<()> {
        self.begin_field(name, FieldType::Int)?;
        self.body.write_int(value)
    }

    fn write_long(&mut self, name: &str, value: i64) -> Result<()> {
        self.begin_field(name, FieldType::Long)?;
        self.body.write_long(value)
    }

    fn write_float(&mut self, name: &str, value: f32) -> Result<()> {
        self.begin_field(name, FieldType::Float)?;
        self.body.write_float(value)
    }

    fn write_double(&mut self, name: &str, value: f64) -> Result<()> {
        self.begin_field(name, FieldType::Double)?;
        self.body.write_double(value)
    }

    fn write_string(&mut self, name: &str, value: Option<&str>) -> Result<()> {
        self.begin_field(name, FieldType::Utf8)?;
        match value {
            Some(s) => {
                self.body.write_bool(true)?;
                self.body.write_string(s)
            }
            None => self.body.write_bool(false),
        }
    }

    fn write_portable(&mut self, name: &str, value: Option<&dyn Portable>) -> Result<()> {
        let class_id = self.begin_field(name, FieldType::Portable)?;
        match value {
            Some(portable) => {
                self.check_nested(name, class_id, portable.class_id())?;
                self.body.write_bool(true)?;
                write_portable_frame(self.context, &mut self.body, portable)?;
                Ok(())
            }
            None => self.body.write_bool(false),
        }
    }

    fn write_null_portable(&mut self, name: &str, class_id: i32) -> Result<()> {
        let declared = self.begin_field(name, FieldType::Portable)?;
        self.check_nested(name, declared, class_id)?;
        self.body.write_bool(false)
    }

    fn write_byte_array(&mut self, name: &str, value: Option<&[i8]>) -> Result<()> {
        self.write_array(name, FieldType::ByteArray, value, |out, &v| out.write_byte(v))
    }

    fn write_bool_array(&mut self, name: &str, value: Option<&[bool]>) -> Result<()> {
        self.write_array(name, FieldType::BoolArray, value, |out, &v| out.write_bool(v))
    }

    fn write_char_array(&mut self, name: &str, value: Option<&[char]>) -> Result<()> {
        self.write_array(name, FieldType::CharArray, value, |out, &v| write_char(out, v))
    }

    fn write_short_array(&mut self, name: &str, value: Option<&[i16]>) -> Result<()> {
        self.write_array(name, FieldType::ShortArray, value, |out, &v| out.write_short(v))
    }

    fn write_int_array(&mut self, name: &str, value: Option<&[i32]>) -> Result<()> {
        self.write_array(name, FieldType::IntArray, value, |out, &v| out.write_int(v))
    }

    fn write_long_array(&mut self, name: &str, value: Option<&[i64]>) -> Result<()> {
        self.write_array(name, FieldType::LongArray, value, |out, &v| out.write_long(v))
    }

    fn write_float_array(&mut self, name: &str, value: Option<&[f32]>) -> Result<()> {
        self.write_array(name, FieldType::FloatArray, value, |out, &v| out.write_float(v))
    }

    fn write_double_array(&mut self, name: &str, value: Option<&[f64]>) -> Result<()> {
        self.write_array(name, FieldType::DoubleArray, value, |out, &v| {
            out.write_double(v)
        })
    }

    fn write_string_array(&mut self, name: &str, value: Option<&[String]>) -> Result<()> {
        self.write_array(name, FieldType::Utf8Array, value, |out, v| out.write_string(v))
    }

    fn write_portable_array(
        &mut self,
        name: &str,
        class_id: i32,
        value: Option<&[&dyn Portable]>,
    ) -> Result<()> {
        let declared = self.begin_field(name, FieldType::PortableArray)?;
        self.check_nested(name, declared, class_id)?;
        match value {
            Some(items) => {
                for item in items {
                    self.check_nested(name, declared, item.class_id())?;
                }
                self.body.write_bool(true)?;
                self.body.write_int(len_as_i32(items.len())?)?;
                for item in items {
                    write_portable_frame(self.context, &mut self.body, *item)?;
                }
                Ok(())
            }
            None => self.body.write_bool(false),
        }
    }
}

/// Default implementation of `PortableReader`.
///
/// Fields are located through the offset table, so they can be read in any
/// order. Fields missing from the writer's class definition, or never written,
/// read back as zero, `false` or `None`.
#[derive(Debug)]
pub struct DefaultPortableReader<'a> {
    context: &'a PortableContext,
    class_def: Arc<ClassDefinition>,
    body: &'a [u8],
    depth: usize,
}

impl<'a> DefaultPortableReader<'a> {
    /// Creates a reader over a frame body encoded with `class_def`.
    pub fn new(
        context: &'a PortableContext,
        class_def: Arc<ClassDefinition>,
        body: &'a [u8],
        depth: usize,
    ) -> Result<Self> {
        let table = class_def.field_count() * 4;
        if body.len() < table {
            return Err(HazelcastError::Serialization(format!(
                "portable body of {} bytes cannot hold {} field offsets",
                body.len(),
                class_def.field_count()
            )));
        }
        Ok(Self {
            context,
            class_def,
            body,
            depth,
        })
    }

    /// Returns the class definition the data was written with.
    pub fn class_definition(&self) -> &ClassDefinition {
        &self.class_def
    }

    /// Positions an input at the data of `name`, or returns `None` if the
    /// field is absent or was not written.
    fn seek(&self, name: &str, expected: FieldType) -> Result<Option<ObjectDataInput<'a>>> {
        let Some(field) = self.class_def.field(name) else {
            return Ok(None);
        };
        if field.field_type() != expected {
            return Err(HazelcastError::Serialization(format!(
                "field '{}' type mismatch: expected {:?}, got {:?}",
                name,
                expected,
                field.field_type()
            )));
        }
        let slot = field.index() as usize * 4;
        let mut table = ObjectDataInput::new(&self.body[slot..slot + 4]);
        let offset = table.read_int()?;
        if offset == UNWRITTEN {
            return Ok(None);
        }
        let header = self.class_def.field_count() * 4;
        match usize::try_from(offset) {
            Ok(offset) if offset >= header && offset <= self.body.len() => {
                Ok(Some(ObjectDataInput::new(&self.body[offset..])))
            }
            _ => Err(HazelcastError::Serialization(format!(
                "field '{}' has invalid offset {}",
                name, offset
            ))),
        }
    }

    /// Seeks to a nullable field and consumes its presence marker.
    fn seek_present(&self, name: &str, expected: FieldType) -> Result<Option<ObjectDataInput<'a>>> {
        match self.seek(name, expected)? {
            Some(mut input) => Ok(if input.read_bool()? { Some(input) } else { None }),
            None => Ok(None),
        }
    }

    fn read_array<T>(
        &self,
        name: &str,
        field_type: FieldType,
        mut read_item: impl FnMut(&mut ObjectDataInput<'a>) -> Result<T>,
    ) -> Result<Option<Vec<T>>> {
        let Some(mut input) = self.seek_present(name, field_type)? else {
            return Ok(None);
        };
        let len = input.read_int()?;
        if len < 0 {
            return Err(HazelcastError::Serialization(format!(
                "invalid array length {} for field '{}'",
                len, name
            )));
        }
        // Never trust the length for preallocation.
        let mut items = Vec::with_capacity((len as usize).min(input.remaining()));
        for _ in 0..len {
            items.push(read_item(&mut input)?);
        }
        Ok(Some(items))
    }

    fn read_nested(&self, input: &mut ObjectDataInput<'a>, name: &str) -> Result<Box<dyn Portable>> {
        let portable = read_portable_frame(self.context, input, self.depth + 1)?;
        let declared = self.class_def.field(name).map(|f| f.class_id());
        if declared != Some(portable.class_id()) {
            return Err(HazelcastError::Serialization(format!(
                "field '{}' holds class {:?}, decoded class {}",
                name,
                declared,
                portable.class_id()
            )));
        }
        Ok(portable)
    }
}

fn read_char<R: DataInput + ?Sized>(input: &mut R) -> Result<char> {
    let code = input.read_short()? as u16;
    char::from_u32(u32::from(code))
        .ok_or_else(|| HazelcastError::Serialization(format!("invalid char code: {}", code)))
}

impl PortableReader for DefaultPortableReader<'_> {
    fn version(&self) -> i32 {
        self.class_def.version()
    }

    fn has_field(&self, name: &str) -> bool {
        self.class_def.has_field(name)
    }

    fn field_type(&self, name: &str) -> Option<FieldType> {
        self.class_def.field(name).map(|f| f.field_type())
    }

    fn read_byte(&mut self, name: &str) -> Result<i8> {
        match self.seek(name, FieldType::Byte)? {
            Some(mut input) => input.read_byte(),
            None => Ok(0),
        }
    }

    fn read_bool(&mut self, name: &str) -> Result<bool> {
        match self.seek(name, FieldType::Bool)? {
            Some(mut input) => input.read_bool(),
            None => Ok(false),
        }
    }

    fn read_char(&mut self, name: &str) -> Result<char> {
        match self.seek(name, FieldType::Char)? {
            Some(mut input) => read_char(&mut input),
            None => Ok('\0'),
        }
    }

    fn read_short(&mut self, name: &str) -> Result<i16> {
        match self.seek(name, FieldType::Short)? {
            Some(mut input) => input.read_short(),
            None => Ok(0),
        }
    }

    fn read_int(&mut self, name: &str) -> Result<i32> {
        match self.seek(name, FieldType::Int)? {
            Some(mut input) => input.read_int(),
            None => Ok(0),
        }
    }

    fn read_long(&mut self, name: &str) -> Result<i64> {
        match self.seek(name, FieldType::Long)? {
            Some(mut input) => input.read_long(),
            None => Ok(0),
        }
    }

    fn read_float(&mut self, name: &str) -> Result<f32> {
        match self.seek(name, FieldType::Float)? {
            Some(mut input) => input.read_float(),
            None => Ok(0.0),
        }
    }

    fn read_double(&mut self, name: &str) -> Result<f64> {
        match self.seek(name, FieldType::Double)? {
            Some(mut input) => input.read_double(),
            None => Ok(0.0),
        }
    }

    fn read_string(&mut self, name: &str) -> Result<Option<String>> {
        self.seek_present(name, FieldType::Utf8)?
            .map(|mut input| input.read_string())
            .transpose()
    }

    fn read_portable(&mut self, name: &str) -> Result<Option<Box<dyn Portable>>> {
        match self.seek_present(name, FieldType::Portable)? {
            Some(mut input) => self.read_nested(&mut input, name).map(Some),
            None => Ok(None),
        }
    }

    fn read_byte_array(&mut self, name: &str) -> Result<Option<Vec<i8>>> {
        self.read_array(name, FieldType::ByteArray, |input| input.read_byte())
    }

    fn read_bool_array(&mut self, name: &str) -> Result<Option<Vec<bool>>> {
        self.read_array(name, FieldType::BoolArray, |input| input.read_bool())
    }

    fn read_char_array(&mut self, name: &str) -> Result<Option<Vec<char>>> {
        self.read_array(name, FieldType::CharArray, |input| read_char(input))
    }

    fn read_short_array(&mut self, name: &str) -> Result<Option<Vec<i16>>> {
        self.read_array(name, FieldType::ShortArray, |input| input.read_short())
    }

    fn read_int_array(&mut self, name: &str) -> Result<Option<Vec<i32>>> {
        self.read_array(name, FieldType::IntArray, |input| input.read_int())
    }

    fn read_long_array(&mut self, name: &str) -> Result<Option<Vec<i64>>> {
        self.read_array(name, FieldType::LongArray, |input| input.read_long())
    }

    fn read_float_array(&mut self, name: &str) -> Result<Option<Vec<f32>>> {
        self.read_array(name, FieldType::FloatArray, |input| input.read_float())
    }

    fn read_double_array(&mut self, name: &str) -> Result<Option<Vec<f64>>> {
        self.read_array(name, FieldType::DoubleArray, |input| input.read_double())
    }

    fn read_string_array(&mut self, name: &str) -> Result<Option<Vec<String>>> {
        self.read_array(name, FieldType::Utf8Array, |input| input.read_string())
    }

    fn read_portable_array(&mut self, name: &str) -> Result<Option<Vec<Box<dyn Portable>>>> {
        self.read_array(name, FieldType::PortableArray, |input| {
            self.read_nested(input, name)
        })
    }
}

/// A `PortableWriter` that records field names and kinds instead of data,
/// producing the class definition of the object being written.
#[derive(Debug)]
pub struct ClassDefinitionWriter<'a> {
    context: &'a PortableContext,
    builder: ClassDefinitionBuilder,
}

impl<'a> ClassDefinitionWriter<'a> {
    /// Starts recording the layout of `class_id` at `version`.
    pub fn new(context: &'a PortableContext, class_id: i32, version: i32) -> Self {
        Self {
            context,
            builder: ClassDefinitionBuilder::new(class_id, version),
        }
    }

    /// Returns the recorded class definition.
    pub fn build(self) -> Result<ClassDefinition> {
        self.builder.build()
    }

    fn add(&mut self, name: &str, field_type: FieldType) -> Result<()> {
        self.builder.add_field(name, field_type).map(|_| ())
    }

    fn known(&self, name: &str, class_id: i32) -> Result<Arc<ClassDefinition>> {
        self.context.lookup(class_id).ok_or_else(|| {
            HazelcastError::SchemaFailure(format!(
                "cannot describe field '{}' without a value or a registered class definition \
                 for class {}",
                name, class_id
            ))
        })
    }
}

impl PortableWriter for ClassDefinitionWriter<'_> {
    fn write_byte(&mut self, name: &str, _value: i8) -> Result<()> {
        self.add(name, FieldType::Byte)
    }

    fn write_bool(&mut self, name: &str, _value: bool) -> Result<()> {
        self.add(name, FieldType::Bool)
    }

    fn write_char(&mut self, name: &str, _value: char) -> Result<()> {
        self.add(name, FieldType::Char)
    }

    fn write_short(&mut self, name: &str, _value: i16) -> Result<()> {
        self.add(name, FieldType::Short)
    }

    fn write_int(&mut self, name: &str, _value: i32) -> Result<()> {
        self.add(name, FieldType::Int)
    }

    fn write_long(&mut self, name: &str, _value: i64) -> Result<()> {
        self.add(name, FieldType::Long)
    }

    fn write_float(&mut self, name: &str, _value: f32) -> Result<()> {
        self.add(name, FieldType::Float)
    }

    fn write_double(&mut self, name: &str, _value: f64) -> Result<()> {
        self.add(name, FieldType::Double)
    }

    fn write_string(&mut self, name: &str, _value: Option<&str>) -> Result<()> {
        self.add(name, FieldType::Utf8)
    }

    fn write_portable(&mut self, name: &str, value: Option<&dyn Portable>) -> Result<()> {
        let portable = value.ok_or_else(|| {
            HazelcastError::SchemaFailure(format!(
                "cannot describe null portable field '{}'; use write_null_portable",
                name
            ))
        })?;
        let nested = self.context.class_definition_for(portable)?;
        self.builder.add_portable_field(name, nested).map(|_| ())
    }

    fn write_null_portable(&mut self, name: &str, class_id: i32) -> Result<()> {
        let nested = self.known(name, class_id)?;
        self.builder.add_portable_field(name, nested).map(|_| ())
    }

    fn write_byte_array(&mut self, name: &str, _value: Option<&[i8]>) -> Result<()> {
        self.add(name, FieldType::ByteArray)
    }

    fn write_bool_array(&mut self, name: &str, _value: Option<&[bool]>) -> Result<()> {
        self.add(name, FieldType::BoolArray)
    }

    fn write_char_array(&mut self, name: &str, _value: Option<&[char]>) -> Result<()> {
        self.add(name, FieldType::CharArray)
    }

    fn write_short_array(&mut self, name: &str, _value: Option<&[i16]>) -> Result<()> {
        self.add(name, FieldType::ShortArray)
    }

    fn write_int_array(&mut self, name: &str, _value: Option<&[i32]>) -> Result<()> {
        self.add(name, FieldType::IntArray)
    }

    fn write_long_array(&mut self, name: &str, _value: Option<&[i64]>) -> Result<()> {
        self.add(name, FieldType::LongArray)
    }

    fn write_float_array(&mut self, name: &str, _value: Option<&[f32]>) -> Result<()> {
        self.add(name, FieldType::FloatArray)
    }

    fn write_double_array(&mut self, name: &str, _value: Option<&[f64]>) -> Result<()> {
        self.add(name, FieldType::DoubleArray)
    }

    fn write_string_array(&mut self, name: &str, _value: Option<&[String]>) -> Result<()> {
        self.add(name, FieldType::Utf8Array)
    }

    fn write_portable_array(
        &mut self,
        name: &str,
        class_id: i32,
        value: Option<&[&dyn Portable]>,
    ) -> Result<()> {
        let nested = match value.and_then(|items| items.first()) {
            Some(first) => self.context.class_definition_for(*first)?,
            None => self.known(name, class_id)?,
        };
        if nested.class_id() != class_id {
            return Err(HazelcastError::SchemaFailure(format!(
                "field '{}' declared for class {} holds class {}",
                name,
                class_id,
                nested.class_id()
            )));
        }
        self.builder.add_portable_array_field(name, nested).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::buffer_pool::BufferPool;
    use crate::serialization::portable::{PortableFactory, PortableReaderExt};

    const PERSON: i32 = 1;
    const ADDRESS: i32 = 2;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Address {
        street: String,
        zip: i32,
    }

    impl Portable for Address {
        fn class_id(&self) -> i32 {
            ADDRESS
        }

        fn write_portable(&self, writer: &mut dyn PortableWriter) -> Result<()> {
            writer.write_string("street", Some(&self.street))?;
            writer.write_int("zip", self.zip)
        }

        fn read_portable(&mut self, reader: &mut dyn PortableReader) -> Result<()> {
            self.street = reader.read_string("street")?.unwrap_or_default();
            self.zip = reader.read_int("zip")?;
            Ok(())
        }
    }

    #[derive(Debug, Default, PartialEq)]
    struct Person {
        name: Option<String>,
        age: i32,
        initial: char,
        scores: Vec<f64>,
        home: Option<Address>,
        previous: Vec<Address>,
    }

    impl Portable for Person {
        fn class_id(&self) -> i32 {
            PERSON
        }

        fn write_portable(&self, writer: &mut dyn PortableWriter) -> Result<()> {
            writer.write_string("name", self.name.as_deref())?;
            writer.write_int("age", self.age)?;
            writer.write_char("initial", self.initial)?;
            writer.write_double_array("scores", Some(&self.scores))?;
            match &self.home {
                Some(home) => writer.write_portable("home", Some(home))?,
                None => writer.write_null_portable("home", ADDRESS)?,
            }
            let previous: Vec<&dyn Portable> =
                self.previous.iter().map(|a| a as &dyn Portable).collect();
            writer.write_portable_array("previous", ADDRESS, Some(&previous))
        }

        fn read_portable(&mut self, reader: &mut dyn PortableReader) -> Result<()> {
            self.name = reader.read_string("name")?;
            self.age = reader.read_int("age")?;
            self.initial = reader.read_char("initial")?;
            self.scores = reader.read_double_array("scores")?.unwrap_or_default();
            self.home = reader.read_portable_as::<Address>("home")?;
            self.previous = reader
                .read_portable_array_as::<Address>("previous")?
                .unwrap_or_default();
            Ok(())
        }
    }

    struct TestFactory;

    impl PortableFactory for TestFactory {
        fn create(&self, class_id: i32) -> Option<Box<dyn Portable>> {
            match class_id {
                PERSON => Some(Box::new(Person::default())),
                ADDRESS => Some(Box::new(Address::default())),
                _ => None,
            }
        }
    }

    fn context() -> PortableContext {
        PortableContext::new(
            0,
            Some(Arc::new(TestFactory)),
            Arc::new(BufferPool::with_settings(256, 1 << 20, 2)),
        )
    }

    fn sample() -> Person {
        Person {
            name: Some("Ada".to_string()),
            age: 36,
            initial: 'A',
            scores: vec![1.5, 2.5],
            home: Some(Address {
                street: "Main".to_string(),
                zip: 12345,
            }),
            previous: vec![
                Address {
                    street: "Elm".to_string(),
                    zip: 1,
                },
                Address {
                    street: "Oak".to_string(),
                    zip: 2,
                },
            ],
        }
    }

    fn round_trip(ctx: &PortableContext, person: &Person) -> Person {
        let mut output = ObjectDataOutput::new();
        write_portable_frame(ctx, &mut output, person).unwrap();
        let mut input = ObjectDataInput::new(output.as_bytes());
        let decoded = read_portable_frame(ctx, &mut input, 0).unwrap();
        assert_eq!(input.remaining(), 0);
        crate::serialization::portable::downcast_portable::<Person>(decoded).unwrap()
    }

    #[test]
    fn test_nested_round_trip() {
        let ctx = context();
        let person = sample();
        assert_eq!(round_trip(&ctx, &person), person);
    }

    #[test]
    fn test_null_nested_round_trip() {
        let ctx = context();
        ctx.class_definition_for(&Address::default()).unwrap();
        let person = Person {
            name: None,
            home: None,
            ..sample()
        };
        assert_eq!(round_trip(&ctx, &person), person);
    }

    #[test]
    fn test_derived_definition_lists_nested() {
        let ctx = context();
        let cd = ctx.class_definition_for(&sample()).unwrap();
        assert_eq!(cd.field_count(), 6);
        assert_eq!(cd.field("home").unwrap().class_id(), ADDRESS);
        assert_eq!(cd.nested_class_definitions().len(), 1);
        assert!(ctx.lookup(ADDRESS).is_some());
    }

    #[test]
    fn test_null_portable_without_definition_fails() {
        let ctx = context();
        let person = Person {
            home: None,
            previous: Vec::new(),
            ..sample()
        };
        let mut output = ObjectDataOutput::new();
        assert!(matches!(
            write_portable_frame(&ctx, &mut output, &person),
            Err(HazelcastError::SchemaFailure(_))
        ));
    }

    #[test]
    fn test_field_type_mismatch() {
        let ctx = context();
        let mut builder = ClassDefinition::builder(9, 0);
        builder.add_field("f", FieldType::Int).unwrap();
        let cd = Arc::new(builder.build().unwrap());
        let mut writer = DefaultPortableWriter::new(&ctx, cd).unwrap();
        assert!(writer.write_string("f", Some("test")).is_err());
        assert!(writer.write_int("unknown", 1).is_err());
    }

    #[test]
    fn test_field_written_twice() {
        let ctx = context();
        let mut builder = ClassDefinition::builder(9, 0);
        builder.add_field("f", FieldType::Int).unwrap();
        let mut writer = DefaultPortableWriter::new(&ctx, Arc::new(builder.build().unwrap())).unwrap();
        writer.write_int("f", 1).unwrap();
        assert!(writer.write_int("f", 2).is_err());
    }

    #[test]
    fn test_unwritten_and_missing_fields_read_as_default() {
        let ctx = context();
        let mut builder = ClassDefinition::builder(9, 0);
        builder
            .add_field("f", FieldType::Int)
            .unwrap()
            .add_field("s", FieldType::Utf8)
            .unwrap();
        let cd = Arc::new(builder.build().unwrap());
        let writer = DefaultPortableWriter::new(&ctx, Arc::clone(&cd)).unwrap();
        let body = writer.as_bytes().to_vec();

        let mut reader = DefaultPortableReader::new(&ctx, cd, &body, 0).unwrap();
        assert_eq!(reader.read_int("f").unwrap(), 0);
        assert_eq!(reader.read_string("s").unwrap(), None);
        assert_eq!(reader.read_long("not_declared").unwrap(), 0);
        assert!(!reader.has_field("not_declared"));
        assert_eq!(reader.field_type("f"), Some(FieldType::Int));
    }

    #[test]
    fn test_fields_read_out_of_order() {
        let ctx = context();
        let mut builder = ClassDefinition::builder(9, 3);
        builder
            .add_field("a", FieldType::Long)
            .unwrap()
            .add_field("b", FieldType::BoolArray)
            .unwrap();
        let cd = Arc::new(builder.build().unwrap());
        let mut writer = DefaultPortableWriter::new(&ctx, Arc::clone(&cd)).unwrap();
        writer.write_bool_array("b", Some(&[true, false])).unwrap();
        writer.write_long("a", -5).unwrap();
        let body = writer.as_bytes().to_vec();

        let mut reader = DefaultPortableReader::new(&ctx, cd, &body, 0).unwrap();
        assert_eq!(reader.version(), 3);
        assert_eq!(reader.read_bool_array("b").unwrap(), Some(vec![true, false]));
        assert_eq!(reader.read_long("a").unwrap(), -5);
    }

    #[test]
    fn test_char_outside_bmp_is_rejected() {
        let ctx = context();
        let mut builder = ClassDefinition::builder(9, 0);
        builder.add_field("c", FieldType::Char).unwrap();
        let mut writer = DefaultPortableWriter::new(&ctx, Arc::new(builder.build().unwrap())).unwrap();
        assert!(writer.write_char("c", '😀').is_err());
    }

    #[test]
    fn test_corrupt_offset_is_rejected() {
        let ctx = context();
        let mut builder = ClassDefinition::builder(9, 0);
        builder.add_field("f", FieldType::Int).unwrap();
        let cd = Arc::new(builder.build().unwrap());
        let body = [0x7F, 0, 0, 0];
        let mut reader = DefaultPortableReader::new(&ctx, cd, &body, 0).unwrap();
        assert!(reader.read_int("f").is_err());
    }

    #[test]
    fn test_short_body_is_rejected() {
        let ctx = context();
        let mut builder = ClassDefinition::builder(9, 0);
        builder.add_field("f", FieldType::Int).unwrap();
        let cd = Arc::new(builder.build().unwrap());
        assert!(DefaultPortableReader::new(&ctx, cd, &[0, 0], 0).is_err());
    }

    #[test]
    fn test_unknown_class_fails_to_decode() {
        let ctx = context();
        let data = [0, 0, 0, 42, 0, 0, 0, 0, 0, 0, 0, 0];
        let mut input = ObjectDataInput::new(&data);
        assert!(matches!(
            read_portable_frame(&ctx, &mut input, 0),
            Err(HazelcastError::SchemaFailure(_))
        ));
    }
}
