//! Class definitions and their compressed exchange format.

use super::FieldType;
use crate::error::{HazelcastError, Result};
use crate::serialization::{DataInput, DataOutput};
use bytes::Bytes;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::{Arc, OnceLock};

/// Nesting limit when parsing a class definition layout.
const MAX_NESTING_DEPTH: usize = 64;

const INFLATE_CHUNK: usize = 1024;

/// Definition of a single field within a Portable class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefinition {
    name: String,
    field_type: FieldType,
    index: i32,
    class_id: i32,
    version: i32,
}

impl FieldDefinition {
    /// Creates a new field definition for a primitive, string or array field.
    pub fn new(name: impl Into<String>, field_type: FieldType, index: i32) -> Self {
        Self {
            name: name.into(),
            field_type,
            index,
            class_id: 0,
            version: 0,
        }
    }

    /// Creates a new field definition for a nested Portable field.
    pub fn new_portable(name: impl Into<String>, index: i32, class_id: i32, version: i32) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Portable,
            index,
            class_id,
            version,
        }
    }

    /// Creates a new field definition for a Portable array field.
    pub fn new_portable_array(
        name: impl Into<String>,
        index: i32,
        class_id: i32,
        version: i32,
    ) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::PortableArray,
            index,
            class_id,
            version,
        }
    }

    /// Returns the field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the field type.
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Returns the field index within the class.
    pub fn index(&self) -> i32 {
        self.index
    }

    /// Returns the class ID for nested Portable fields.
    pub fn class_id(&self) -> i32 {
        self.class_id
    }

    /// Returns the version for nested Portable fields.
    pub fn version(&self) -> i32 {
        self.version
    }
}

/// Schema of one Portable class at one version.
///
/// Fields are ordered by index. Definitions of nested Portable fields are
/// carried along so the schema is complete on its own. The compressed binary
/// form is computed at most once and then shared.
#[derive(Debug)]
pub struct ClassDefinition {
    class_id: i32,
    version: i32,
    fields: Vec<FieldDefinition>,
    field_indices: HashMap<String, usize>,
    nested: Vec<Arc<ClassDefinition>>,
    binary: OnceLock<Bytes>,
}

impl ClassDefinition {
    /// Creates a class definition without fields.
    pub fn new(class_id: i32, version: i32) -> Self {
        Self {
            class_id,
            version,
            fields: Vec::new(),
            field_indices: HashMap::new(),
            nested: Vec::new(),
            binary: OnceLock::new(),
        }
    }

    /// Returns a builder for a class definition.
    pub fn builder(class_id: i32, version: i32) -> ClassDefinitionBuilder {
        ClassDefinitionBuilder::new(class_id, version)
    }

    /// Returns the class ID.
    pub fn class_id(&self) -> i32 {
        self.class_id
    }

    /// Returns the schema version.
    pub fn version(&self) -> i32 {
        self.version
    }

    /// Returns the number of fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Returns all field definitions.
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.field_indices.get(name).map(|&i| &self.fields[i])
    }

    /// Returns true if a field with the given name exists.
    pub fn has_field(&self, name: &str) -> bool {
        self.field_indices.contains_key(name)
    }

    /// Returns the definitions of nested Portable fields.
    pub fn nested_class_definitions(&self) -> &[Arc<ClassDefinition>] {
        &self.nested
    }

    /// Returns the compressed binary form, if it was computed already.
    pub fn binary(&self) -> Option<&Bytes> {
        self.binary.get()
    }

    /// Stores the compressed binary form unless one is present, returning the
    /// stored value.
    pub(crate) fn binary_or_init(&self, binary: Bytes) -> &Bytes {
        self.binary.get_or_init(|| binary)
    }

    /// Writes the uncompressed layout.
    pub fn write_layout<W: DataOutput + ?Sized>(&self, output: &mut W) -> Result<()> {
        output.write_int(self.class_id)?;
        output.write_int(self.version)?;
        output.write_int(len_as_i32(self.fields.len())?)?;
        for field in &self.fields {
            output.write_int(field.index)?;
            output.write_string(&field.name)?;
            output.write_byte(field.field_type.id() as i8)?;
            output.write_int(field.class_id)?;
            output.write_int(field.version)?;
        }
        output.write_int(len_as_i32(self.nested.len())?)?;
        for nested in &self.nested {
            nested.write_layout(output)?;
        }
        Ok(())
    }

    /// Parses an uncompressed layout.
    pub fn read_layout<R: DataInput + ?Sized>(input: &mut R) -> Result<Self> {
        Self::read_layout_at(input, 0)
    }

    fn read_layout_at<R: DataInput + ?Sized>(input: &mut R, depth: usize) -> Result<Self> {
        if depth > MAX_NESTING_DEPTH {
            return Err(HazelcastError::SchemaFailure(format!(
                "class definition nested deeper than {} levels",
                MAX_NESTING_DEPTH
            )));
        }
        let class_id = input.read_int()?;
        let version = input.read_int()?;
        let mut builder = ClassDefinitionBuilder::new(class_id, version);

        let field_count = read_count(input, "field")?;
        for _ in 0..field_count {
            let index = input.read_int()?;
            let name = input.read_string()?;
            let field_type = FieldType::from_id(i32::from(input.read_byte()?))?;
            let nested_class_id = input.read_int()?;
            let nested_version = input.read_int()?;
            let field = if field_type.is_portable() {
                FieldDefinition {
                    name,
                    field_type,
                    index,
                    class_id: nested_class_id,
                    version: nested_version,
                }
            } else {
                FieldDefinition::new(name, field_type, index)
            };
            builder.push_field(field)?;
        }

        let nested_count = read_count(input, "nested definition")?;
        for _ in 0..nested_count {
            let nested = Self::read_layout_at(input, depth + 1)?;
            builder.push_nested(Arc::new(nested));
        }
        builder.build()
    }
}

impl PartialEq for ClassDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.class_id == other.class_id
            && self.version == other.version
            && self.fields == other.fields
            && self.nested == other.nested
    }
}

impl Eq for ClassDefinition {}

/// Builds a [`ClassDefinition`] field by field.
///
/// Fields added through the typed helpers get consecutive indices.
#[derive(Debug)]
pub struct ClassDefinitionBuilder {
    definition: ClassDefinition,
}

impl ClassDefinitionBuilder {
    /// Starts a definition for the given class and version.
    pub fn new(class_id: i32, version: i32) -> Self {
        Self {
            definition: ClassDefinition::new(class_id, version),
        }
    }

    /// Adds a field of a non-Portable kind.
    pub fn add_field(&mut self, name: impl Into<String>, field_type: FieldType) -> Result<&mut Self> {
        if field_type.is_portable() {
            return Err(HazelcastError::SchemaFailure(format!(
                "{:?} fields need a nested class definition",
                field_type
            )));
        }
        let index = self.next_index()?;
        self.push_field(FieldDefinition::new(name, field_type, index))?;
        Ok(self)
    }

    /// Adds a nested Portable field described by `nested`.
    pub fn add_portable_field(
        &mut self,
        name: impl Into<String>,
        nested: Arc<ClassDefinition>,
    ) -> Result<&mut Self> {
        let index = self.next_index()?;
        let field =
            FieldDefinition::new_portable(name, index, nested.class_id(), nested.version());
        self.push_field(field)?;
        self.push_nested(nested);
        Ok(self)
    }

    /// Adds a Portable array field whose elements are described by `nested`.
    pub fn add_portable_array_field(
        &mut self,
        name: impl Into<String>,
        nested: Arc<ClassDefinition>,
    ) -> Result<&mut Self> {
        let index = self.next_index()?;
        let field =
            FieldDefinition::new_portable_array(name, index, nested.class_id(), nested.version());
        self.push_field(field)?;
        self.push_nested(nested);
        Ok(self)
    }

    fn next_index(&self) -> Result<i32> {
        len_as_i32(self.definition.fields.len())
    }

    pub(crate) fn push_field(&mut self, field: FieldDefinition) -> Result<()> {
        if self.definition.field_indices.contains_key(&field.name) {
            return Err(HazelcastError::SchemaFailure(format!(
                "duplicate field '{}' in class {}",
                field.name, self.definition.class_id
            )));
        }
        self.definition
            .field_indices
            .insert(field.name.clone(), self.definition.fields.len());
        self.definition.fields.push(field);
        Ok(())
    }

    pub(crate) fn push_nested(&mut self, nested: Arc<ClassDefinition>) {
        let known = self
            .definition
            .nested
            .iter()
            .any(|n| n.class_id == nested.class_id && n.version == nested.version);
        if !known {
            self.definition.nested.push(nested);
        }
    }

    /// Validates and returns the definition.
    ///
    /// Field indices must be exactly `0..field_count` in order, and every
    /// Portable field must have its nested definition attached.
    pub fn build(self) -> Result<ClassDefinition> {
        let definition = self.definition;
        for (position, field) in definition.fields.iter().enumerate() {
            if usize::try_from(field.index).ok() != Some(position) {
                return Err(HazelcastError::SchemaFailure(format!(
                    "field '{}' of class {} has index {} at position {}",
                    field.name, definition.class_id, field.index, position
                )));
            }
            if field.field_type.is_portable()
                && !definition
                    .nested
                    .iter()
                    .any(|n| n.class_id == field.class_id && n.version == field.version)
            {
                return Err(HazelcastError::SchemaFailure(format!(
                    "field '{}' of class {} references unknown class {}/{}",
                    field.name, definition.class_id, field.class_id, field.version
                )));
            }
        }
        Ok(definition)
    }
}

/// Compresses a class definition layout (zlib, best compression).
pub(crate) fn compress(layout: &[u8]) -> Result<Bytes> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder
        .write_all(layout)
        .map_err(|e| HazelcastError::SchemaFailure(format!("compression failed: {}", e)))?;
    let compressed = encoder
        .finish()
        .map_err(|e| HazelcastError::SchemaFailure(format!("compression failed: {}", e)))?;
    Ok(Bytes::from(compressed))
}

/// Inflates a compressed class definition.
///
/// The output grows in fixed chunks until the stream ends, so no size hint is
/// trusted and nothing is truncated.
pub(crate) fn decompress(compressed: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(compressed);
    let mut layout = Vec::new();
    let mut chunk = [0u8; INFLATE_CHUNK];
    loop {
        let count = decoder
            .read(&mut chunk)
            .map_err(|e| HazelcastError::SchemaFailure(format!("decompression failed: {}", e)))?;
        if count == 0 {
            break;
        }
        layout.try_reserve(count).map_err(|e| {
            HazelcastError::ResourceExhausted(format!(
                "cannot grow class definition buffer past {} bytes: {}",
                layout.len(),
                e
            ))
        })?;
        layout.extend_from_slice(&chunk[..count]);
    }
    Ok(layout)
}

fn len_as_i32(len: usize) -> Result<i32> {
    i32::try_from(len)
        .map_err(|_| HazelcastError::SchemaFailure(format!("too many entries: {}", len)))
}

fn read_count<R: DataInput + ?Sized>(input: &mut R, what: &str) -> Result<i32> {
    let count = input.read_int()?;
    if count < 0 {
        return Err(HazelcastError::SchemaFailure(format!(
            "negative {} count: {}",
            what, count
        )));
    }
    Ok(count)
}
