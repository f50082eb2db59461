//! Registry of Portable class definitions keyed by class id and version.

use super::class_definition::{compress, decompress};
use super::reader_writer::ClassDefinitionWriter;
use super::{ClassDefinition, Portable, PortableFactory};
use crate::error::{HazelcastError, Result};
use crate::serialization::buffer_pool::BufferPool;
use crate::serialization::{ObjectDataInput, ObjectDataOutput};
use bytes::Bytes;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

/// Schema registry and instance factory for Portable serialization.
///
/// Definitions are created on first local registration or first import and
/// are never replaced: whichever registration of a (class id, version) lands
/// first becomes the canonical instance that every later caller receives.
pub struct PortableContext {
    version: i32,
    factory: Option<Arc<dyn PortableFactory>>,
    definitions: DashMap<(i32, i32), Arc<ClassDefinition>>,
    pool: Arc<BufferPool>,
}

impl fmt::Debug for PortableContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortableContext")
            .field("version", &self.version)
            .field("has_factory", &self.factory.is_some())
            .field("definitions", &self.definitions.len())
            .finish()
    }
}

impl PortableContext {
    /// Creates a context for the given default version.
    pub fn new(
        version: i32,
        factory: Option<Arc<dyn PortableFactory>>,
        pool: Arc<BufferPool>,
    ) -> Self {
        Self {
            version,
            factory,
            definitions: DashMap::new(),
            pool,
        }
    }

    /// Returns the version used by objects that do not declare one.
    pub fn version(&self) -> i32 {
        self.version
    }

    pub(crate) fn pool(&self) -> &BufferPool {
        &self.pool
    }

    /// Returns the number of known class definitions.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns true if no class definition is known.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Looks up a class definition at the context version.
    pub fn lookup(&self, class_id: i32) -> Option<Arc<ClassDefinition>> {
        self.lookup_versioned(class_id, self.version)
    }

    /// Looks up a class definition at an explicit version.
    pub fn lookup_versioned(&self, class_id: i32, version: i32) -> Option<Arc<ClassDefinition>> {
        self.definitions
            .get(&(class_id, version))
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Creates an empty instance of a Portable class for decoding.
    pub fn create_portable(&self, class_id: i32) -> Result<Box<dyn Portable>> {
        let factory = self.factory.as_ref().ok_or_else(|| {
            HazelcastError::SchemaFailure(format!(
                "no portable factory configured to create class {}",
                class_id
            ))
        })?;
        factory.create(class_id).ok_or_else(|| {
            HazelcastError::SchemaFailure(format!(
                "portable factory cannot create class {}",
                class_id
            ))
        })
    }

    /// Imports a class definition from its compressed form.
    ///
    /// Nested definitions are registered as well. If the same (class id,
    /// version) is already known, the known instance is returned.
    pub fn create_class_definition(&self, compressed: &[u8]) -> Result<Arc<ClassDefinition>> {
        let layout = decompress(compressed)?;
        let mut input = ObjectDataInput::new(&layout);
        let definition = ClassDefinition::read_layout(&mut input)?;
        definition.binary_or_init(Bytes::copy_from_slice(compressed));

        let canonical = self.insert_if_absent(
            (definition.class_id(), definition.version()),
            Arc::new(definition),
        );
        self.register_nested(&canonical)?;
        tracing::debug!(
            class_id = canonical.class_id(),
            version = canonical.version(),
            fields = canonical.field_count(),
            "imported class definition"
        );
        Ok(canonical)
    }

    /// Registers a class definition under its own class id and version.
    ///
    /// Returns the canonical instance, with its compressed form computed.
    pub fn register_class_definition(
        &self,
        definition: impl Into<Arc<ClassDefinition>>,
    ) -> Result<Arc<ClassDefinition>> {
        let definition = definition.into();
        let key = (definition.class_id(), definition.version());
        self.register_under(key, definition)
    }

    /// Registers a class definition under `class_id` at the context version.
    pub fn register_class_definition_for(
        &self,
        class_id: i32,
        definition: impl Into<Arc<ClassDefinition>>,
    ) -> Result<Arc<ClassDefinition>> {
        self.register_under((class_id, self.version), definition.into())
    }

    /// Returns the class definition `portable` is encoded with.
    ///
    /// An unknown class is described from the fields the object writes, then
    /// registered.
    pub fn class_definition_for(&self, portable: &dyn Portable) -> Result<Arc<ClassDefinition>> {
        let class_id = portable.class_id();
        let version = portable.version().unwrap_or(self.version);
        if let Some(known) = self.lookup_versioned(class_id, version) {
            return Ok(known);
        }
        let mut writer = ClassDefinitionWriter::new(self, class_id, version);
        portable.write_portable(&mut writer)?;
        let definition = writer.build()?;
        tracing::debug!(
            class_id,
            version,
            fields = definition.field_count(),
            "derived class definition from object layout"
        );
        self.register_class_definition(definition)
    }

    /// Returns the compressed binary of `definition`, computing it if needed.
    ///
    /// Concurrent first calls may each compress, but only one result is
    /// stored and all of them return it.
    pub fn binary_of(&self, definition: &ClassDefinition) -> Result<Bytes> {
        if let Some(binary) = definition.binary() {
            return Ok(binary.clone());
        }
        let mut output = ObjectDataOutput::pooled(self.pool.acquire());
        definition.write_layout(&mut output)?;
        let compressed = compress(output.as_bytes())?;
        Ok(definition.binary_or_init(compressed).clone())
    }

    fn register_under(
        &self,
        key: (i32, i32),
        definition: Arc<ClassDefinition>,
    ) -> Result<Arc<ClassDefinition>> {
        let canonical = self.insert_if_absent(key, definition);
        self.binary_of(&canonical)?;
        self.register_nested(&canonical)?;
        Ok(canonical)
    }

    fn register_nested(&self, definition: &ClassDefinition) -> Result<()> {
        for nested in definition.nested_class_definitions() {
            let key = (nested.class_id(), nested.version());
            let canonical = self.insert_if_absent(key, Arc::clone(nested));
            self.binary_of(&canonical)?;
            self.register_nested(&canonical)?;
        }
        Ok(())
    }

    fn insert_if_absent(
        &self,
        key: (i32, i32),
        definition: Arc<ClassDefinition>,
    ) -> Arc<ClassDefinition> {
        let entry = self.definitions.entry(key).or_insert_with(|| {
            tracing::debug!(
                class_id = key.0,
                version = key.1,
                "registered class definition"
            );
            definition
        });
        Arc::clone(entry.value())
    }
}
