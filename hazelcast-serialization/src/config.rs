//! Serialization service configuration types and builders.

use std::fmt;
use std::sync::Arc;

use crate::error::{HazelcastError, Result};
use crate::serialization::buffer_pool::{
    DEFAULT_BUFFER_CAPACITY, DEFAULT_MAX_RETAINED_CAPACITY, DEFAULT_POOL_SHARDS,
};
use crate::serialization::{
    DataSerializableFactory, FactoryRegistry, PortableFactory, Value,
};

/// Default Portable version for objects that do not declare one.
const DEFAULT_PORTABLE_VERSION: i32 = 0;

/// Post-decode initializer applied to every object `to_object` returns.
pub trait ManagedContext: Send + Sync {
    /// Returns the value to hand to the caller in place of `value`.
    fn initialize(&self, value: Value) -> Value;
}

impl<F> ManagedContext for F
where
    F: Fn(Value) -> Value + Send + Sync,
{
    fn initialize(&self, value: Value) -> Value {
        self(value)
    }
}

/// Receives critical resource exhaustion failures.
///
/// The service calls the handler and then returns the original error to the
/// caller unchanged.
pub trait OutOfMemoryHandler: Send + Sync {
    /// Called once per failed call.
    fn on_out_of_memory(&self, error: &HazelcastError);
}

/// Handler installed when none is configured. Logs the failure.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingOutOfMemoryHandler;

impl OutOfMemoryHandler for LoggingOutOfMemoryHandler {
    fn on_out_of_memory(&self, error: &HazelcastError) {
        tracing::error!(error = %error, "serialization ran out of memory");
    }
}

/// Configuration of a [`SerializationService`](crate::SerializationService).
#[derive(Clone)]
pub struct SerializationConfig {
    portable_version: i32,
    initial_buffer_capacity: usize,
    max_retained_buffer_capacity: usize,
    buffer_pool_shards: usize,
    portable_factory: Option<Arc<dyn PortableFactory>>,
    data_serializable_factories: FactoryRegistry,
    managed_context: Option<Arc<dyn ManagedContext>>,
    out_of_memory_handler: Arc<dyn OutOfMemoryHandler>,
}

impl SerializationConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> SerializationConfigBuilder {
        SerializationConfigBuilder::new()
    }

    /// Returns the Portable version used by objects that do not declare one.
    pub fn portable_version(&self) -> i32 {
        self.portable_version
    }

    /// Returns the capacity of a freshly allocated output buffer.
    pub fn initial_buffer_capacity(&self) -> usize {
        self.initial_buffer_capacity
    }

    /// Returns the largest buffer capacity kept in the pool.
    pub fn max_retained_buffer_capacity(&self) -> usize {
        self.max_retained_buffer_capacity
    }

    /// Returns the number of independently locked pool shards.
    pub fn buffer_pool_shards(&self) -> usize {
        self.buffer_pool_shards
    }

    /// Returns the factory that creates Portable instances for decoding.
    pub fn portable_factory(&self) -> Option<&Arc<dyn PortableFactory>> {
        self.portable_factory.as_ref()
    }

    /// Returns the identified data serializable factories.
    pub fn data_serializable_factories(&self) -> &FactoryRegistry {
        &self.data_serializable_factories
    }

    /// Returns the post-decode initializer.
    pub fn managed_context(&self) -> Option<&Arc<dyn ManagedContext>> {
        self.managed_context.as_ref()
    }

    /// Returns the handler for resource exhaustion failures.
    pub fn out_of_memory_handler(&self) -> &Arc<dyn OutOfMemoryHandler> {
        &self.out_of_memory_handler
    }
}

impl fmt::Debug for SerializationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializationConfig")
            .field("portable_version", &self.portable_version)
            .field("initial_buffer_capacity", &self.initial_buffer_capacity)
            .field(
                "max_retained_buffer_capacity",
                &self.max_retained_buffer_capacity,
            )
            .field("buffer_pool_shards", &self.buffer_pool_shards)
            .field("has_portable_factory", &self.portable_factory.is_some())
            .field(
                "data_serializable_factories",
                &self.data_serializable_factories,
            )
            .field("has_managed_context", &self.managed_context.is_some())
            .finish()
    }
}

impl Default for SerializationConfig {
    fn default() -> Self {
        Self {
            portable_version: DEFAULT_PORTABLE_VERSION,
            initial_buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            max_retained_buffer_capacity: DEFAULT_MAX_RETAINED_CAPACITY,
            buffer_pool_shards: DEFAULT_POOL_SHARDS,
            portable_factory: None,
            data_serializable_factories: FactoryRegistry::new(),
            managed_context: None,
            out_of_memory_handler: Arc::new(LoggingOutOfMemoryHandler),
        }
    }
}

impl From<SerializationConfig> for SerializationConfigBuilder {
    fn from(config: SerializationConfig) -> Self {
        Self {
            portable_version: Some(config.portable_version),
            initial_buffer_capacity: Some(config.initial_buffer_capacity),
            max_retained_buffer_capacity: Some(config.max_retained_buffer_capacity),
            buffer_pool_shards: Some(config.buffer_pool_shards),
            portable_factory: config.portable_factory,
            data_serializable_factories: config.data_serializable_factories,
            managed_context: config.managed_context,
            out_of_memory_handler: Some(config.out_of_memory_handler),
        }
    }
}

/// Builder for `SerializationConfig`.
#[derive(Clone, Default)]
pub struct SerializationConfigBuilder {
    portable_version: Option<i32>,
    initial_buffer_capacity: Option<usize>,
    max_retained_buffer_capacity: Option<usize>,
    buffer_pool_shards: Option<usize>,
    portable_factory: Option<Arc<dyn PortableFactory>>,
    data_serializable_factories: FactoryRegistry,
    managed_context: Option<Arc<dyn ManagedContext>>,
    out_of_memory_handler: Option<Arc<dyn OutOfMemoryHandler>>,
}

impl fmt::Debug for SerializationConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializationConfigBuilder")
            .field("portable_version", &self.portable_version)
            .field("initial_buffer_capacity", &self.initial_buffer_capacity)
            .field(
                "max_retained_buffer_capacity",
                &self.max_retained_buffer_capacity,
            )
            .field("buffer_pool_shards", &self.buffer_pool_shards)
            .finish_non_exhaustive()
    }
}

impl SerializationConfigBuilder {
    /// Creates a new serialization configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the Portable version used by objects that do not declare one.
    pub fn portable_version(mut self, version: i32) -> Self {
        self.portable_version = Some(version);
        self
    }

    /// Sets the capacity of a freshly allocated output buffer.
    pub fn initial_buffer_capacity(mut self, capacity: usize) -> Self {
        self.initial_buffer_capacity = Some(capacity);
        self
    }

    /// Sets the largest buffer capacity kept in the pool. Buffers that grow
    /// beyond it are dropped when released.
    pub fn max_retained_buffer_capacity(mut self, capacity: usize) -> Self {
        self.max_retained_buffer_capacity = Some(capacity);
        self
    }

    /// Sets the number of independently locked pool shards.
    pub fn buffer_pool_shards(mut self, shards: usize) -> Self {
        self.buffer_pool_shards = Some(shards);
        self
    }

    /// Sets the factory that creates Portable instances for decoding.
    pub fn portable_factory(mut self, factory: impl PortableFactory + 'static) -> Self {
        self.portable_factory = Some(Arc::new(factory));
        self
    }

    /// Adds an identified data serializable factory.
    pub fn add_data_serializable_factory(
        mut self,
        factory_id: i32,
        factory: impl DataSerializableFactory + 'static,
    ) -> Self {
        self.data_serializable_factories
            .register(factory_id, Arc::new(factory));
        self
    }

    /// Sets the post-decode initializer.
    pub fn managed_context(mut self, context: impl ManagedContext + 'static) -> Self {
        self.managed_context = Some(Arc::new(context));
        self
    }

    /// Sets the handler for resource exhaustion failures.
    pub fn out_of_memory_handler(mut self, handler: impl OutOfMemoryHandler + 'static) -> Self {
        self.out_of_memory_handler = Some(Arc::new(handler));
        self
    }

    /// Builds the configuration, returning an error if validation fails.
    ///
    /// # Errors
    ///
    /// Returns `HazelcastError::Configuration` if:
    /// - `portable_version` is negative
    /// - `initial_buffer_capacity` is zero
    /// - `max_retained_buffer_capacity` is below `initial_buffer_capacity`
    /// - `buffer_pool_shards` is zero
    pub fn build(self) -> Result<SerializationConfig> {
        let portable_version = self.portable_version.unwrap_or(DEFAULT_PORTABLE_VERSION);
        let initial_buffer_capacity = self
            .initial_buffer_capacity
            .unwrap_or(DEFAULT_BUFFER_CAPACITY);
        let max_retained_buffer_capacity = self
            .max_retained_buffer_capacity
            .unwrap_or(DEFAULT_MAX_RETAINED_CAPACITY);
        let buffer_pool_shards = self.buffer_pool_shards.unwrap_or(DEFAULT_POOL_SHARDS);

        if portable_version < 0 {
            return Err(HazelcastError::Configuration(
                "portable_version must not be negative".to_string(),
            ));
        }

        if initial_buffer_capacity == 0 {
            return Err(HazelcastError::Configuration(
                "initial_buffer_capacity must be positive".to_string(),
            ));
        }

        if max_retained_buffer_capacity < initial_buffer_capacity {
            return Err(HazelcastError::Configuration(
                "max_retained_buffer_capacity must not be below initial_buffer_capacity"
                    .to_string(),
            ));
        }

        if buffer_pool_shards == 0 {
            return Err(HazelcastError::Configuration(
                "buffer_pool_shards must be positive".to_string(),
            ));
        }

        Ok(SerializationConfig {
            portable_version,
            initial_buffer_capacity,
            max_retained_buffer_capacity,
            buffer_pool_shards,
            portable_factory: self.portable_factory,
            data_serializable_factories: self.data_serializable_factories,
            managed_context: self.managed_context,
            out_of_memory_handler: self
                .out_of_memory_handler
                .unwrap_or_else(|| Arc::new(LoggingOutOfMemoryHandler)),
        })
    }
}
