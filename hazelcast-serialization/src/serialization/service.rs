//! The serialization service: entry point for encoding and decoding values.

use super::buffer_pool::BufferPool;
use super::builtin::builtin_serializers;
use super::data::Data;
use super::generic::GenericSerializer;
use super::identified::DataSerializer;
use super::portable::{PortableContext, PortableSerializer, PORTABLE_TYPE_ID};
use super::registry::SerializerRegistry;
use super::serializer::TypeSerializer;
use super::type_key::{TypeDescriptor, TypeKey};
use super::value::{TypedObject, Value};
use super::{DataInput, DataOutput, ObjectDataInput, ObjectDataOutput};
use crate::config::{ManagedContext, OutOfMemoryHandler, SerializationConfig};
use crate::error::{HazelcastError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Encodes values into [`Data`] envelopes and decodes them back.
///
/// The service owns the serializer registry, the Portable schema registry and
/// the output buffer pool. It is safe to share between threads; every method
/// takes `&self`.
///
/// # Example
///
/// ```ignore
/// use hazelcast_serialization::{SerializationService, Value};
///
/// let service = SerializationService::default();
/// let data = service.to_data(&Value::Integer(42))?.expect("non-null value");
/// assert_eq!(data.type_id(), -7);
/// assert_eq!(service.to_object(Some(&data))?, Value::Integer(42));
/// ```
pub struct SerializationService {
    registry: SerializerRegistry,
    pool: Arc<BufferPool>,
    portable_serializer: Arc<PortableSerializer>,
    generic_serializer: Arc<GenericSerializer>,
    managed_context: Option<Arc<dyn ManagedContext>>,
    out_of_memory_handler: Arc<dyn OutOfMemoryHandler>,
}

impl fmt::Debug for SerializationService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializationService")
            .field("registry", &self.registry)
            .field("pool", &self.pool)
            .field("portable_context", self.portable_serializer.context())
            .field("has_managed_context", &self.managed_context.is_some())
            .finish()
    }
}

impl SerializationService {
    /// Creates a service with the built-in codecs installed.
    pub fn new(config: SerializationConfig) -> Self {
        let pool = Arc::new(BufferPool::with_settings(
            config.initial_buffer_capacity(),
            config.max_retained_buffer_capacity(),
            config.buffer_pool_shards(),
        ));
        let context = Arc::new(PortableContext::new(
            config.portable_version(),
            config.portable_factory().cloned(),
            Arc::clone(&pool),
        ));
        let portable_serializer = Arc::new(PortableSerializer::new(context));
        let data_serializer = Arc::new(DataSerializer::new(
            config.data_serializable_factories().clone(),
        ));
        let generic_serializer = Arc::new(GenericSerializer::new());

        let registry = SerializerRegistry::new();
        for (key, codec) in builtin_serializers() {
            registry.install(key, codec);
        }
        registry.install(TypeKey::PORTABLE, portable_serializer.clone());
        registry.install(TypeKey::DATA_SERIALIZABLE, data_serializer);
        registry.install(TypeKey::SERIALIZABLE, generic_serializer.clone());

        tracing::debug!(
            portable_version = config.portable_version(),
            codecs = registry.len(),
            "created serialization service"
        );

        Self {
            registry,
            pool,
            portable_serializer,
            generic_serializer,
            managed_context: config.managed_context().cloned(),
            out_of_memory_handler: Arc::clone(config.out_of_memory_handler()),
        }
    }

    /// Encodes `value` into an envelope.
    ///
    /// `Null` encodes to `None`. An envelope passed in is returned as is.
    ///
    /// # Errors
    ///
    /// `NotSerializable` if no codec resolves for the value's type.
    pub fn to_data(&self, value: &Value) -> Result<Option<Data>> {
        match value {
            Value::Null => Ok(None),
            Value::Data(data) => Ok(Some(data.clone())),
            _ => self.guard(self.encode(value)).map(Some),
        }
    }

    /// Decodes an envelope.
    ///
    /// `None` and empty envelopes decode to `Null`.
    ///
    /// # Errors
    ///
    /// `UnknownType` if no codec is bound to the envelope's type id.
    pub fn to_object(&self, data: Option<&Data>) -> Result<Value> {
        match data {
            Some(data) if !data.is_empty() => self.guard(self.decode(data)),
            _ => Ok(Value::Null),
        }
    }

    /// Writes `value` to `output` as its type id followed by its encoded form.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for `Null`, `NotSerializable` if no codec resolves.
    pub fn write_object(&self, output: &mut ObjectDataOutput<'_>, value: &Value) -> Result<()> {
        self.guard(self.write_value(output, value))
    }

    /// Unguarded form of [`write_object`](Self::write_object) for writes
    /// nested inside a codec. The outermost call reports exhaustion.
    pub(crate) fn write_value(
        &self,
        output: &mut ObjectDataOutput<'_>,
        value: &Value,
    ) -> Result<()> {
        match value {
            Value::Null => Err(HazelcastError::InvalidArgument(
                "cannot write a null object".to_string(),
            )),
            Value::Data(data) => {
                output.write_int(data.type_id())?;
                output.write_bytes(data.buffer())
            }
            _ => {
                let codec = self.serializer_for(value)?;
                output.write_int(codec.type_id())?;
                codec.write(output, value)
            }
        }
    }

    /// Reads a value written by [`write_object`](Self::write_object).
    ///
    /// # Errors
    ///
    /// `UnknownType` if no codec is bound to the type id read.
    pub fn read_object(&self, input: &mut ObjectDataInput<'_>) -> Result<Value> {
        self.guard(self.read_value(input))
    }

    /// Unguarded form of [`read_object`](Self::read_object) for reads nested
    /// inside a codec.
    pub(crate) fn read_value(&self, input: &mut ObjectDataInput<'_>) -> Result<Value> {
        let type_id = input.read_int()?;
        let codec = self.serializer_for_id(type_id)?;
        let value = codec.read(input)?;
        Ok(self.initialize(value))
    }

    /// Binds a user codec to `key`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a negative type id. `RegistrationConflict` when
    /// the type or id is bound to a different codec implementation, or when
    /// `key` is a Portable or identified data serializable type.
    pub fn register(&self, key: impl Into<TypeKey>, codec: Arc<dyn TypeSerializer>) -> Result<()> {
        let key = key.into();
        let type_id = codec.type_id();
        self.registry.register(key.clone(), codec)?;
        tracing::debug!(type_key = %key, type_id, "registered codec");
        Ok(())
    }

    /// Removes the codec bound to `key`. Does nothing if none is bound.
    pub fn deregister(&self, key: &TypeKey) {
        self.registry.deregister(key);
    }

    /// Installs the codec used for types nothing else resolves.
    ///
    /// # Errors
    ///
    /// `RegistrationConflict` if a fallback is already active.
    pub fn register_fallback(&self, codec: Arc<dyn TypeSerializer>) -> Result<()> {
        self.registry.register_fallback(codec)
    }

    /// Removes the fallback codec.
    pub fn deregister_fallback(&self) {
        self.registry.deregister_fallback();
    }

    /// Makes `T` encodable through the generic serde codec under `key`.
    ///
    /// # Errors
    ///
    /// `RegistrationConflict` if `key` is a Portable or identified data
    /// serializable type.
    pub fn register_serde<T>(&self, key: impl Into<TypeKey>) -> Result<()>
    where
        T: TypedObject + Serialize + DeserializeOwned,
    {
        let key = key.into();
        let hierarchy = self.registry.hierarchy();
        if hierarchy.is_a(&key, &TypeKey::PORTABLE)
            || hierarchy.is_a(&key, &TypeKey::DATA_SERIALIZABLE)
        {
            return Err(HazelcastError::RegistrationConflict(format!(
                "{} belongs to a reserved family",
                key
            )));
        }
        self.generic_serializer.register::<T>(key.clone());
        self.registry.declare_type(
            key.clone(),
            TypeDescriptor::new().implements(TypeKey::SERIALIZABLE),
        );
        tracing::debug!(type_key = %key, "registered serde type");
        Ok(())
    }

    /// Declares the parents of `key` for codec resolution.
    pub fn declare_type(&self, key: impl Into<TypeKey>, descriptor: TypeDescriptor) {
        self.registry.declare_type(key, descriptor);
    }

    /// Returns the codec `key` resolves to.
    pub fn serializer_for_type(&self, key: &TypeKey) -> Option<Arc<dyn TypeSerializer>> {
        self.registry.lookup(key)
    }

    /// Returns the codec bound to `type_id`.
    pub fn serializer_for_type_id(&self, type_id: i32) -> Option<Arc<dyn TypeSerializer>> {
        self.registry.lookup_id(type_id)
    }

    /// Returns the Portable schema registry.
    pub fn portable_context(&self) -> &PortableContext {
        self.portable_serializer.context()
    }

    /// Returns how many type lookups had to walk the hierarchy.
    pub fn hierarchy_walks(&self) -> u64 {
        self.registry.hierarchy_walks()
    }

    /// Returns the number of idle pooled buffers.
    pub fn pool_size(&self) -> usize {
        self.pool.size()
    }

    /// Tears the service down.
    ///
    /// Every registered codec's teardown hook runs once, all bindings and the
    /// fallback are dropped, and pooled buffers are released. Afterwards
    /// encoding fails with `NotSerializable` and decoding with `UnknownType`.
    pub fn destroy(&self) {
        self.registry.destroy();
        self.pool.clear();
        tracing::debug!("destroyed serialization service");
    }

    fn encode(&self, value: &Value) -> Result<Data> {
        let codec = self.serializer_for(value)?;
        let mut output = ObjectDataOutput::bound(self.pool.acquire(), self);
        let class_definition = match value {
            Value::Portable(_) if codec.type_id() == PORTABLE_TYPE_ID => Some(
                self.portable_serializer
                    .write_with_definition(&mut output, value)?,
            ),
            _ => {
                codec.write(&mut output, value)?;
                None
            }
        };
        let mut data = Data::new(codec.type_id(), output.to_bytes());
        drop(output);

        if let Some(class_definition) = class_definition {
            data = data.with_class_definition(class_definition);
        }
        if let Some(partition_aware) = value.partition_aware() {
            let key = partition_aware.partition_key();
            let key_data = match &key {
                Value::Null => None,
                Value::Data(key_data) => Some(key_data.clone()),
                _ => Some(self.encode(&key)?),
            };
            if let Some(key_data) = key_data {
                data = data.with_partition_hash(key_data.partition_hash());
            }
        }
        Ok(data)
    }

    fn decode(&self, data: &Data) -> Result<Value> {
        let codec = self.serializer_for_id(data.type_id())?;
        if let Some(class_definition) = data.class_definition() {
            let context = self.portable_context();
            if context
                .lookup_versioned(class_definition.class_id(), class_definition.version())
                .is_none()
            {
                context.register_class_definition(Arc::clone(class_definition))?;
            }
        }
        let mut input = ObjectDataInput::with_service(data.buffer(), self);
        let value = codec.read(&mut input)?;
        Ok(self.initialize(value))
    }

    fn serializer_for(&self, value: &Value) -> Result<Arc<dyn TypeSerializer>> {
        let key = value.type_key().ok_or_else(|| {
            HazelcastError::NotSerializable(format!("{:?} has no runtime type", value))
        })?;
        self.registry
            .lookup(&key)
            .ok_or_else(|| HazelcastError::NotSerializable(format!("no serializer for type {}", key)))
    }

    fn serializer_for_id(&self, type_id: i32) -> Result<Arc<dyn TypeSerializer>> {
        self.registry
            .lookup_id(type_id)
            .ok_or(HazelcastError::UnknownType(type_id))
    }

    fn initialize(&self, value: Value) -> Value {
        match &self.managed_context {
            Some(context) => context.initialize(value),
            None => value,
        }
    }

    fn guard<T>(&self, result: Result<T>) -> Result<T> {
        result.map_err(|e| match e {
            HazelcastError::ResourceExhausted(_) => {
                self.out_of_memory_handler.on_out_of_memory(&e);
                e
            }
            HazelcastError::Io(io) => HazelcastError::Serialization(io.to_string()),
            other => other,
        })
    }
}

impl Default for SerializationService {
    fn default() -> Self {
        Self::new(SerializationConfig::default())
    }
}
