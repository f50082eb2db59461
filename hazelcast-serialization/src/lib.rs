//! Pluggable binary serialization engine for Hazelcast.
//!
//! A [`SerializationService`] turns [`Value`]s into [`Data`] envelopes and
//! back. Built-in value kinds use fixed codecs, Portable objects carry a
//! versioned class definition, identified data serializable objects are
//! created through factories, and user types resolve their codec through the
//! serializer registry and its declared type hierarchy.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod partition_aware;
pub mod serialization;

pub use config::{
    LoggingOutOfMemoryHandler, ManagedContext, OutOfMemoryHandler, SerializationConfig,
    SerializationConfigBuilder,
};
pub use error::{HazelcastError, Result};
pub use partition_aware::PartitionAware;
pub use serialization::{
    ClassDefinition, Data, DataInput, DataOutput, DataSerializableFactory, Deserializable,
    FieldType, IdentifiedDataSerializable, ObjectDataInput, ObjectDataOutput, Portable,
    PortableFactory, PortableReader, PortableReaderExt, PortableWriter, Serializable,
    SerializationService, TypeDescriptor, TypeKey, TypeSerializer, TypedObject, Value,
};
