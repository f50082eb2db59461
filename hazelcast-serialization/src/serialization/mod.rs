//! Serialization framework for Hazelcast's binary format.

pub(crate) mod buffer_pool;
mod builtin;
mod data;
mod data_input;
mod data_output;
mod generic;
mod identified;
pub mod portable;
mod registry;
mod serializer;
mod service;
mod traits;
mod type_key;
mod value;

pub use buffer_pool::{
    BufferPool, PooledBuffer, DEFAULT_BUFFER_CAPACITY, DEFAULT_MAX_RETAINED_CAPACITY,
    DEFAULT_POOL_SHARDS,
};
pub use builtin::{
    BigIntegerSerializer, BooleanSerializer, ByteArraySerializer, DateSerializer,
    IntegerSerializer, LongSerializer, StringSerializer, BIG_INTEGER_TYPE_ID, BOOLEAN_TYPE_ID,
    BYTE_ARRAY_TYPE_ID, DATE_TYPE_ID, INTEGER_TYPE_ID, LONG_TYPE_ID, STRING_TYPE_ID,
};
pub use data::Data;
pub use data_input::{DataInput, ObjectDataInput};
pub use data_output::{DataOutput, ObjectDataOutput};
pub use generic::{GenericSerializer, SERIALIZABLE_TYPE_ID};
pub use identified::{
    downcast_data_serializable, DataSerializableFactory, DataSerializer, FactoryRegistry,
    IdentifiedDataSerializable, IDENTIFIED_DATA_SERIALIZABLE_TYPE_ID,
};
pub use portable::{
    downcast_portable, ClassDefinition, ClassDefinitionBuilder, DefaultPortableReader,
    DefaultPortableWriter, FieldDefinition, FieldType, Portable, PortableContext,
    PortableFactory, PortableReader, PortableReaderExt, PortableSerializer, PortableWriter,
    PORTABLE_TYPE_ID,
};
pub use registry::SerializerRegistry;
pub use serializer::TypeSerializer;
pub use service::SerializationService;
pub use traits::{deserialize_list, serialize_list, Deserializable, Serializable};
pub use type_key::{TypeDescriptor, TypeHierarchy, TypeKey};
pub use value::{TypedObject, Value};
