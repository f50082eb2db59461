//! Identified data serializable support for Hazelcast serialization.

use crate::error::{HazelcastError, Result};
use crate::partition_aware::PartitionAware;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::serializer::TypeSerializer;
use super::value::Value;
use super::{DataInput, DataOutput, ObjectDataInput, ObjectDataOutput};

/// Type ID for identified data serializable format.
pub const IDENTIFIED_DATA_SERIALIZABLE_TYPE_ID: i32 = -2;

/// Trait for types that can be serialized using Hazelcast's identified data serializable format.
///
/// Types implementing this trait are identified by a factory ID and class ID combination,
/// which allows efficient type lookup during deserialization.
pub trait IdentifiedDataSerializable: Any + Send + Sync + fmt::Debug {
    /// Returns the factory ID for this type.
    fn factory_id(&self) -> i32;

    /// Returns the class ID for this type within its factory.
    fn class_id(&self) -> i32;

    /// Writes the object's data to the output.
    fn write_data(&self, output: &mut ObjectDataOutput<'_>) -> Result<()>;

    /// Reads the object's data from the input, populating this instance.
    fn read_data(&mut self, input: &mut ObjectDataInput<'_>) -> Result<()>;

    /// Returns the partition key view of this object, if it has one.
    fn partition_aware(&self) -> Option<&dyn PartitionAware> {
        None
    }
}

/// Factory for creating instances of `IdentifiedDataSerializable` types.
///
/// Each factory is responsible for creating instances of types that share the same factory ID.
/// Any `Fn(i32) -> Option<Box<dyn IdentifiedDataSerializable>>` closure is a factory.
pub trait DataSerializableFactory: Send + Sync {
    /// Creates a default/empty instance of the type with the given class ID.
    ///
    /// Returns `None` if the class ID is not recognized by this factory.
    fn create(&self, class_id: i32) -> Option<Box<dyn IdentifiedDataSerializable>>;
}

impl<F> DataSerializableFactory for F
where
    F: Fn(i32) -> Option<Box<dyn IdentifiedDataSerializable>> + Send + Sync,
{
    fn create(&self, class_id: i32) -> Option<Box<dyn IdentifiedDataSerializable>> {
        self(class_id)
    }
}

/// Registry for `DataSerializableFactory` instances.
///
/// This registry maps factory IDs to their corresponding factories, enabling
/// type lookup during deserialization.
#[derive(Default, Clone)]
pub struct FactoryRegistry {
    factories: HashMap<i32, Arc<dyn DataSerializableFactory>>,
}

impl fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.factories.keys().collect();
        ids.sort_unstable();
        f.debug_struct("FactoryRegistry")
            .field("factory_ids", &ids)
            .finish()
    }
}

impl FactoryRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registers a factory with its factory ID.
    ///
    /// If a factory with the same ID was previously registered, it is replaced.
    pub fn register(&mut self, factory_id: i32, factory: Arc<dyn DataSerializableFactory>) {
        self.factories.insert(factory_id, factory);
    }

    /// Removes a factory by its factory ID.
    ///
    /// Returns the removed factory if it was present.
    pub fn unregister(&mut self, factory_id: i32) -> Option<Arc<dyn DataSerializableFactory>> {
        self.factories.remove(&factory_id)
    }

    /// Returns the factory for the given factory ID, if registered.
    pub fn get(&self, factory_id: i32) -> Option<&dyn DataSerializableFactory> {
        self.factories.get(&factory_id).map(|f| f.as_ref())
    }

    /// Creates an instance using the registered factory for the given factory ID and class ID.
    ///
    /// Returns `None` if no factory is registered for the factory ID, or if the factory
    /// does not recognize the class ID.
    pub fn create(
        &self,
        factory_id: i32,
        class_id: i32,
    ) -> Option<Box<dyn IdentifiedDataSerializable>> {
        self.factories.get(&factory_id)?.create(class_id)
    }

    /// Returns `true` if a factory is registered for the given factory ID.
    pub fn contains(&self, factory_id: i32) -> bool {
        self.factories.contains_key(&factory_id)
    }

    /// Returns the number of registered factories.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Returns `true` if no factories are registered.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

/// Codec of the identified data serializable family.
///
/// The wire form is the factory id, the class id, then whatever the object
/// writes for itself.
#[derive(Debug, Default)]
pub struct DataSerializer {
    factories: FactoryRegistry,
}

impl DataSerializer {
    /// Creates a codec that instantiates objects through `factories`.
    pub fn new(factories: FactoryRegistry) -> Self {
        Self { factories }
    }

    /// Returns the factories used for decoding.
    pub fn factories(&self) -> &FactoryRegistry {
        &self.factories
    }
}

impl TypeSerializer for DataSerializer {
    fn type_id(&self) -> i32 {
        IDENTIFIED_DATA_SERIALIZABLE_TYPE_ID
    }

    fn write(&self, output: &mut ObjectDataOutput<'_>, value: &Value) -> Result<()> {
        let Value::DataSerializable(object) = value else {
            return Err(HazelcastError::Serialization(format!(
                "DataSerializer cannot encode {:?}",
                value
            )));
        };
        output.write_int(object.factory_id())?;
        output.write_int(object.class_id())?;
        object.write_data(output)
    }

    fn read(&self, input: &mut ObjectDataInput<'_>) -> Result<Value> {
        let factory_id = input.read_int()?;
        let class_id = input.read_int()?;
        let mut instance = self.factories.create(factory_id, class_id).ok_or_else(|| {
            HazelcastError::Serialization(format!(
                "no data serializable factory can create factory_id={}, class_id={}",
                factory_id, class_id
            ))
        })?;
        instance.read_data(input)?;
        Ok(Value::DataSerializable(Arc::from(instance)))
    }
}

/// Converts a decoded object into its concrete type.
pub fn downcast_data_serializable<D: IdentifiedDataSerializable>(
    object: Box<dyn IdentifiedDataSerializable>,
) -> Result<D> {
    let (factory_id, class_id) = (object.factory_id(), object.class_id());
    let any: Box<dyn Any> = object;
    any.downcast::<D>().map(|d| *d).map_err(|_| {
        HazelcastError::Serialization(format!(
            "object of factory {} class {} is not a {}",
            factory_id,
            class_id,
            std::any::type_name::<D>()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_FACTORY_ID: i32 = 1000;
    const TEST_CLASS_ID: i32 = 1;

    #[derive(Debug, Default, PartialEq)]
    struct TestData {
        value: i32,
        name: String,
    }

    impl IdentifiedDataSerializable for TestData {
        fn factory_id(&self) -> i32 {
            TEST_FACTORY_ID
        }

        fn class_id(&self) -> i32 {
            TEST_CLASS_ID
        }

        fn write_data(&self, output: &mut ObjectDataOutput<'_>) -> Result<()> {
            output.write_int(self.value)?;
            output.write_string(&self.name)
        }

        fn read_data(&mut self, input: &mut ObjectDataInput<'_>) -> Result<()> {
            self.value = input.read_int()?;
            self.name = input.read_string()?;
            Ok(())
        }
    }

    struct TestFactory;

    impl DataSerializableFactory for TestFactory {
        fn create(&self, class_id: i32) -> Option<Box<dyn IdentifiedDataSerializable>> {
            match class_id {
                TEST_CLASS_ID => Some(Box::new(TestData::default())),
                _ => None,
            }
        }
    }

    fn registry() -> FactoryRegistry {
        let mut registry = FactoryRegistry::new();
        registry.register(TEST_FACTORY_ID, Arc::new(TestFactory));
        registry
    }

    #[test]
    fn test_type_id_constant() {
        assert_eq!(IDENTIFIED_DATA_SERIALIZABLE_TYPE_ID, -2);
        assert_eq!(TypeSerializer::type_id(&DataSerializer::default()), -2);
    }

    #[test]
    fn test_write_and_read_data() {
        let original = TestData {
            value: 42,
            name: String::from("hello"),
        };

        let mut output = ObjectDataOutput::new();
        original.write_data(&mut output).unwrap();

        let bytes = output.as_bytes();
        let mut input = ObjectDataInput::new(bytes);

        let mut restored = TestData::default();
        restored.read_data(&mut input).unwrap();

        assert_eq!(original, restored);
    }

    #[test]
    fn test_factory_registry_new() {
        let registry = FactoryRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_factory_registry_register() {
        let registry = registry();
        assert!(!registry.is_empty());
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(TEST_FACTORY_ID));
        assert!(registry.get(TEST_FACTORY_ID).is_some());
        assert!(registry.get(9999).is_none());
    }

    #[test]
    fn test_factory_registry_create() {
        let registry = registry();
        let instance = registry.create(TEST_FACTORY_ID, TEST_CLASS_ID).unwrap();
        assert_eq!(instance.factory_id(), TEST_FACTORY_ID);
        assert_eq!(instance.class_id(), TEST_CLASS_ID);
        assert!(registry.create(TEST_FACTORY_ID, 9999).is_none());
        assert!(FactoryRegistry::new()
            .create(TEST_FACTORY_ID, TEST_CLASS_ID)
            .is_none());
    }

    #[test]
    fn test_factory_registry_unregister() {
        let mut registry = registry();
        assert!(registry.unregister(TEST_FACTORY_ID).is_some());
        assert!(registry.is_empty());
        assert!(registry.unregister(TEST_FACTORY_ID).is_none());
    }

    #[test]
    fn test_closure_factory() {
        let mut registry = FactoryRegistry::new();
        registry.register(
            7,
            Arc::new(|class_id: i32| -> Option<Box<dyn IdentifiedDataSerializable>> {
                (class_id == TEST_CLASS_ID)
                    .then(|| Box::new(TestData::default()) as Box<dyn IdentifiedDataSerializable>)
            }),
        );
        assert!(registry.create(7, TEST_CLASS_ID).is_some());
        assert!(registry.create(7, 2).is_none());
    }

    #[test]
    fn test_serializer_wire_form() {
        let codec = DataSerializer::new(registry());
        let value = Value::data_serializable(TestData {
            value: 5,
            name: "x".to_string(),
        });

        let mut output = ObjectDataOutput::new();
        codec.write(&mut output, &value).unwrap();
        let bytes = output.into_bytes();
        assert_eq!(&bytes[..8], &[0, 0, 0x03, 0xE8, 0, 0, 0, 1]);

        let mut input = ObjectDataInput::new(&bytes);
        let decoded = codec.read(&mut input).unwrap();
        let restored = decoded.downcast_data_serializable::<TestData>().unwrap();
        assert_eq!(restored.value, 5);
        assert_eq!(restored.name, "x");
    }

    #[test]
    fn test_serializer_unknown_class() {
        let codec = DataSerializer::new(registry());
        let mut output = ObjectDataOutput::new();
        output.write_int(TEST_FACTORY_ID).unwrap();
        output.write_int(77).unwrap();
        let bytes = output.into_bytes();
        let mut input = ObjectDataInput::new(&bytes);
        assert!(matches!(
            codec.read(&mut input),
            Err(HazelcastError::Serialization(_))
        ));
    }

    #[test]
    fn test_downcast() {
        let boxed: Box<dyn IdentifiedDataSerializable> = Box::new(TestData {
            value: 1,
            name: String::new(),
        });
        let data: TestData = downcast_data_serializable(boxed).unwrap();
        assert_eq!(data.value, 1);
    }
}
