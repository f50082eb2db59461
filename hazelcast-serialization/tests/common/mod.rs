//! Shared fixtures for the serialization integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hazelcast_serialization::serialization::{
    DataInput, DataOutput, IdentifiedDataSerializable, ObjectDataInput, ObjectDataOutput,
    Portable, PortableReader, PortableReaderExt, PortableWriter, TypeKey, TypeSerializer,
    TypedObject, Value,
};
use hazelcast_serialization::{HazelcastError, Result, SerializationConfig, SerializationService};

pub const PERSON_CLASS_ID: i32 = 1;
pub const ADDRESS_CLASS_ID: i32 = 2;
pub const EMPLOYEE_FACTORY_ID: i32 = 7;
pub const EMPLOYEE_CLASS_ID: i32 = 1;
pub const POINT_TYPE_ID: i32 = 10;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Address {
    pub city: String,
    pub zip: i32,
}

impl Portable for Address {
    fn class_id(&self) -> i32 {
        ADDRESS_CLASS_ID
    }

    fn write_portable(&self, writer: &mut dyn PortableWriter) -> Result<()> {
        writer.write_string("city", Some(&self.city))?;
        writer.write_int("zip", self.zip)
    }

    fn read_portable(&mut self, reader: &mut dyn PortableReader) -> Result<()> {
        self.city = reader.read_string("city")?.unwrap_or_default();
        self.zip = reader.read_int("zip")?;
        Ok(())
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Person {
    pub name: String,
    pub age: i32,
    pub scores: Vec<i64>,
    pub address: Option<Address>,
}

impl Portable for Person {
    fn class_id(&self) -> i32 {
        PERSON_CLASS_ID
    }

    fn write_portable(&self, writer: &mut dyn PortableWriter) -> Result<()> {
        writer.write_string("name", Some(&self.name))?;
        writer.write_int("age", self.age)?;
        writer.write_long_array("scores", Some(&self.scores))?;
        match &self.address {
            Some(address) => writer.write_portable("address", Some(address)),
            None => writer.write_null_portable("address", ADDRESS_CLASS_ID),
        }
    }

    fn read_portable(&mut self, reader: &mut dyn PortableReader) -> Result<()> {
        self.name = reader.read_string("name")?.unwrap_or_default();
        self.age = reader.read_int("age")?;
        self.scores = reader.read_long_array("scores")?.unwrap_or_default();
        self.address = reader.read_portable_as::<Address>("address")?;
        Ok(())
    }
}

pub fn create_portable(class_id: i32) -> Option<Box<dyn Portable>> {
    match class_id {
        PERSON_CLASS_ID => Some(Box::new(Person::default())),
        ADDRESS_CLASS_ID => Some(Box::new(Address::default())),
        _ => None,
    }
}

pub fn ada() -> Person {
    Person {
        name: "Ada".to_string(),
        age: 36,
        scores: vec![3, 1, 4],
        address: Some(Address {
            city: "London".to_string(),
            zip: 1815,
        }),
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Employee {
    pub id: i64,
    pub name: String,
    pub active: bool,
}

impl IdentifiedDataSerializable for Employee {
    fn factory_id(&self) -> i32 {
        EMPLOYEE_FACTORY_ID
    }

    fn class_id(&self) -> i32 {
        EMPLOYEE_CLASS_ID
    }

    fn write_data(&self, output: &mut ObjectDataOutput<'_>) -> Result<()> {
        output.write_long(self.id)?;
        output.write_string(&self.name)?;
        output.write_bool(self.active)
    }

    fn read_data(&mut self, input: &mut ObjectDataInput<'_>) -> Result<()> {
        self.id = input.read_long()?;
        self.name = input.read_string()?;
        self.active = input.read_bool()?;
        Ok(())
    }
}

pub fn create_employee(class_id: i32) -> Option<Box<dyn IdentifiedDataSerializable>> {
    match class_id {
        EMPLOYEE_CLASS_ID => Some(Box::new(Employee::default())),
        _ => None,
    }
}

/// A user type with a hand-written codec.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const TYPE: TypeKey = TypeKey::from_static("geometry.Point");
}

impl TypedObject for Point {
    fn type_key(&self) -> TypeKey {
        Self::TYPE
    }
}

#[derive(Debug, Default)]
pub struct PointSerializer {
    pub destroyed: AtomicUsize,
}

impl TypeSerializer for PointSerializer {
    fn type_id(&self) -> i32 {
        POINT_TYPE_ID
    }

    fn write(&self, output: &mut ObjectDataOutput<'_>, value: &Value) -> Result<()> {
        let point = value
            .downcast_object::<Point>()
            .ok_or_else(|| HazelcastError::Serialization(format!("not a point: {:?}", value)))?;
        output.write_int(point.x)?;
        output.write_int(point.y)
    }

    fn read(&self, input: &mut ObjectDataInput<'_>) -> Result<Value> {
        let x = input.read_int()?;
        let y = input.read_int()?;
        Ok(Value::object(Point { x, y }))
    }

    fn destroy(&self) {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
    }
}

/// A codec that writes a few bytes and then fails.
#[derive(Debug)]
pub struct FailingSerializer {
    pub type_id: i32,
}

impl TypeSerializer for FailingSerializer {
    fn type_id(&self) -> i32 {
        self.type_id
    }

    fn write(&self, output: &mut ObjectDataOutput<'_>, _value: &Value) -> Result<()> {
        output.write_long(-1)?;
        Err(HazelcastError::Serialization("refusing to encode".to_string()))
    }

    fn read(&self, _input: &mut ObjectDataInput<'_>) -> Result<Value> {
        Err(HazelcastError::Serialization("refusing to decode".to_string()))
    }
}

pub fn config() -> SerializationConfig {
    SerializationConfig::builder()
        .portable_factory(create_portable)
        .add_data_serializable_factory(EMPLOYEE_FACTORY_ID, create_employee)
        .build()
        .expect("failed to build config")
}

pub fn service() -> SerializationService {
    SerializationService::new(config())
}

pub fn service_with_points() -> (SerializationService, Arc<PointSerializer>) {
    let service = service();
    let codec = Arc::new(PointSerializer::default());
    service
        .register(Point::TYPE, codec.clone())
        .expect("failed to register point codec");
    (service, codec)
}
