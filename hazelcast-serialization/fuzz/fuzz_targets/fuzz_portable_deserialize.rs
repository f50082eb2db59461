#![no_main]

use libfuzzer_sys::fuzz_target;

use hazelcast_serialization::serialization::{
    ClassDefinition, Data, FieldType, Portable, PortableReader, PortableWriter, PORTABLE_TYPE_ID,
};
use hazelcast_serialization::{Result, SerializationConfig, SerializationService};

#[derive(Debug, Default)]
struct FuzzPortable {
    byte_val: i8,
    bool_val: bool,
    short_val: i16,
    int_val: i32,
    long_val: i64,
    float_val: f32,
    double_val: f64,
    string_val: Option<String>,
    ints: Option<Vec<i32>>,
}

impl Portable for FuzzPortable {
    fn class_id(&self) -> i32 {
        1
    }

    fn write_portable(&self, writer: &mut dyn PortableWriter) -> Result<()> {
        writer.write_byte("byte", self.byte_val)?;
        writer.write_bool("bool", self.bool_val)?;
        writer.write_short("short", self.short_val)?;
        writer.write_int("int", self.int_val)?;
        writer.write_long("long", self.long_val)?;
        writer.write_float("float", self.float_val)?;
        writer.write_double("double", self.double_val)?;
        writer.write_string("string", self.string_val.as_deref())?;
        writer.write_int_array("ints", self.ints.as_deref())
    }

    fn read_portable(&mut self, reader: &mut dyn PortableReader) -> Result<()> {
        self.byte_val = reader.read_byte("byte")?;
        self.bool_val = reader.read_bool("bool")?;
        self.short_val = reader.read_short("short")?;
        self.int_val = reader.read_int("int")?;
        self.long_val = reader.read_long("long")?;
        self.float_val = reader.read_float("float")?;
        self.double_val = reader.read_double("double")?;
        self.string_val = reader.read_string("string")?;
        self.ints = reader.read_int_array("ints")?;
        Ok(())
    }
}

fn create(class_id: i32) -> Option<Box<dyn Portable>> {
    match class_id {
        1 => Some(Box::new(FuzzPortable::default())),
        _ => None,
    }
}

fn class_definition() -> Result<ClassDefinition> {
    let mut builder = ClassDefinition::builder(1, 0);
    builder
        .add_field("byte", FieldType::Byte)?
        .add_field("bool", FieldType::Bool)?
        .add_field("short", FieldType::Short)?
        .add_field("int", FieldType::Int)?
        .add_field("long", FieldType::Long)?
        .add_field("float", FieldType::Float)?
        .add_field("double", FieldType::Double)?
        .add_field("string", FieldType::Utf8)?
        .add_field("ints", FieldType::IntArray)?;
    builder.build()
}

fuzz_target!(|data: &[u8]| {
    let Ok(config) = SerializationConfig::builder().portable_factory(create).build() else {
        return;
    };
    let service = SerializationService::new(config);
    let Ok(definition) = class_definition() else {
        return;
    };
    if service
        .portable_context()
        .register_class_definition(definition)
        .is_err()
    {
        return;
    }

    let envelope = Data::new(PORTABLE_TYPE_ID, data.to_vec());
    let _ = service.to_object(Some(&envelope));
});
