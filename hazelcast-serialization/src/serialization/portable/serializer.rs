//! Portable serialization framework integration.

use super::reader_writer::{read_portable_frame, write_portable_frame};
use super::{ClassDefinition, PortableContext};
use crate::error::{HazelcastError, Result};
use crate::serialization::serializer::TypeSerializer;
use crate::serialization::value::Value;
use crate::serialization::{ObjectDataInput, ObjectDataOutput};
use std::sync::Arc;

/// Type identifier for Portable serialization.
pub const PORTABLE_TYPE_ID: i32 = -1;

/// Serializer for Portable objects.
///
/// Class definitions are resolved through the shared [`PortableContext`]:
/// encoding registers the definition of a class seen for the first time,
/// decoding requires the definition of the incoming class and version.
#[derive(Debug)]
pub struct PortableSerializer {
    context: Arc<PortableContext>,
}

impl PortableSerializer {
    /// Creates a serializer over the given context.
    pub fn new(context: Arc<PortableContext>) -> Self {
        Self { context }
    }

    /// Returns the schema registry this serializer uses.
    pub fn context(&self) -> &Arc<PortableContext> {
        &self.context
    }

    /// Encodes `value` and returns the class definition it was written with.
    pub(crate) fn write_with_definition(
        &self,
        output: &mut ObjectDataOutput<'_>,
        value: &Value,
    ) -> Result<Arc<ClassDefinition>> {
        match value {
            Value::Portable(portable) => write_portable_frame(&self.context, output, portable.as_ref()),
            other => Err(HazelcastError::Serialization(format!(
                "PortableSerializer cannot encode {:?}",
                other
            ))),
        }
    }
}

impl TypeSerializer for PortableSerializer {
    fn type_id(&self) -> i32 {
        PORTABLE_TYPE_ID
    }

    fn write(&self, output: &mut ObjectDataOutput<'_>, value: &Value) -> Result<()> {
        self.write_with_definition(output, value).map(|_| ())
    }

    fn read(&self, input: &mut ObjectDataInput<'_>) -> Result<Value> {
        let portable = read_portable_frame(&self.context, input, 0)?;
        Ok(Value::Portable(Arc::from(portable)))
    }
}
