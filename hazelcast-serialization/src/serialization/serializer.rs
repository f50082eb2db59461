//! The codec seam of the serialization service.

use super::value::Value;
use super::{ObjectDataInput, ObjectDataOutput};
use crate::error::Result;
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

/// A codec for one family of values, addressed on the wire by its type id.
///
/// Negative type ids are reserved for the built-in codecs.
pub trait TypeSerializer: Send + Sync + fmt::Debug + 'static {
    /// Returns the type id written in front of every value this codec encodes.
    fn type_id(&self) -> i32;

    /// Encodes `value` into `output`.
    fn write(&self, output: &mut ObjectDataOutput<'_>, value: &Value) -> Result<()>;

    /// Decodes one value from `input`.
    fn read(&self, input: &mut ObjectDataInput<'_>) -> Result<Value>;

    /// Releases resources held by the codec. Called once by
    /// [`SerializationService::destroy`](super::SerializationService::destroy).
    fn destroy(&self) {}

    /// Identifies the implementing type. Two codecs are interchangeable in the
    /// registry only if they report the same implementation.
    #[doc(hidden)]
    fn implementation_id(&self) -> TypeId {
        TypeId::of::<Self>()
    }
}

/// Returns true if both handles point to the same codec instance.
pub(crate) fn same_instance(a: &Arc<dyn TypeSerializer>, b: &Arc<dyn TypeSerializer>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Returns true if both codecs are of the same implementing type.
pub(crate) fn same_implementation(a: &dyn TypeSerializer, b: &dyn TypeSerializer) -> bool {
    a.implementation_id() == b.implementation_id()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HazelcastError;

    #[derive(Debug)]
    struct First;

    #[derive(Debug)]
    struct Second;

    impl TypeSerializer for First {
        fn type_id(&self) -> i32 {
            1
        }

        fn write(&self, _output: &mut ObjectDataOutput<'_>, _value: &Value) -> Result<()> {
            Ok(())
        }

        fn read(&self, _input: &mut ObjectDataInput<'_>) -> Result<Value> {
            Ok(Value::Null)
        }
    }

    impl TypeSerializer for Second {
        fn type_id(&self) -> i32 {
            1
        }

        fn write(&self, _output: &mut ObjectDataOutput<'_>, _value: &Value) -> Result<()> {
            Err(HazelcastError::Serialization("unsupported".to_string()))
        }

        fn read(&self, _input: &mut ObjectDataInput<'_>) -> Result<Value> {
            Ok(Value::Null)
        }
    }

    #[test]
    fn test_same_implementation() {
        assert!(same_implementation(&First, &First));
        assert!(!same_implementation(&First, &Second));
    }

    #[test]
    fn test_same_instance() {
        let a: Arc<dyn TypeSerializer> = Arc::new(First);
        let b: Arc<dyn TypeSerializer> = Arc::new(First);
        assert!(same_instance(&a, &Arc::clone(&a)));
        assert!(!same_instance(&a, &b));
    }
}
