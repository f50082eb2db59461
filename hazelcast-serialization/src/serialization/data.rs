//! The immutable envelope produced by encoding.

use super::portable::ClassDefinition;
use bytes::Bytes;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Encoded form of a value: the serializer's type id and the written bytes.
///
/// Portable payloads also reference the class definition they were encoded
/// with. Equality and hashing consider only the type id and the bytes.
#[derive(Debug, Clone)]
pub struct Data {
    type_id: i32,
    buffer: Bytes,
    class_definition: Option<Arc<ClassDefinition>>,
    partition_hash: Option<i32>,
}

impl Data {
    /// Creates an envelope without class definition or partition hash.
    pub fn new(type_id: i32, buffer: impl Into<Bytes>) -> Self {
        Self {
            type_id,
            buffer: buffer.into(),
            class_definition: None,
            partition_hash: None,
        }
    }

    /// Attaches the class definition the payload was encoded with.
    pub fn with_class_definition(mut self, class_definition: Arc<ClassDefinition>) -> Self {
        self.class_definition = Some(class_definition);
        self
    }

    /// Attaches an explicit partition hash.
    pub fn with_partition_hash(mut self, partition_hash: i32) -> Self {
        self.partition_hash = Some(partition_hash);
        self
    }

    /// Returns the type id of the serializer that wrote the payload.
    pub fn type_id(&self) -> i32 {
        self.type_id
    }

    /// Returns the payload.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Returns a shared handle to the payload.
    pub fn bytes(&self) -> Bytes {
        self.buffer.clone()
    }

    /// Returns the payload length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Returns the class definition of a Portable payload.
    pub fn class_definition(&self) -> Option<&Arc<ClassDefinition>> {
        self.class_definition.as_ref()
    }

    /// Returns the partition hash set at encode time, if any.
    pub fn explicit_partition_hash(&self) -> Option<i32> {
        self.partition_hash
    }

    /// Returns the partition hash: the explicit one if set, otherwise a hash
    /// of the payload bytes.
    pub fn partition_hash(&self) -> i32 {
        self.partition_hash
            .unwrap_or_else(|| payload_hash(&self.buffer))
    }
}

/// `31 * h + b` over the signed payload bytes, starting at 1.
fn payload_hash(buffer: &[u8]) -> i32 {
    buffer
        .iter()
        .fold(1i32, |h, &b| h.wrapping_mul(31).wrapping_add(i32::from(b as i8)))
}

impl PartialEq for Data {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.buffer == other.buffer
    }
}

impl Eq for Data {}

impl Hash for Data {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.buffer.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let data = Data::new(-7, vec![0, 0, 0, 42]);
        assert_eq!(data.type_id(), -7);
        assert_eq!(data.buffer(), &[0, 0, 0, 42]);
        assert_eq!(data.len(), 4);
        assert!(!data.is_empty());
        assert!(data.class_definition().is_none());
        assert!(data.explicit_partition_hash().is_none());
    }

    #[test]
    fn test_equality_ignores_metadata() {
        let plain = Data::new(-1, vec![1, 2, 3]);
        let decorated = Data::new(-1, vec![1, 2, 3])
            .with_partition_hash(99)
            .with_class_definition(Arc::new(ClassDefinition::new(1, 0)));
        assert_eq!(plain, decorated);
        assert_ne!(plain, Data::new(-2, vec![1, 2, 3]));
    }

    #[test]
    fn test_payload_hash() {
        assert_eq!(Data::new(0, Vec::new()).partition_hash(), 1);
        assert_eq!(Data::new(0, vec![1]).partition_hash(), 32);
        assert_eq!(Data::new(0, vec![0xFF]).partition_hash(), 30);
    }

    #[test]
    fn test_explicit_partition_hash_wins() {
        let data = Data::new(0, vec![1, 2]).with_partition_hash(-5);
        assert_eq!(data.partition_hash(), -5);
        assert_eq!(data.explicit_partition_hash(), Some(-5));
    }

    #[test]
    fn test_clone_shares_payload() {
        let data = Data::new(-12, vec![9; 64]);
        let copy = data.clone();
        assert_eq!(data.bytes().as_ptr(), copy.bytes().as_ptr());
    }
}
