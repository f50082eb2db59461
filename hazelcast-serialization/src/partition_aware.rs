//! Partition-aware values.
//!
//! A value implementing [`PartitionAware`] names a partition key that differs
//! from the value itself. When such a value is encoded, the envelope carries
//! the partition hash of the encoded key instead of the hash of its own
//! bytes, so related entries hash alike.
//!
//! # Example
//!
//! ```ignore
//! use hazelcast_serialization::{PartitionAware, Value};
//!
//! struct OrderKey {
//!     order_id: String,
//!     customer_id: String,
//! }
//!
//! impl PartitionAware for OrderKey {
//!     fn partition_key(&self) -> Value {
//!         // Route all orders for the same customer to the same partition
//!         Value::String(self.customer_id.clone())
//!     }
//! }
//! ```

use crate::serialization::Value;

/// Trait for values whose partition hash comes from a separate partition key.
pub trait PartitionAware: Send + Sync {
    /// Returns the key whose encoded form determines the partition hash.
    ///
    /// Returning [`Value::Null`] leaves the envelope without an explicit hash.
    fn partition_key(&self) -> Value;
}
