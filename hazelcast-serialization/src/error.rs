//! Error types for serialization operations.

use std::io;
use thiserror::Error;

/// The main error type for serialization operations.
#[derive(Debug, Error)]
pub enum HazelcastError {
    /// No serializer (and no fallback) resolves for the runtime type.
    #[error("not serializable: {0}")]
    NotSerializable(String),

    /// No serializer is bound to the type id carried by an envelope.
    #[error("unknown type id: {0}")]
    UnknownType(i32),

    /// A type or type id is already bound to a different serializer.
    #[error("registration conflict: {0}")]
    RegistrationConflict(String),

    /// Class definition compression, decompression or lookup failed.
    #[error("schema failure: {0}")]
    SchemaFailure(String),

    /// Any other failure while encoding or decoding.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The caller passed an argument the API does not accept.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration errors (invalid settings).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Memory could not be reserved while encoding or decoding.
    ///
    /// This is a critical condition. The service routes it to its
    /// [`OutOfMemoryHandler`](crate::config::OutOfMemoryHandler) and never
    /// wraps it into another variant.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// I/O errors from the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl HazelcastError {
    /// Returns true if the failed operation may succeed when repeated.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::ResourceExhausted(_) | Self::InvalidArgument(_) | Self::Configuration(_)
        )
    }

    /// Returns true if this is the critical resource-exhaustion signal.
    pub fn is_critical(&self) -> bool {
        matches!(self, Self::ResourceExhausted(_))
    }
}

/// A specialized `Result` type for serialization operations.
pub type Result<T> = std::result::Result<T, HazelcastError>;
