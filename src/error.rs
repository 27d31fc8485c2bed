//! Error types for the table store.

use thiserror::Error;

/// Main error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Codec for type '{0}' already registered")]
    DuplicateCodec(String),

    #[error("Object of type {0} is not JSON serializable")]
    NotSerializable(String),

    #[error("Object of type {0} is not JSON deserializable")]
    NotDeserializable(String),

    #[error("Multiple codecs match type {type_name}: {matches:?}")]
    AmbiguousCodec {
        type_name: String,
        matches: Vec<String>,
    },

    #[error("Malformed backing file: {0}")]
    MalformedBackingFile(String),

    #[error("Commit failed: {0}")]
    CommitFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Table '{table}' holds {found}, expected {expected}")]
    TypeMismatch {
        table: String,
        expected: String,
        found: String,
    },
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
