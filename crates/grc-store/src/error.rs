// error.rs: Error types for the document store.

use thiserror::Error;

/// Errors that can occur while reading or writing documents.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A file I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: String,
        source: std::io::Error,
    },

    /// A stored document could not be serialized or parsed.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Insert hit an existing natural key.
    #[error("{collection} '{key}' already exists")]
    AlreadyExists {
        collection: &'static str,
        key: String,
    },

    /// A natural key cannot be used as a document name.
    #[error("invalid document key '{0}'")]
    InvalidKey(String),

    /// A writer panicked while holding the store lock.
    #[error("store lock poisoned")]
    LockPoisoned,
}
