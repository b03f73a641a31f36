use std::path::PathBuf;

use thiserror::Error;

use crate::records::MetadataKind;

#[derive(Debug, Error)]
pub enum EvidexError {
    /// A line of a dataset file could not be decoded into a record.
    #[error("Decode error at {location}: {message}")]
    Decode { location: String, message: String },

    #[error("Missing field `{field}` at {location}")]
    MissingField { location: String, field: String },

    #[error("Dataset not found: {0}")]
    DatasetNotFound(PathBuf),

    /// Two metadata records share an id.
    #[error("Duplicate {kind} id in metadata: {id}")]
    DuplicateKey { kind: MetadataKind, id: String },

    /// A parallel work unit failed; partial results of its siblings are discarded.
    #[error("Worker failure: {0}")]
    WorkerFailure(String),

    #[error("Invalid pipeline transition: cannot go from {from} to {to}")]
    InvalidTransition { from: &'static str, to: &'static str },

    #[error("File transfer error: {0}")]
    Transfer(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EvidexError>;
