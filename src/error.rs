//! Error types for the archive writer.

use thiserror::Error;

/// Main error type for archive and index operations.
#[derive(Debug, Error)]
pub enum WarcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Header {name} contains CR or LF: {value:?}")]
    InvalidHeader { name: &'static str, value: String },

    #[error("Duplicate header: {0}")]
    DuplicateHeader(&'static str),

    #[error("No warcinfo record has been written to this archive")]
    WarcinfoMissing,

    #[error("Body length mismatch: declared {declared}, got {got}")]
    BodyLength { declared: u64, got: u64 },

    #[error("Archive file is locked by another writer")]
    Locked,

    #[error("Writer pipeline is closed or has already failed")]
    PipelineClosed,

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for WarcError {
    fn from(e: serde_json::Error) -> Self {
        WarcError::Serialization(e.to_string())
    }
}

/// Result type for archive operations.
pub type Result<T> = std::result::Result<T, WarcError>;
