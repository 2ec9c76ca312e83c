use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShelfError {
    #[error("Storage failure: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Malformed {kind} record: expected {expected} bytes, got {actual}")]
    MalformedRecord {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Slot {index} out of range (record count {record_count})")]
    OutOfRange { index: u32, record_count: u32 },

    #[error("Invalid store header: {0}")]
    InvalidHeader(String),

    #[error("Store file is locked by another handle: {0}")]
    StoreLocked(PathBuf),

    #[error("Identifier space exhausted for prefix '{prefix}'")]
    IdentifiersExhausted { prefix: char },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ShelfError {
    /// Errors a full scan steps over instead of aborting on.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            ShelfError::OutOfRange { .. } | ShelfError::MalformedRecord { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ShelfError>;
