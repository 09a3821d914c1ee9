use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    // IO
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Config
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration file not found at {0}; run `strongbox init` first")]
    ConfigNotFound(String),

    // Crypto
    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Key provider error: {0}")]
    KeyProvider(String),

    // Integrity: AEAD tag rejected or plaintext checksum mismatch
    #[error("Integrity error: {0}")]
    Integrity(String),

    // Lookup
    #[error("Backup not found: {0}")]
    NotFound(String),

    // Input validation (export payloads, config values, duplicate imports)
    #[error("Validation error: {0}")]
    Validation(String),

    // Storage
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    // Serialization
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(String),

    #[error("TOML serialization error: {0}")]
    TomlSer(String),
}

/// Remediation class of an [`ArchiveError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Integrity,
    Validation,
    Storage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::NotFound => write!(f, "not_found"),
            ErrorKind::Integrity => write!(f, "integrity"),
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::Storage => write!(f, "storage"),
        }
    }
}

impl ArchiveError {
    /// Collapse the error into one of the four caller-facing classes.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ArchiveError::NotFound(_) => ErrorKind::NotFound,
            ArchiveError::Integrity(_) => ErrorKind::Integrity,
            ArchiveError::Validation(_)
            | ArchiveError::Config(_)
            | ArchiveError::ConfigNotFound(_)
            | ArchiveError::Serialization(_)
            | ArchiveError::TomlDe(_)
            | ArchiveError::TomlSer(_) => ErrorKind::Validation,
            ArchiveError::Io(_)
            | ArchiveError::Encryption(_)
            | ArchiveError::KeyProvider(_)
            | ArchiveError::Storage(_)
            | ArchiveError::Database(_) => ErrorKind::Storage,
        }
    }
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
