// src/error.rs

use thiserror::Error;

/// Core error types for debcheck
#[derive(Error, Debug)]
pub enum Error {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding of stored relation fields
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Database initialization error
    #[error("Failed to initialize database: {0}")]
    InitError(String),

    /// Database not found
    #[error("Database not found at path: {0}")]
    DatabaseNotFound(String),

    /// Malformed control data, relation field or archive
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Version string that cannot be parsed
    #[error("Invalid version '{0}'")]
    InvalidVersion(String),

    /// The database refused to mark a package for installation
    #[error("Cannot install '{0}'")]
    StagingFailed(String),
}

/// Result type alias using debcheck's Error type
pub type Result<T> = std::result::Result<T, Error>;
