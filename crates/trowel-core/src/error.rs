//! Error types for trowel-core

use thiserror::Error;

/// Result type alias using trowel-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in trowel-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Document not found
    #[error("Document not found: {0}")]
    NotFound(String),

    /// Historical revision not found
    #[error("Revision not found: {id}@{revision}")]
    RevisionNotFound { id: String, revision: String },

    /// Conditional write rejected because the stored revision moved on
    #[error("Save conflict on {id}: expected revision {expected}, found {actual}")]
    SaveConflict {
        id: String,
        expected: String,
        actual: String,
    },

    /// A single index range lookup failed
    #[error("Index lookup failed on {index}: {reason}")]
    IndexLookup { index: String, reason: String },

    /// Document with this id already exists
    #[error("Document already exists: {0}")]
    AlreadyExists(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether the error is a missing document or revision.
    ///
    /// These are recoverable: callers report them and carry on with sibling items.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::RevisionNotFound { .. })
    }
}
