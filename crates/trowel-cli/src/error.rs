use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] trowel_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Input contains no documents")]
    EmptyInput,
    #[error("Document ID cannot be empty")]
    EmptyDocumentId,
    #[error("Invalid constraint '{0}': expected NAME=VALUE")]
    InvalidConstraint(String),
    #[error("--recursive {0} needs a matching --constraint")]
    RecursiveWithoutConstraint(String),
    #[error("Document {0} has no conflicting revisions")]
    NoConflicts(String),
}
