//! trowel-core - Core library for Trowel
//!
//! This crate contains the excavation document model, the index query layer
//! with its result-set algebra, and the conflict detection and resolution
//! protocol used when replicas edit the same document while disconnected.

pub mod config;
pub mod conflict;
pub mod datastore;
pub mod error;
pub mod history;
pub mod import;
pub mod index;
pub mod models;
pub mod services;
pub mod util;

pub use config::ProjectConfig;
pub use error::{Error, Result};
pub use models::{Action, Document, FieldValue, Resource, ResourceId, RevisionId};
