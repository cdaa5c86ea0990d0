use serde::{Deserialize, Serialize};

use crate::models::ResourceId;

/// Read-only projection of a document produced by an index lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexItem {
    pub id: ResourceId,
    /// Last-modified timestamp of the document (Unix ms)
    pub date: i64,
}

impl IndexItem {
    pub fn new(id: impl Into<ResourceId>, date: i64) -> Self {
        Self {
            id: id.into(),
            date,
        }
    }
}
