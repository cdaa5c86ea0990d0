//! Document model

use serde::{Deserialize, Serialize};

use super::{Action, Resource, RevisionId};

/// Logical unit of record in the replicated store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Resource payload
    pub resource: Resource,
    /// Current revision; `None` until the document was first stored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<RevisionId>,
    /// Provenance, never altered after creation
    pub created: Action,
    /// Modification actions, oldest first
    #[serde(default)]
    pub modified: Vec<Action>,
    /// Revisions written concurrently on other replicas and not yet resolved
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<RevisionId>,
    /// Revisions this one supersedes: its predecessors and the conflicts
    /// resolved along the way
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub superseded: Vec<RevisionId>,
}

impl Document {
    /// Create an unsaved document created by `user` now
    pub fn new(resource: Resource, user: impl Into<String>) -> Self {
        Self::with_created(resource, Action::now(user))
    }

    pub const fn with_created(resource: Resource, created: Action) -> Self {
        Self {
            resource,
            revision: None,
            created,
            modified: Vec::new(),
            conflicts: Vec::new(),
            superseded: Vec::new(),
        }
    }

    /// Latest modification, falling back to creation
    pub fn last_modified(&self) -> &Action {
        self.modified.last().unwrap_or(&self.created)
    }

    /// Timestamp used to order query results (Unix ms)
    pub fn sort_date(&self) -> i64 {
        self.last_modified().date
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// Whether `revision` is superseded by this document's revision
    pub fn supersedes(&self, revision: &RevisionId) -> bool {
        self.superseded.contains(revision)
    }

    /// Append a modification action
    pub fn touch(&mut self, user: impl Into<String>) {
        self.modified.push(Action::now(user));
    }
}
