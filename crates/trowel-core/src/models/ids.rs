//! Resource and revision identifiers

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use uuid::Uuid;

/// Stable identifier of a resource, immutable once assigned
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    /// Generate a fresh identifier using UUID v7 (time-sortable)
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for ResourceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Opaque revision identifier, replaced on every successful write.
///
/// Generated revisions have the form `<generation>-<uuid>`, so the generation
/// of a revision can be compared without consulting the store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionId(String);

impl RevisionId {
    /// First revision of a new document
    #[must_use]
    pub fn first() -> Self {
        Self::with_generation(1)
    }

    /// Revision that follows this one
    #[must_use]
    pub fn next(&self) -> Self {
        Self::with_generation(self.generation() + 1)
    }

    fn with_generation(generation: u64) -> Self {
        Self(format!("{generation}-{}", Uuid::now_v7().simple()))
    }

    /// Numeric generation prefix; foreign revision ids without one count as 0
    pub fn generation(&self) -> u64 {
        self.0
            .split_once('-')
            .and_then(|(generation, _)| generation.parse().ok())
            .unwrap_or(0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RevisionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RevisionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for RevisionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_id_unique() {
        assert_ne!(ResourceId::generate(), ResourceId::generate());
    }

    #[test]
    fn test_revision_generation_increments() {
        let first = RevisionId::first();
        assert_eq!(first.generation(), 1);
        assert_eq!(first.next().generation(), 2);
        assert_ne!(first.next(), first.next());
    }

    #[test]
    fn test_foreign_revision_has_generation_zero() {
        assert_eq!(RevisionId::from("r1").generation(), 0);
        assert_eq!(RevisionId::from("abc-def").generation(), 0);
    }
}
