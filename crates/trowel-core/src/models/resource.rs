//! Resource payload of a document

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{FieldValue, ResourceId};

/// Relation placing a record under its operation/trench
pub const IS_RECORDED_IN: &str = "isRecordedIn";

/// Relation placing a record inside a feature or another record
pub const LIES_WITHIN: &str = "liesWithin";

/// Relation name -> ordered target resource ids
pub type Relations = BTreeMap<String, Vec<ResourceId>>;

/// A typed excavation record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Unique identifier, equal to the document id
    pub id: ResourceId,
    /// Human-readable identifier, e.g. `"Find 12"`
    pub identifier: String,
    /// Category (type) name, e.g. `"Find"` or `"Trench"`
    pub category: String,
    /// Free-form field values keyed by field name
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
    /// Relations keyed by relation name
    #[serde(default)]
    pub relations: Relations,
}

impl Resource {
    /// Create a resource with a freshly generated id
    pub fn new(identifier: impl Into<String>, category: impl Into<String>) -> Self {
        Self::with_id(ResourceId::generate(), identifier, category)
    }

    pub fn with_id(
        id: impl Into<ResourceId>,
        identifier: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            identifier: identifier.into(),
            category: category.into(),
            fields: BTreeMap::new(),
            relations: Relations::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_relation(mut self, name: impl Into<String>, targets: &[&str]) -> Self {
        self.relations.insert(
            name.into(),
            targets.iter().map(|target| ResourceId::from(*target)).collect(),
        );
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn relation(&self, name: &str) -> Option<&[ResourceId]> {
        self.relations.get(name).map(Vec::as_slice)
    }
}

/// Incoming resource of an import payload.
///
/// A field mapped to `null` is undefined: it is skipped on merge instead of
/// clearing the existing value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialResource {
    #[serde(default)]
    pub id: Option<ResourceId>,
    pub identifier: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, Option<FieldValue>>,
    #[serde(default)]
    pub relations: Option<Relations>,
}
