//! Project configuration.
//!
//! A single JSON file tells the core who the acting user is, which relations
//! are indexed and how fields are labelled in conflict diffs. Every key is
//! optional; a missing file means defaults throughout.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::models::{IS_RECORDED_IN, LIES_WITHIN};
use crate::util::normalize_text_option;
use crate::Result;

/// Environment variable naming the configuration file
pub const ENV_CONFIG_PATH: &str = "TROWEL_CONFIG";

const DEFAULT_USER: &str = "anonymous";
const GEOMETRY_LABEL: &str = "Geometry";
const GEOREFERENCE_LABEL: &str = "Georeference";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Actor name written into change-history actions
    pub user: String,
    /// Display labels for fields, keyed by field name
    pub field_labels: BTreeMap<String, String>,
    /// Display labels for relations, keyed by relation name
    pub relation_labels: BTreeMap<String, String>,
    /// Relations that get a `<relation>:contain` constraint index
    pub relations: Vec<String>,
    /// Relations whose transitive closure forms the descendants index
    pub hierarchy_relations: Vec<String>,
    /// Text fields tokenised into the full-text index besides the identifier
    pub fulltext_fields: Vec<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            user: DEFAULT_USER.to_string(),
            field_labels: BTreeMap::new(),
            relation_labels: BTreeMap::new(),
            relations: [
                IS_RECORDED_IN,
                LIES_WITHIN,
                "isAfter",
                "isBefore",
                "isContemporaryWith",
                "depicts",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            hierarchy_relations: vec![LIES_WITHIN.to_string(), IS_RECORDED_IN.to_string()],
            fulltext_fields: vec!["shortDescription".to_string()],
        }
    }
}

impl ProjectConfig {
    /// Load configuration from `path`; a missing file yields defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Configuration path from an explicit value or `TROWEL_CONFIG`
    pub fn resolve_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
        explicit.or_else(|| {
            normalize_text_option(std::env::var(ENV_CONFIG_PATH).ok()).map(PathBuf::from)
        })
    }

    /// Label of a field, falling back to its name
    pub fn field_label(&self, name: &str) -> String {
        match name {
            "geometry" => GEOMETRY_LABEL.to_string(),
            "georeference" => GEOREFERENCE_LABEL.to_string(),
            _ => self
                .field_labels
                .get(name)
                .cloned()
                .unwrap_or_else(|| name.to_string()),
        }
    }

    /// Label of a relation, falling back to its name
    pub fn relation_label(&self, name: &str) -> String {
        self.relation_labels
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }
}
