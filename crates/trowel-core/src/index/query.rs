//! Structured query

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Value a constraint index must match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Constraint {
    Value(String),
    Scoped {
        value: String,
        /// Match anything below `value` in the hierarchy, not only direct children
        #[serde(default)]
        recurse_to_descendants: bool,
    },
}

impl Constraint {
    pub fn descendants_of(value: impl Into<String>) -> Self {
        Self::Scoped {
            value: value.into(),
            recurse_to_descendants: true,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Self::Value(value) | Self::Scoped { value, .. } => value,
        }
    }

    pub const fn recurse_to_descendants(&self) -> bool {
        matches!(
            self,
            Self::Scoped {
                recurse_to_descendants: true,
                ..
            }
        )
    }
}

impl From<&str> for Constraint {
    fn from(value: &str) -> Self {
        Self::Value(value.to_string())
    }
}

impl From<String> for Constraint {
    fn from(value: String) -> Self {
        Self::Value(value)
    }
}

/// Free-text term, optional category filter and named constraints
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Free-text term, may be empty
    #[serde(default)]
    pub text: String,
    /// Restrict the full-text lookup to one category
    #[serde(default)]
    pub category: Option<String>,
    /// Constraint index name -> value
    #[serde(default)]
    pub constraints: BTreeMap<String, Constraint>,
    /// Match the full-text term exactly instead of as a prefix
    #[serde(default)]
    pub exact: bool,
    /// Truncate the sorted result
    #[serde(default)]
    pub limit: Option<usize>,
}

impl Query {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn with_constraint(
        mut self,
        name: impl Into<String>,
        constraint: impl Into<Constraint>,
    ) -> Self {
        self.constraints.insert(name.into(), constraint.into());
        self
    }

    #[must_use]
    pub const fn exact(mut self) -> Self {
        self.exact = true;
        self
    }

    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Lowercased, trimmed free-text term
    pub fn normalized_text(&self) -> String {
        self.text.trim().to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_deserializes_from_string_or_object() {
        let query: Query = serde_json::from_str(
            r#"{"constraints": {"category": "Find", "liesWithin:contain": {"value": "t1", "recurse_to_descendants": true}}}"#,
        )
        .unwrap();

        assert_eq!(query.constraints["category"], Constraint::from("Find"));
        let scoped = &query.constraints["liesWithin:contain"];
        assert_eq!(scoped.value(), "t1");
        assert!(scoped.recurse_to_descendants());
        assert!(query.text.is_empty());
        assert!(!query.exact);
    }

    #[test]
    fn test_normalized_text() {
        assert_eq!(Query::text("  Bowl ").normalized_text(), "bowl");
    }
}
