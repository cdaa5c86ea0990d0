//! Index entry derivation
//!
//! Every document contributes a handful of entries to named indexes. Both
//! datastores store exactly what this builder emits, so index semantics are
//! defined in one place.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::ProjectConfig;
use crate::models::{Document, Relations, ResourceId};

use super::{IndexItem, IndexKey};

/// `[identifier]`
pub const IDENTIFIER_INDEX: &str = "identifier";
/// `[category]`
pub const CATEGORY_INDEX: &str = "category";
/// `[ancestor id]`, one entry per ancestor along the hierarchy relations
pub const DESCENDANTS_INDEX: &str = "descendants";
/// `[category, token]` and `["", token]`
pub const FULLTEXT_INDEX: &str = "fulltext";

const CONTAIN_SUFFIX: &str = ":contain";

static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}_\-.]+").expect("Invalid regex"));

/// One row of a named index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub index: String,
    pub key: IndexKey,
    pub item: IndexItem,
}

/// Derives index entries from documents according to the project configuration
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    relations: Vec<String>,
    hierarchy_relations: Vec<String>,
    fulltext_fields: Vec<String>,
}

impl IndexBuilder {
    pub fn new(config: &ProjectConfig) -> Self {
        Self {
            relations: config.relations.clone(),
            hierarchy_relations: config.hierarchy_relations.clone(),
            fulltext_fields: config.fulltext_fields.clone(),
        }
    }

    /// Name of the constraint index over a relation's targets
    pub fn contain_index(relation: &str) -> String {
        format!("{relation}{CONTAIN_SUFFIX}")
    }

    /// Whether a constraint index with this name is maintained
    pub fn has_index(&self, name: &str) -> bool {
        match name {
            IDENTIFIER_INDEX | CATEGORY_INDEX | DESCENDANTS_INDEX | FULLTEXT_INDEX => true,
            _ => name
                .strip_suffix(CONTAIN_SUFFIX)
                .is_some_and(|relation| self.relations.iter().any(|r| r == relation)),
        }
    }

    /// Whether `constraint` names the contain index of a hierarchy relation
    pub fn is_hierarchy_constraint(&self, constraint: &str) -> bool {
        constraint
            .strip_suffix(CONTAIN_SUFFIX)
            .is_some_and(|relation| self.hierarchy_relations.iter().any(|r| r == relation))
    }

    /// Ancestors of `relations` along the hierarchy relations, nearest first.
    ///
    /// `lookup` resolves the relations of another resource; unknown targets
    /// still count as ancestors but end their branch. Cycles are cut.
    pub fn ancestors(
        &self,
        own_id: &ResourceId,
        relations: &Relations,
        mut lookup: impl FnMut(&ResourceId) -> Option<Relations>,
    ) -> Vec<ResourceId> {
        let mut seen = HashSet::from([own_id.clone()]);
        let mut ancestors = Vec::new();
        let mut frontier = self.parents(relations);

        while !frontier.is_empty() {
            let mut next = Vec::new();
            for parent in frontier {
                if !seen.insert(parent.clone()) {
                    continue;
                }
                if let Some(parent_relations) = lookup(&parent) {
                    next.extend(self.parents(&parent_relations));
                }
                ancestors.push(parent);
            }
            frontier = next;
        }
        ancestors
    }

    /// Whether the hierarchy relations differ between two relation maps
    pub fn hierarchy_changed(&self, old: &Relations, new: &Relations) -> bool {
        self.hierarchy_relations
            .iter()
            .any(|relation| old.get(relation) != new.get(relation))
    }

    fn parents(&self, relations: &Relations) -> Vec<ResourceId> {
        self.hierarchy_relations
            .iter()
            .filter_map(|relation| relations.get(relation))
            .flatten()
            .cloned()
            .collect()
    }

    /// All index entries of `document` given its resolved ancestors
    pub fn entries(&self, document: &Document, ancestors: &[ResourceId]) -> Vec<IndexEntry> {
        let resource = &document.resource;
        let item = IndexItem::new(resource.id.clone(), document.sort_date());
        let entry = |index: &str, key: IndexKey| IndexEntry {
            index: index.to_string(),
            key,
            item: item.clone(),
        };

        let mut entries = vec![
            entry(IDENTIFIER_INDEX, IndexKey::from_strs(&[resource.identifier.as_str()])),
            entry(CATEGORY_INDEX, IndexKey::from_strs(&[resource.category.as_str()])),
        ];

        for relation in &self.relations {
            let Some(targets) = resource.relations.get(relation) else {
                continue;
            };
            let index = Self::contain_index(relation);
            let mut seen = HashSet::new();
            for target in targets.iter().filter(|target| seen.insert(*target)) {
                entries.push(entry(&index, IndexKey::from_strs(&[target.as_str()])));
            }
        }

        for ancestor in ancestors {
            entries.push(entry(
                DESCENDANTS_INDEX,
                IndexKey::from_strs(&[ancestor.as_str()]),
            ));
        }

        for token in self.fulltext_tokens(document) {
            entries.push(entry(
                FULLTEXT_INDEX,
                IndexKey::from_strs(&[resource.category.as_str(), token.as_str()]),
            ));
            entries.push(entry(FULLTEXT_INDEX, IndexKey::from_strs(&["", token.as_str()])));
        }

        entries
    }

    fn fulltext_tokens(&self, document: &Document) -> Vec<String> {
        let resource = &document.resource;
        let mut seen = HashSet::new();
        let mut tokens = Vec::new();

        let whole_identifier = resource.identifier.trim().to_lowercase();
        let texts = std::iter::once(resource.identifier.as_str()).chain(
            self.fulltext_fields
                .iter()
                .filter_map(|field| resource.field(field))
                .filter_map(|value| value.as_text()),
        );

        for token in std::iter::once(whole_identifier).chain(texts.flat_map(tokenize)) {
            if !token.is_empty() && seen.insert(token.clone()) {
                tokens.push(token);
            }
        }
        tokens
    }
}

/// Lowercase word tokens of `text`
pub fn tokenize(text: &str) -> Vec<String> {
    TOKEN_PATTERN
        .find_iter(text)
        .map(|token| token.as_str().to_lowercase())
        .collect()
}
