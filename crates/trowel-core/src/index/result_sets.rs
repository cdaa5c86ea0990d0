//! Set algebra over index lookup results

use std::collections::{HashMap, HashSet};

use crate::models::ResourceId;

use super::IndexItem;

/// How a batch of index items enters a [`ResultSets`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CombineMode {
    /// Ids must match together with every other add set
    #[default]
    Add,
    /// Ids are excluded from the result
    Subtract,
}

/// Accumulated index lookups of one query.
///
/// Only obtainable through [`ResultSets::make`]; every [`ResultSets::combine`]
/// returns a new value and leaves the receiver untouched.
#[derive(Debug, Clone, Default)]
pub struct ResultSets {
    add_sets: Vec<Vec<ResourceId>>,
    subtract_sets: Vec<Vec<ResourceId>>,
    map: HashMap<ResourceId, IndexItem>,
}

impl ResultSets {
    /// Empty result sets: no add sets, no subtract sets
    pub fn make() -> Self {
        Self::default()
    }

    /// True iff nothing has been combined yet
    pub fn is_empty(&self) -> bool {
        self.add_sets.is_empty() && self.subtract_sets.is_empty()
    }

    /// True iff at least one add set exists and every add set is empty.
    ///
    /// Separates "constraints applied, nothing matched" from "no constraints".
    pub fn contains_only_empty_add_sets(&self) -> bool {
        !self.add_sets.is_empty() && self.add_sets.iter().all(Vec::is_empty)
    }

    /// Return a copy with `items` appended as a new add or subtract set.
    ///
    /// Items are keyed by their id; a later item for the same id replaces the
    /// stored projection.
    #[must_use]
    pub fn combine(&self, items: impl IntoIterator<Item = IndexItem>, mode: CombineMode) -> Self {
        let mut copy = self.clone();
        let mut ids = Vec::new();
        let mut seen = HashSet::new();

        for item in items {
            if seen.insert(item.id.clone()) {
                ids.push(item.id.clone());
            }
            copy.map.insert(item.id.clone(), item);
        }

        match mode {
            CombineMode::Add => copy.add_sets.push(ids),
            CombineMode::Subtract => copy.subtract_sets.push(ids),
        }
        copy
    }

    /// Ids present in every add set and in no subtract set, hydrated.
    ///
    /// Order follows the first add set. Zero add sets yield nothing.
    pub fn collapse(&self) -> Vec<IndexItem> {
        let excluded: HashSet<&ResourceId> = self.subtract_sets.iter().flatten().collect();

        self.pick(
            Self::intersect(&self.add_sets)
                .into_iter()
                .filter(|id| !excluded.contains(id)),
        )
    }

    /// Union of all add sets in first-seen order, hydrated. Subtract sets are ignored.
    pub fn unify(&self) -> Vec<IndexItem> {
        let mut seen = HashSet::new();
        self.pick(
            self.add_sets
                .iter()
                .flatten()
                .filter(|id| seen.insert(*id)),
        )
    }

    fn intersect(sets: &[Vec<ResourceId>]) -> Vec<&ResourceId> {
        let Some((first, rest)) = sets.split_first() else {
            return Vec::new();
        };
        let rest: Vec<HashSet<&ResourceId>> =
            rest.iter().map(|set| set.iter().collect()).collect();

        first
            .iter()
            .filter(|id| rest.iter().all(|set| set.contains(id)))
            .collect()
    }

    fn pick<'a>(&self, ids: impl Iterator<Item = &'a ResourceId>) -> Vec<IndexItem> {
        ids.filter_map(|id| self.map.get(id).cloned()).collect()
    }
}
