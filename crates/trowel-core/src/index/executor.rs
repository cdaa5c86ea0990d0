//! Index query execution
//!
//! Translates a [`Query`] into one range lookup per usable constraint plus an
//! optional full-text lookup, fires them concurrently and intersects the hits.

use futures::future::join_all;

use crate::models::ResourceId;

use super::{
    CombineMode, IndexBuilder, IndexItem, IndexKey, IndexStore, Query, ResultSets,
    DESCENDANTS_INDEX, FULLTEXT_INDEX,
};

/// Upper bound appended to a term for prefix matching; sorts after every
/// scalar value, supplementary planes included
const PREFIX_SUFFIX: char = char::MAX;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Lookup {
    index: String,
    start: IndexKey,
    end: IndexKey,
}

impl Lookup {
    fn exact_value(index: &str, value: &str) -> Self {
        let start = IndexKey::from_strs(&[value]);
        Self {
            index: index.to_string(),
            end: start.clone().push_max(),
            start,
        }
    }
}

/// Stateless executor over an [`IndexStore`]
pub struct QueryExecutor<'a, S: IndexStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: IndexStore + ?Sized> QueryExecutor<'a, S> {
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Matching ids ordered by last modification, newest first
    pub async fn find_ids(&self, query: &Query) -> Vec<ResourceId> {
        self.find_items(query)
            .await
            .into_iter()
            .map(|item| item.id)
            .collect()
    }

    /// Matching index items ordered by last modification, newest first.
    ///
    /// Ties keep the order of the intersection pass.
    pub async fn find_items(&self, query: &Query) -> Vec<IndexItem> {
        let result_sets = self.result_sets(query).await;
        if result_sets.contains_only_empty_add_sets() {
            tracing::debug!("Every lookup of the query came back empty");
        }

        let mut items = result_sets.collapse();
        items.sort_by(|a, b| b.date.cmp(&a.date));
        if let Some(limit) = query.limit {
            items.truncate(limit);
        }
        items
    }

    /// Combined lookups of `query`, one add set per lookup.
    ///
    /// A failed lookup contributes an empty add set, which empties the
    /// whole intersection.
    pub async fn result_sets(&self, query: &Query) -> ResultSets {
        let lookups = self.plan(query);
        tracing::debug!(lookups = lookups.len(), "Executing index query");

        let results = join_all(lookups.iter().map(|lookup| async move {
            match self
                .store
                .query_index(&lookup.index, &lookup.start, &lookup.end)
                .await
            {
                Ok(items) => items,
                Err(error) => {
                    tracing::warn!(
                        index = %lookup.index,
                        %error,
                        "Index lookup failed; treating it as matching nothing"
                    );
                    Vec::new()
                }
            }
        }))
        .await;

        results
            .into_iter()
            .fold(ResultSets::make(), |sets, items| {
                sets.combine(items, CombineMode::Add)
            })
    }

    fn plan(&self, query: &Query) -> Vec<Lookup> {
        let builder = self.store.index_builder();
        let mut lookups = Vec::new();

        for (name, constraint) in &query.constraints {
            if !self.store.has_index(name) {
                tracing::warn!(constraint = %name, "Ignoring unknown constraint");
                continue;
            }
            let index = Self::constraint_index(builder, name, constraint.recurse_to_descendants());
            lookups.push(Lookup::exact_value(index, constraint.value()));
        }

        let has_usable_constraints = !lookups.is_empty();
        if !Self::can_skip_fulltext(query, has_usable_constraints) {
            lookups.push(Self::fulltext_lookup(query));
        }
        lookups
    }

    fn constraint_index<'n>(builder: &IndexBuilder, name: &'n str, recurse: bool) -> &'n str {
        if !recurse {
            return name;
        }
        if builder.is_hierarchy_constraint(name) {
            DESCENDANTS_INDEX
        } else {
            tracing::warn!(
                constraint = %name,
                "Descendant recursion is only available on hierarchy relations; matching direct targets"
            );
            name
        }
    }

    /// With usable constraints, an empty full-text lookup would return every
    /// document, so intersecting with it changes nothing.
    fn can_skip_fulltext(query: &Query, has_usable_constraints: bool) -> bool {
        query.text.trim().is_empty() && query.category.is_none() && has_usable_constraints
    }

    fn fulltext_lookup(query: &Query) -> Lookup {
        let term = query.normalized_text();
        let category = query.category.clone().unwrap_or_default();
        let prefix = !query.exact || term.is_empty();

        let start = IndexKey::from_strs(&[category.as_str(), term.as_str()]);
        let end = if prefix {
            IndexKey::from_strs(&[category, format!("{term}{PREFIX_SUFFIX}")])
        } else {
            IndexKey::from_strs(&[category, term])
        }
        .push_max();

        Lookup {
            index: FULLTEXT_INDEX.to_string(),
            start,
            end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use crate::error::{Error, Result};
    use crate::index::{Constraint, CATEGORY_INDEX};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Canned answers per index, optional failures and artificial latency
    struct FakeStore {
        builder: IndexBuilder,
        answers: HashMap<String, Vec<IndexItem>>,
        failing: Vec<String>,
        delays: HashMap<String, u64>,
        seen: Mutex<Vec<(String, IndexKey, IndexKey)>>,
    }

    impl FakeStore {
        fn new() -> Self {
            Self {
                builder: IndexBuilder::new(&ProjectConfig::default()),
                answers: HashMap::new(),
                failing: Vec::new(),
                delays: HashMap::new(),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn answer(mut self, index: &str, items: &[(&str, i64)]) -> Self {
            self.answers.insert(
                index.to_string(),
                items.iter().map(|(id, date)| IndexItem::new(*id, *date)).collect(),
            );
            self
        }

        fn seen_indexes(&self) -> Vec<String> {
            self.seen
                .lock()
                .unwrap()
                .iter()
                .map(|(index, _, _)| index.clone())
                .collect()
        }
    }

    #[async_trait]
    impl IndexStore for FakeStore {
        fn index_builder(&self) -> &IndexBuilder {
            &self.builder
        }

        async fn query_index(
            &self,
            index: &str,
            start: &IndexKey,
            end: &IndexKey,
        ) -> Result<Vec<IndexItem>> {
            self.seen
                .lock()
                .unwrap()
                .push((index.to_string(), start.clone(), end.clone()));
            if let Some(delay) = self.delays.get(index) {
                tokio::time::sleep(Duration::from_millis(*delay)).await;
            }
            if self.failing.iter().any(|failing| failing == index) {
                return Err(Error::IndexLookup {
                    index: index.to_string(),
                    reason: "boom".to_string(),
                });
            }
            Ok(self.answers.get(index).cloned().unwrap_or_default())
        }
    }

    fn ids(items: &[ResourceId]) -> Vec<&str> {
        items.iter().map(ResourceId::as_str).collect()
    }

    #[tokio::test]
    async fn test_constraint_only_query_skips_fulltext() {
        let store = FakeStore::new().answer(
            CATEGORY_INDEX,
            &[("a", 100), ("b", 300), ("c", 200)],
        );
        let query = Query::default().with_constraint("category", "Find");

        let result = QueryExecutor::new(&store).find_ids(&query).await;

        assert_eq!(ids(&result), vec!["b", "c", "a"]);
        assert_eq!(store.seen_indexes(), vec![CATEGORY_INDEX.to_string()]);
    }

    #[tokio::test]
    async fn test_text_and_constraint_are_intersected() {
        let store = FakeStore::new()
            .answer(CATEGORY_INDEX, &[("a", 1), ("b", 2), ("c", 3)])
            .answer(FULLTEXT_INDEX, &[("c", 3), ("a", 1), ("z", 9)]);
        let query = Query::text("Bo").with_constraint("category", "Find");

        let result = QueryExecutor::new(&store).find_ids(&query).await;

        assert_eq!(ids(&result), vec!["c", "a"]);
        let seen = store.seen.lock().unwrap().clone();
        let (_, start, end) = seen
            .iter()
            .find(|(index, _, _)| index == FULLTEXT_INDEX)
            .unwrap();
        assert_eq!(start, &IndexKey::from_strs(&["", "bo"]));
        assert_eq!(end, &IndexKey::from_strs(&["", "bo\u{10ffff}"]).push_max());
    }

    #[tokio::test]
    async fn test_unknown_constraint_is_dropped() {
        let store = FakeStore::new().answer(FULLTEXT_INDEX, &[("a", 1), ("b", 2)]);
        let query = Query::default().with_constraint("color:contain", "red");

        let result = QueryExecutor::new(&store).find_ids(&query).await;

        assert_eq!(ids(&result), vec!["b", "a"]);
        assert_eq!(store.seen_indexes(), vec![FULLTEXT_INDEX.to_string()]);
    }

    #[tokio::test]
    async fn test_failed_lookup_empties_result() {
        let mut store = FakeStore::new()
            .answer(CATEGORY_INDEX, &[("a", 1)])
            .answer("isRecordedIn:contain", &[("a", 1)]);
        store.failing.push("isRecordedIn:contain".to_string());
        let query = Query::default()
            .with_constraint("category", "Find")
            .with_constraint("isRecordedIn:contain", "t1");

        let executor = QueryExecutor::new(&store);
        assert!(executor.find_ids(&query).await.is_empty());
        assert!(!executor.result_sets(&query).await.contains_only_empty_add_sets());
    }

    #[tokio::test]
    async fn test_recursive_constraint_uses_descendants_index() {
        let store = FakeStore::new().answer(DESCENDANTS_INDEX, &[("deep", 1)]);
        let query = Query::default()
            .with_constraint("liesWithin:contain", Constraint::descendants_of("t1"));

        let result = QueryExecutor::new(&store).find_ids(&query).await;

        assert_eq!(ids(&result), vec!["deep"]);
        assert_eq!(store.seen_indexes(), vec![DESCENDANTS_INDEX.to_string()]);
    }

    #[tokio::test]
    async fn test_recursion_on_flat_relation_falls_back_to_direct_index() {
        let store = FakeStore::new().answer("isAfter:contain", &[("x", 1)]);
        let query =
            Query::default().with_constraint("isAfter:contain", Constraint::descendants_of("y"));

        let result = QueryExecutor::new(&store).find_ids(&query).await;

        assert_eq!(ids(&result), vec!["x"]);
        assert_eq!(store.seen_indexes(), vec!["isAfter:contain".to_string()]);
    }

    #[tokio::test]
    async fn test_exact_term_and_category_filter() {
        let store = FakeStore::new().answer(FULLTEXT_INDEX, &[("a", 1)]);
        let query = Query::text("Bowl").with_category("Find").exact();

        QueryExecutor::new(&store).find_ids(&query).await;

        let seen = store.seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![(
                FULLTEXT_INDEX.to_string(),
                IndexKey::from_strs(&["Find", "bowl"]),
                IndexKey::from_strs(&["Find", "bowl"]).push_max(),
            )]
        );
    }

    #[tokio::test]
    async fn test_order_does_not_depend_on_completion_order() {
        let mut store = FakeStore::new()
            .answer(CATEGORY_INDEX, &[("a", 5), ("b", 5), ("c", 5)])
            .answer("isRecordedIn:contain", &[("c", 5), ("b", 5), ("a", 5)]);
        store.delays.insert(CATEGORY_INDEX.to_string(), 30);
        let query = Query::default()
            .with_constraint("category", "Find")
            .with_constraint("isRecordedIn:contain", "t1");

        let result = QueryExecutor::new(&store).find_ids(&query).await;

        // constraints are planned in name order, so the category hits drive the order
        assert_eq!(ids(&result), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_limit_applies_after_sort() {
        let store = FakeStore::new().answer(FULLTEXT_INDEX, &[("a", 1), ("b", 3), ("c", 2)]);
        let query = Query::default().with_limit(2);

        let result = QueryExecutor::new(&store).find_ids(&query).await;

        assert_eq!(ids(&result), vec!["b", "c"]);
    }
}
