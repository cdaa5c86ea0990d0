//! Replicated document storage
//!
//! A [`Datastore`] keeps the current revision of every document, the revisions
//! it replaced, and the revisions written concurrently on other replicas. It
//! also maintains the named indexes the query executor runs against.

mod changes;
mod memory;
mod revisions;
pub mod sqlite;

pub use changes::{ChangeFeed, ChangeKind, ChangeReceiver, DocumentChange};
pub use memory::MemoryDatastore;
pub use revisions::{prepare_create, prepare_update, reconcile_remote, wins, RemoteApply};
pub use sqlite::SqliteDatastore;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::index::{IndexStore, Query, QueryExecutor};
use crate::models::{Document, ResourceId, RevisionId};

/// Documents matching a query, newest first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FindResult {
    pub documents: Vec<Document>,
    /// Number of matches before the query limit was applied
    pub total: usize,
}

/// Document store collaborator
#[async_trait]
pub trait Datastore: IndexStore {
    /// Current revision of a document
    async fn get(&self, id: &ResourceId) -> Result<Document>;

    /// Any stored revision of a document: current, replaced or conflicting
    async fn get_revision(&self, id: &ResourceId, revision: &RevisionId) -> Result<Document>;

    /// Store a new document under its first revision
    async fn create(&self, document: Document) -> Result<Document>;

    /// Conditional write on `document.revision`.
    ///
    /// Revisions in `resolved_conflicts` are removed from the conflict list in
    /// the same write.
    async fn update(
        &self,
        document: Document,
        resolved_conflicts: &[RevisionId],
    ) -> Result<Document>;

    /// Documents with unresolved conflicting revisions, newest first
    async fn find_conflicted(&self) -> Result<Vec<Document>>;

    /// Receive a revision written on another replica
    async fn apply_remote(&self, document: Document) -> Result<Document>;

    fn subscribe(&self) -> ChangeReceiver;

    /// Run `query` through the index and hydrate the matches.
    ///
    /// Documents that vanish between lookup and hydration are skipped.
    async fn find(&self, query: &Query) -> Result<FindResult> {
        let mut unlimited = query.clone();
        unlimited.limit = None;
        let ids = QueryExecutor::new(self).find_ids(&unlimited).await;
        let total = ids.len();

        let mut documents = Vec::with_capacity(query.limit.unwrap_or(total).min(total));
        for id in ids.into_iter().take(query.limit.unwrap_or(usize::MAX)) {
            match self.get(&id).await {
                Ok(document) => documents.push(document),
                Err(error) if error.is_not_found() => {
                    tracing::warn!(%id, "Indexed document is missing");
                }
                Err(error) => return Err(error),
            }
        }
        Ok(FindResult { documents, total })
    }
}
