//! Save flow with conflict detection

use crate::conflict::detect_conflict;
use crate::datastore::Datastore;
use crate::error::Result;
use crate::models::Document;

/// Result of a successful save
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(Document),
    /// Saved, but a concurrent revision landed while saving
    Conflicted(Document),
}

impl SaveOutcome {
    pub const fn document(&self) -> &Document {
        match self {
            Self::Saved(document) | Self::Conflicted(document) => document,
        }
    }

    pub fn into_document(self) -> Document {
        match self {
            Self::Saved(document) | Self::Conflicted(document) => document,
        }
    }

    pub const fn is_conflicted(&self) -> bool {
        matches!(self, Self::Conflicted(_))
    }
}

/// Record a modification by `user` and write `document` conditionally.
///
/// A stale revision fails with [`crate::Error::SaveConflict`]; the caller
/// re-reads and retries or routes to conflict resolution.
pub async fn save_document<D: Datastore + ?Sized>(
    datastore: &D,
    mut document: Document,
    user: &str,
) -> Result<SaveOutcome> {
    document.touch(user);
    let saved = datastore.update(document.clone(), &[]).await?;

    if detect_conflict(&document, &saved) {
        tracing::warn!(
            id = %saved.resource.id,
            conflicts = saved.conflicts.len(),
            "Concurrent revision detected while saving"
        );
        Ok(SaveOutcome::Conflicted(saved))
    } else {
        tracing::debug!(id = %saved.resource.id, "Saved document");
        Ok(SaveOutcome::Saved(saved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastore::MemoryDatastore;
    use crate::error::Error;
    use crate::models::{Action, Resource, RevisionId};
    use pretty_assertions::assert_eq;

    async fn stored(store: &MemoryDatastore) -> Document {
        store
            .create(Document::with_created(
                Resource::with_id("a", "Find 1", "Find"),
                Action::new("alice", 1),
            ))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_plain_save() {
        let store = MemoryDatastore::default();
        let document = stored(&store).await;

        let outcome = save_document(&store, document, "bob").await.unwrap();

        assert!(!outcome.is_conflicted());
        assert_eq!(outcome.document().modified.len(), 1);
        assert_eq!(outcome.document().last_modified().user, "bob");
    }

    #[tokio::test]
    async fn test_conflict_landing_during_save() {
        let store = MemoryDatastore::default();
        let document = stored(&store).await;

        let mut remote = document.clone();
        remote.revision = Some(RevisionId::from("1-0"));
        store.apply_remote(remote).await.unwrap();

        let outcome = save_document(&store, document, "bob").await.unwrap();

        assert!(outcome.is_conflicted());
        assert_eq!(outcome.into_document().conflicts, vec![RevisionId::from("1-0")]);
    }

    #[tokio::test]
    async fn test_known_conflicts_are_not_reported_again() {
        let store = MemoryDatastore::default();
        let document = stored(&store).await;
        let mut remote = document.clone();
        remote.revision = Some(RevisionId::from("1-0"));
        let current = store.apply_remote(remote).await.unwrap();

        let outcome = save_document(&store, current, "bob").await.unwrap();

        assert!(!outcome.is_conflicted());
    }

    #[tokio::test]
    async fn test_stale_save_fails() {
        let store = MemoryDatastore::default();
        let document = stored(&store).await;
        save_document(&store, document.clone(), "bob").await.unwrap();

        let error = save_document(&store, document, "carol").await.unwrap_err();

        assert!(matches!(error, Error::SaveConflict { .. }));
    }
}
