//! In-memory datastore

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::config::ProjectConfig;
use crate::error::{Error, Result};
use crate::index::{IndexBuilder, IndexItem, IndexKey, IndexStore, DESCENDANTS_INDEX};
use crate::models::{Document, ResourceId, RevisionId};

use super::revisions::{prepare_create, prepare_update, reconcile_remote, RemoteApply};
use super::{ChangeFeed, ChangeKind, ChangeReceiver, Datastore, DocumentChange};

#[derive(Default)]
struct Inner {
    documents: HashMap<ResourceId, Document>,
    /// Replaced and conflicting revisions per document
    revisions: HashMap<ResourceId, HashMap<RevisionId, Document>>,
    /// Index name -> encoded key -> items
    indexes: HashMap<String, BTreeMap<String, Vec<IndexItem>>>,
    /// Keys each document occupies, for removal on reindex
    occupied: HashMap<ResourceId, Vec<(String, String)>>,
}

impl Inner {
    fn archive(&mut self, document: Document) {
        if let Some(revision) = document.revision.clone() {
            self.revisions
                .entry(document.resource.id.clone())
                .or_default()
                .insert(revision, document);
        }
    }

    fn range(&self, index: &str, start: &IndexKey, end: &IndexKey) -> Vec<IndexItem> {
        let (start, end) = (start.encode(), end.encode());
        if start > end {
            return Vec::new();
        }
        self.indexes
            .get(index)
            .map(|keys| {
                keys.range(start..=end)
                    .flat_map(|(_, items)| items.iter().cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn descendants(&self, id: &ResourceId) -> Vec<ResourceId> {
        let start = IndexKey::from_strs(&[id.as_str()]);
        let end = start.clone().push_max();
        self.range(DESCENDANTS_INDEX, &start, &end)
            .into_iter()
            .map(|item| item.id)
            .collect()
    }

    fn unindex(&mut self, id: &ResourceId) {
        for (index, key) in self.occupied.remove(id).unwrap_or_default() {
            if let Some(items) = self.indexes.get_mut(&index).and_then(|keys| keys.get_mut(&key)) {
                items.retain(|item| &item.id != id);
            }
        }
    }

    fn index(&mut self, builder: &IndexBuilder, id: &ResourceId) {
        let Some(document) = self.documents.get(id) else {
            return;
        };
        let ancestors = builder.ancestors(id, &document.resource.relations, |parent| {
            self.documents
                .get(parent)
                .map(|parent| parent.resource.relations.clone())
        });
        let entries = builder.entries(document, &ancestors);

        self.unindex(id);
        let mut occupied = Vec::with_capacity(entries.len());
        for entry in entries {
            let key = entry.key.encode();
            self.indexes
                .entry(entry.index.clone())
                .or_default()
                .entry(key.clone())
                .or_default()
                .push(entry.item);
            occupied.push((entry.index, key));
        }
        self.occupied.insert(id.clone(), occupied);
    }

    /// Make `document` current and refresh the index entries it affects
    fn store(&mut self, builder: &IndexBuilder, document: Document) {
        let id = document.resource.id.clone();
        let hierarchy_changed = self.documents.get(&id).is_none_or(|previous| {
            builder.hierarchy_changed(&previous.resource.relations, &document.resource.relations)
        });
        let descendants = if hierarchy_changed {
            self.descendants(&id)
        } else {
            Vec::new()
        };

        self.documents.insert(id.clone(), document);
        self.index(builder, &id);
        for descendant in &descendants {
            self.index(builder, descendant);
        }
        if !descendants.is_empty() {
            tracing::debug!(%id, descendants = descendants.len(), "Reindexed descendants");
        }
    }
}

/// Datastore keeping everything in process memory
pub struct MemoryDatastore {
    builder: IndexBuilder,
    inner: RwLock<Inner>,
    changes: ChangeFeed,
}

impl MemoryDatastore {
    pub fn new(config: &ProjectConfig) -> Self {
        Self {
            builder: IndexBuilder::new(config),
            inner: RwLock::new(Inner::default()),
            changes: ChangeFeed::default(),
        }
    }

    fn publish(&self, document: &Document, kind: ChangeKind) {
        if let Some(revision) = document.revision.clone() {
            self.changes.publish(DocumentChange {
                id: document.resource.id.clone(),
                revision,
                kind,
            });
        }
    }
}

impl Default for MemoryDatastore {
    fn default() -> Self {
        Self::new(&ProjectConfig::default())
    }
}

#[async_trait]
impl IndexStore for MemoryDatastore {
    fn index_builder(&self) -> &IndexBuilder {
        &self.builder
    }

    async fn query_index(
        &self,
        index: &str,
        start: &IndexKey,
        end: &IndexKey,
    ) -> Result<Vec<IndexItem>> {
        Ok(self.inner.read().await.range(index, start, end))
    }
}

#[async_trait]
impl Datastore for MemoryDatastore {
    async fn get(&self, id: &ResourceId) -> Result<Document> {
        self.inner
            .read()
            .await
            .documents
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    async fn get_revision(&self, id: &ResourceId, revision: &RevisionId) -> Result<Document> {
        let inner = self.inner.read().await;
        inner
            .documents
            .get(id)
            .filter(|document| document.revision.as_ref() == Some(revision))
            .or_else(|| inner.revisions.get(id).and_then(|revisions| revisions.get(revision)))
            .cloned()
            .ok_or_else(|| Error::RevisionNotFound {
                id: id.to_string(),
                revision: revision.to_string(),
            })
    }

    async fn create(&self, document: Document) -> Result<Document> {
        let document = prepare_create(document)?;
        let mut inner = self.inner.write().await;
        if inner.documents.contains_key(&document.resource.id) {
            return Err(Error::AlreadyExists(document.resource.id.to_string()));
        }
        inner.store(&self.builder, document.clone());
        drop(inner);

        tracing::debug!(id = %document.resource.id, "Created document");
        self.publish(&document, ChangeKind::Created);
        Ok(document)
    }

    async fn update(
        &self,
        document: Document,
        resolved_conflicts: &[RevisionId],
    ) -> Result<Document> {
        let mut inner = self.inner.write().await;
        let current = inner
            .documents
            .get(&document.resource.id)
            .cloned()
            .ok_or_else(|| Error::NotFound(document.resource.id.to_string()))?;
        let updated = prepare_update(&current, document, resolved_conflicts)?;

        inner.archive(current);
        inner.store(&self.builder, updated.clone());
        drop(inner);

        tracing::debug!(
            id = %updated.resource.id,
            revision = ?updated.revision,
            "Updated document"
        );
        self.publish(&updated, ChangeKind::Updated);
        Ok(updated)
    }

    async fn find_conflicted(&self) -> Result<Vec<Document>> {
        let mut conflicted: Vec<Document> = self
            .inner
            .read()
            .await
            .documents
            .values()
            .filter(|document| document.has_conflicts())
            .cloned()
            .collect();
        conflicted.sort_by(|a, b| {
            b.sort_date()
                .cmp(&a.sort_date())
                .then_with(|| a.resource.id.cmp(&b.resource.id))
        });
        Ok(conflicted)
    }

    async fn apply_remote(&self, document: Document) -> Result<Document> {
        let mut inner = self.inner.write().await;
        let id = document.resource.id.clone();

        let known = match &document.revision {
            Some(revision) => inner
                .revisions
                .get(&id)
                .is_some_and(|revisions| revisions.contains_key(revision)),
            None => false,
        };
        let applied = if known {
            None
        } else {
            reconcile_remote(inner.documents.get(&id), document)?
        };

        let current = match applied {
            None => {
                return inner
                    .documents
                    .get(&id)
                    .cloned()
                    .ok_or_else(|| Error::NotFound(id.to_string()));
            }
            Some(RemoteApply::Created(current)) => {
                inner.store(&self.builder, current.clone());
                current
            }
            Some(
                RemoteApply::Advanced { current, previous }
                | RemoteApply::Won { current, previous },
            ) => {
                inner.archive(previous);
                inner.store(&self.builder, current.clone());
                current
            }
            Some(RemoteApply::Lost { current, conflict }) => {
                inner.archive(conflict);
                inner.documents.insert(id, current.clone());
                current
            }
        };
        drop(inner);

        tracing::debug!(
            id = %current.resource.id,
            conflicts = current.conflicts.len(),
            "Applied remote revision"
        );
        self.publish(&current, ChangeKind::Remote);
        Ok(current)
    }

    fn subscribe(&self) -> ChangeReceiver {
        self.changes.subscribe()
    }
}
