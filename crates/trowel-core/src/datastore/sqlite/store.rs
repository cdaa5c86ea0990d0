//! Datastore over a `SQLite` database

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;

use crate::config::ProjectConfig;
use crate::datastore::revisions::{prepare_create, prepare_update, reconcile_remote, RemoteApply};
use crate::datastore::{ChangeFeed, ChangeKind, ChangeReceiver, Datastore, DocumentChange};
use crate::error::{Error, Result};
use crate::index::{IndexBuilder, IndexItem, IndexKey, IndexStore, DESCENDANTS_INDEX};
use crate::models::{Document, Relations, ResourceId, RevisionId};

use super::Database;

/// Datastore persisting documents, revisions and index entries in `SQLite`
pub struct SqliteDatastore {
    builder: IndexBuilder,
    db: Arc<Mutex<Database>>,
    changes: ChangeFeed,
}

impl SqliteDatastore {
    /// Open the database at `path`, creating missing parent directories
    pub fn open(path: impl AsRef<Path>, config: &ProjectConfig) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self::with_database(Database::open(path)?, config))
    }

    pub fn open_in_memory(config: &ProjectConfig) -> Result<Self> {
        Ok(Self::with_database(Database::open_in_memory()?, config))
    }

    pub fn with_database(database: Database, config: &ProjectConfig) -> Self {
        Self {
            builder: IndexBuilder::new(config),
            db: Arc::new(Mutex::new(database)),
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

/// Serialized document without its conflicts, which live in their own table
fn encode_body(document: &Document) -> Result<String> {
    let mut body = document.clone();
    body.conflicts.clear();
    Ok(serde_json::to_string(&body)?)
}

fn load_document(conn: &Connection, id: &ResourceId) -> Result<Option<Document>> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM documents WHERE id = ?",
            params![id.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    let Some(body) = body else {
        return Ok(None);
    };

    let mut document: Document = serde_json::from_str(&body)?;
    let mut stmt = conn.prepare("SELECT revision FROM conflicts WHERE id = ? ORDER BY rowid")?;
    document.conflicts = stmt
        .query_map(params![id.as_str()], |row| row.get::<_, String>(0))?
        .map(|revision| revision.map(RevisionId::from))
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(Some(document))
}

fn load_revision(
    conn: &Connection,
    id: &ResourceId,
    revision: &RevisionId,
) -> Result<Option<Document>> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM revisions WHERE id = ? AND revision = ?",
            params![id.as_str(), revision.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    body.map(|body| serde_json::from_str(&body).map_err(Error::from))
        .transpose()
}

fn revision_known(conn: &Connection, id: &ResourceId, revision: &RevisionId) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM revisions WHERE id = ? AND revision = ?)",
        params![id.as_str(), revision.as_str()],
        |row| row.get(0),
    )?)
}

fn archive(conn: &Connection, document: &Document) -> Result<()> {
    let Some(revision) = &document.revision else {
        return Ok(());
    };
    conn.execute(
        "INSERT OR REPLACE INTO revisions (id, revision, body) VALUES (?, ?, ?)",
        params![document.resource.id.as_str(), revision.as_str(), encode_body(document)?],
    )?;
    Ok(())
}

fn write_current(conn: &Connection, document: &Document) -> Result<()> {
    let id = document.resource.id.as_str();
    let revision = document
        .revision
        .as_ref()
        .ok_or_else(|| Error::InvalidInput(format!("document {id} has no revision")))?;

    conn.execute(
        "INSERT INTO documents (id, revision, identifier, category, modified_at, body)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
             revision = excluded.revision,
             identifier = excluded.identifier,
             category = excluded.category,
             modified_at = excluded.modified_at,
             body = excluded.body",
        params![
            id,
            revision.as_str(),
            document.resource.identifier,
            document.resource.category,
            document.sort_date(),
            encode_body(document)?
        ],
    )?;

    conn.execute("DELETE FROM conflicts WHERE id = ?", params![id])?;
    for conflict in &document.conflicts {
        conn.execute(
            "INSERT OR IGNORE INTO conflicts (id, revision) VALUES (?, ?)",
            params![id, conflict.as_str()],
        )?;
    }
    Ok(())
}

fn range(
    conn: &Connection,
    index: &str,
    start: &IndexKey,
    end: &IndexKey,
) -> Result<Vec<IndexItem>> {
    let mut stmt = conn.prepare(
        "SELECT id, date FROM index_entries
         WHERE index_name = ? AND key >= ? AND key <= ?
         ORDER BY key, rowid",
    )?;
    let items = stmt
        .query_map(params![index, start.encode(), end.encode()], |row| {
            Ok(IndexItem::new(row.get::<_, String>(0)?, row.get(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(items)
}

fn descendants(conn: &Connection, id: &ResourceId) -> Result<Vec<ResourceId>> {
    let start = IndexKey::from_strs(&[id.as_str()]);
    let end = start.clone().push_max();
    Ok(range(conn, DESCENDANTS_INDEX, &start, &end)?
        .into_iter()
        .map(|item| item.id)
        .collect())
}

fn relations_of(conn: &Connection, id: &ResourceId) -> Option<Relations> {
    match load_document(conn, id) {
        Ok(document) => document.map(|document| document.resource.relations),
        Err(error) => {
            tracing::warn!(%id, %error, "Could not resolve ancestor");
            None
        }
    }
}

fn index(conn: &Connection, builder: &IndexBuilder, id: &ResourceId) -> Result<()> {
    let Some(document) = load_document(conn, id)? else {
        return Ok(());
    };
    let ancestors = builder.ancestors(id, &document.resource.relations, |parent| {
        relations_of(conn, parent)
    });

    conn.execute("DELETE FROM index_entries WHERE id = ?", params![id.as_str()])?;
    let mut stmt = conn.prepare(
        "INSERT INTO index_entries (index_name, key, id, date) VALUES (?, ?, ?, ?)",
    )?;
    for entry in builder.entries(&document, &ancestors) {
        stmt.execute(params![
            entry.index,
            entry.key.encode(),
            entry.item.id.as_str(),
            entry.item.date
        ])?;
    }
    Ok(())
}

/// Make `document` current and refresh the index entries it affects
fn store(
    conn: &Connection,
    builder: &IndexBuilder,
    document: &Document,
    previous: Option<&Document>,
) -> Result<()> {
    let id = &document.resource.id;
    let hierarchy_changed = previous.is_none_or(|previous| {
        builder.hierarchy_changed(&previous.resource.relations, &document.resource.relations)
    });
    let descendants = if hierarchy_changed {
        descendants(conn, id)?
    } else {
        Vec::new()
    };

    write_current(conn, document)?;
    index(conn, builder, id)?;
    for descendant in &descendants {
        index(conn, builder, descendant)?;
    }
    if !descendants.is_empty() {
        tracing::debug!(%id, descendants = descendants.len(), "Reindexed descendants");
    }
    Ok(())
}

#[async_trait]
impl IndexStore for SqliteDatastore {
    fn index_builder(&self) -> &IndexBuilder {
        &self.builder
    }

    async fn query_index(
        &self,
        index: &str,
        start: &IndexKey,
        end: &IndexKey,
    ) -> Result<Vec<IndexItem>> {
        let db = self.db.lock().await;
        range(db.connection(), index, start, end).map_err(|error| Error::IndexLookup {
            index: index.to_string(),
            reason: error.to_string(),
        })
    }
}

#[async_trait]
impl Datastore for SqliteDatastore {
    async fn get(&self, id: &ResourceId) -> Result<Document> {
        let db = self.db.lock().await;
        load_document(db.connection(), id)?.ok_or_else(|| Error::NotFound(id.to_string()))
    }

    async fn get_revision(&self, id: &ResourceId, revision: &RevisionId) -> Result<Document> {
        let db = self.db.lock().await;
        let conn = db.connection();

        let current = load_document(conn, id)?
            .filter(|document| document.revision.as_ref() == Some(revision));
        let found = match current {
            Some(document) => Some(document),
            None => load_revision(conn, id, revision)?,
        };
        found.ok_or_else(|| Error::RevisionNotFound {
            id: id.to_string(),
            revision: revision.to_string(),
        })
    }

    async fn create(&self, document: Document) -> Result<Document> {
        let document = prepare_create(document)?;
        let mut db = self.db.lock().await;
        let tx = db.connection_mut().transaction()?;

        if load_document(&tx, &document.resource.id)?.is_some() {
            return Err(Error::AlreadyExists(document.resource.id.to_string()));
        }
        store(&tx, &self.builder, &document, None)?;
        tx.commit()?;
        drop(db);

        tracing::debug!(id = %document.resource.id, "Created document");
        self.publish(&document, ChangeKind::Created);
        Ok(document)
    }

    async fn update(
        &self,
        document: Document,
        resolved_conflicts: &[RevisionId],
    ) -> Result<Document> {
        let mut db = self.db.lock().await;
        let tx = db.connection_mut().transaction()?;

        let current = load_document(&tx, &document.resource.id)?
            .ok_or_else(|| Error::NotFound(document.resource.id.to_string()))?;
        let updated = prepare_update(&current, document, resolved_conflicts)?;

        archive(&tx, &current)?;
        store(&tx, &self.builder, &updated, Some(&current))?;
        tx.commit()?;
        drop(db);

        tracing::debug!(
            id = %updated.resource.id,
            revision = ?updated.revision,
            "Updated document"
        );
        self.publish(&updated, ChangeKind::Updated);
        Ok(updated)
    }

    async fn find_conflicted(&self) -> Result<Vec<Document>> {
        let db = self.db.lock().await;
        let conn = db.connection();

        let mut stmt = conn.prepare(
            "SELECT DISTINCT d.id FROM documents d
             JOIN conflicts c ON c.id = d.id
             ORDER BY d.modified_at DESC, d.id",
        )?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut documents = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(document) = load_document(conn, &ResourceId::from(id))? {
                documents.push(document);
            }
        }
        Ok(documents)
    }

    async fn apply_remote(&self, document: Document) -> Result<Document> {
        let mut db = self.db.lock().await;
        let tx = db.connection_mut().transaction()?;
        let id = document.resource.id.clone();

        let existing = load_document(&tx, &id)?;
        let known = match &document.revision {
            Some(revision) => revision_known(&tx, &id, revision)?,
            None => false,
        };
        let applied = if known {
            None
        } else {
            reconcile_remote(existing.as_ref(), document)?
        };

        let current = match applied {
            None => return existing.ok_or_else(|| Error::NotFound(id.to_string())),
            Some(RemoteApply::Created(current)) => {
                store(&tx, &self.builder, &current, None)?;
                current
            }
            Some(
                RemoteApply::Advanced { current, previous }
                | RemoteApply::Won { current, previous },
            ) => {
                archive(&tx, &previous)?;
                store(&tx, &self.builder, &current, Some(&previous))?;
                current
            }
            Some(RemoteApply::Lost { current, conflict }) => {
                archive(&tx, &conflict)?;
                write_current(&tx, &current)?;
                current
            }
        };
        tx.commit()?;
        drop(db);

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{Query, CATEGORY_INDEX};
    use crate::models::{Action, Resource, IS_RECORDED_IN};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn document(id: &str, identifier: &str, date: i64) -> Document {
        Document::with_created(
            Resource::with_id(id, identifier, "Find")
                .with_field("shortDescription", "Decorated bowl")
                .with_relation(IS_RECORDED_IN, &["t1"]),
            Action::new("alice", date),
        )
    }

    #[tokio::test]
    async fn test_round_trip_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("trowel.db");
        let config = ProjectConfig::default();

        let created = {
            let store = SqliteDatastore::open(&path, &config).unwrap();
            store.create(document("a", "Find 1", 1)).await.unwrap()
        };

        let store = SqliteDatastore::open(&path, &config).unwrap();
        assert_eq!(store.get(&ResourceId::from("a")).await.unwrap(), created);

        let found = store.find(&Query::text("decor")).await.unwrap();
        assert_eq!(found.total, 1);
        assert_eq!(found.documents, vec![created]);
    }

    #[tokio::test]
    async fn test_update_archives_and_rejects_stale() {
        let store = SqliteDatastore::open_in_memory(&ProjectConfig::default()).unwrap();
        let created = store.create(document("a", "Find 1", 1)).await.unwrap();

        let mut edit = created.clone();
        edit.modified.push(Action::new("bob", 5));
        let updated = store.update(edit, &[]).await.unwrap();
        assert_eq!(updated.revision.as_ref().map(RevisionId::generation), Some(2));

        let old = store
            .get_revision(&ResourceId::from("a"), created.revision.as_ref().unwrap())
            .await
            .unwrap();
        assert_eq!(old, created);

        assert!(matches!(
            store.update(created, &[]).await,
            Err(Error::SaveConflict { .. })
        ));
        assert!(matches!(
            store
                .get_revision(&ResourceId::from("a"), &RevisionId::from("9-none"))
                .await,
            Err(Error::RevisionNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_index_entries_follow_sort_date() {
        let store = SqliteDatastore::open_in_memory(&ProjectConfig::default()).unwrap();
        let older = store.create(document("a", "Find 1", 1)).await.unwrap();
        store.create(document("b", "Find 2", 2)).await.unwrap();

        let mut edit = older;
        edit.modified.push(Action::new("bob", 10));
        store.update(edit, &[]).await.unwrap();

        let found = store
            .find(&Query::default().with_constraint(CATEGORY_INDEX, "Find"))
            .await
            .unwrap();
        let ids: Vec<&str> = found
            .documents
            .iter()
            .map(|document| document.resource.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_replicated_edit_advances() {
        let store = SqliteDatastore::open_in_memory(&ProjectConfig::default()).unwrap();
        let created = store.create(document("a", "Find 1", 1)).await.unwrap();

        let mut remote = created.clone();
        remote.superseded = created.revision.clone().into_iter().collect();
        remote.revision = Some(RevisionId::from("2-remote"));
        remote.resource.identifier = "Find 1 (remote)".to_string();
        let current = store.apply_remote(remote.clone()).await.unwrap();

        assert_eq!(current, remote);
        assert_eq!(store.get(&ResourceId::from("a")).await.unwrap(), current);
        assert!(store.find_conflicted().await.unwrap().is_empty());

        let local = store
            .get_revision(&ResourceId::from("a"), created.revision.as_ref().unwrap())
            .await
            .unwrap();
        assert_eq!(local.resource.identifier, "Find 1");

        let renamed = store.find(&Query::text("remote")).await.unwrap();
        assert_eq!(renamed.total, 1);
    }

    #[tokio::test]
    async fn test_concurrent_edit_is_persisted_as_conflict() {
        let store = SqliteDatastore::open_in_memory(&ProjectConfig::default()).unwrap();
        let created = store.create(document("a", "Find 1", 1)).await.unwrap();
        let local = store.update(created.clone(), &[]).await.unwrap();

        let mut remote = created.clone();
        remote.superseded = created.revision.clone().into_iter().collect();
        remote.revision = Some(RevisionId::from("2-zzzz"));
        remote.resource.identifier = "Find 1 (remote)".to_string();
        let current = store.apply_remote(remote).await.unwrap();

        assert_eq!(current.revision, Some(RevisionId::from("2-zzzz")));
        assert_eq!(current.conflicts, local.revision.clone().into_iter().collect::<Vec<_>>());
        assert_eq!(store.get(&ResourceId::from("a")).await.unwrap(), current);
        assert_eq!(store.find_conflicted().await.unwrap(), vec![current.clone()]);

        let losing = store
            .get_revision(&ResourceId::from("a"), local.revision.as_ref().unwrap())
            .await
            .unwrap();
        assert_eq!(losing.resource.identifier, "Find 1");
    }
}
