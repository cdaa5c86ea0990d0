//! Database migrations

use rusqlite::Connection;

use crate::error::{Error, Result};

/// Current schema version
const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations
pub fn run(conn: &mut Connection) -> Result<()> {
    let version = get_version(conn)?;
    if version > CURRENT_VERSION {
        return Err(Error::Database(format!(
            "schema version {version} is newer than supported version {CURRENT_VERSION}"
        )));
    }

    if version < 1 {
        migrate_v1(conn)?;
    }
    if version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;
    if !exists {
        return Ok(0);
    }

    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

/// Migration to version 1: documents and their revisions
fn migrate_v1(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );
        CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            revision TEXT NOT NULL,
            identifier TEXT NOT NULL,
            category TEXT NOT NULL,
            modified_at INTEGER NOT NULL,
            body TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_documents_identifier ON documents(identifier);
        CREATE INDEX IF NOT EXISTS idx_documents_modified ON documents(modified_at DESC);
        CREATE TABLE IF NOT EXISTS revisions (
            id TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
            revision TEXT NOT NULL,
            body TEXT NOT NULL,
            PRIMARY KEY (id, revision)
        );
        CREATE TABLE IF NOT EXISTS conflicts (
            id TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
            revision TEXT NOT NULL,
            PRIMARY KEY (id, revision)
        );
        INSERT INTO schema_version (version) VALUES (1);",
    )?;
    tx.commit()?;

    tracing::info!("Migrated database to version 1");
    Ok(())
}

/// Migration to version 2: named index entries
fn migrate_v2(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS index_entries (
            index_name TEXT NOT NULL,
            key TEXT NOT NULL,
            id TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
            date INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_index_entries_lookup ON index_entries(index_name, key);
        CREATE INDEX IF NOT EXISTS idx_index_entries_id ON index_entries(id);
        INSERT INTO schema_version (version) VALUES (2);",
    )?;
    tx.commit()?;

    tracing::info!("Migrated database to version {CURRENT_VERSION}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        run(&mut conn).unwrap();
        run(&mut conn).unwrap();

        assert_eq!(get_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_fresh_database_has_version_zero() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(get_version(&conn).unwrap(), 0);
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        run(&mut conn).unwrap();
        conn.execute("INSERT INTO schema_version (version) VALUES (?)", [CURRENT_VERSION + 1])
            .unwrap();

        assert!(matches!(run(&mut conn), Err(Error::Database(_))));
    }
}
