//! SQLite-backed parent store and source catalog.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use tokio_rusqlite::{Connection, OptionalExtension};

use super::{ParentChunk, ParentStore, SourceCatalog, SourceKind, SourceRecord, StoreError};

const MIGRATIONS: &str = "
    CREATE TABLE IF NOT EXISTS sources (
        id TEXT PRIMARY KEY,
        kind TEXT NOT NULL,
        uri TEXT NOT NULL,
        name TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS sections (
        id TEXT PRIMARY KEY,
        source_id TEXT NOT NULL,
        title_path TEXT NOT NULL,
        content TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_sections_source ON sections(source_id);
";

/// Parent store and source catalog sharing one SQLite database.
///
/// The connection is opened once at process start; `tokio-rusqlite` runs all
/// statements on a dedicated thread, so the handle is cheap to clone and safe
/// to share across the ingestion and retrieval paths.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and run migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|err| StoreError::Path(err.to_string()))?;
        }
        tracing::debug!(path = %path.display(), "Opening parent store");
        let conn = Connection::open(path)
            .await
            .map_err(tokio_rusqlite::Error::from)?;
        Self::migrate(&conn).await?;
        Ok(Self { conn })
    }

    /// Open an in-memory database; used by tests and ephemeral hosts.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(tokio_rusqlite::Error::from)?;
        Self::migrate(&conn).await?;
        Ok(Self { conn })
    }

    async fn migrate(conn: &Connection) -> Result<(), StoreError> {
        conn.call(|conn| {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.execute_batch(MIGRATIONS)?;
            Ok(())
        })
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ParentStore for SqliteStore {
    async fn put(&self, chunk: &ParentChunk) -> Result<(), StoreError> {
        let chunk = chunk.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO sections (id, source_id, title_path, content)
                     VALUES (?1, ?2, ?3, ?4)",
                    (
                        &chunk.id,
                        &chunk.source_id,
                        &chunk.title_path,
                        &chunk.content,
                    ),
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<ParentChunk>, StoreError> {
        let id = id.to_string();
        let chunk = self
            .conn
            .call(move |conn| {
                conn.query_row(
                    "SELECT id, source_id, title_path, content FROM sections WHERE id = ?1",
                    [&id],
                    |row| {
                        Ok(ParentChunk {
                            id: row.get(0)?,
                            source_id: row.get(1)?,
                            title_path: row.get(2)?,
                            content: row.get(3)?,
                        })
                    },
                )
                .optional()
            })
            .await?;
        Ok(chunk)
    }

    async fn sections_for_source(&self, source_id: &str) -> Result<Vec<ParentChunk>, StoreError> {
        let source_id = source_id.to_string();
        let sections = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, source_id, title_path, content FROM sections
                         WHERE source_id = ?1 ORDER BY rowid ASC",
                )?;
                let rows = stmt.query_map([&source_id], |row| {
                    Ok(ParentChunk {
                        id: row.get(0)?,
                        source_id: row.get(1)?,
                        title_path: row.get(2)?,
                        content: row.get(3)?,
                    })
                })?;
                let mut sections = Vec::new();
                for row in rows {
                    sections.push(row?);
                }
                Ok(sections)
            })
            .await?;
        Ok(sections)
    }

    async fn delete_for_source(&self, source_id: &str) -> Result<usize, StoreError> {
        let source_id = source_id.to_string();
        let deleted = self
            .conn
            .call(move |conn| {
                conn.execute("DELETE FROM sections WHERE source_id = ?1", [&source_id])
            })
            .await?;
        Ok(deleted)
    }
}

#[async_trait]
impl SourceCatalog for SqliteStore {
    async fn register(&self, source: &SourceRecord) -> Result<(), StoreError> {
        let source = source.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO sources (id, kind, uri, name, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    (
                        &source.id,
                        source.kind.as_str(),
                        &source.uri,
                        &source.name,
                        &source.created_at,
                    ),
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn source(&self, id: &str) -> Result<Option<SourceRecord>, StoreError> {
        let id = id.to_string();
        let record = self
            .conn
            .call(move |conn| {
                conn.query_row(
                    "SELECT id, kind, uri, name, created_at FROM sources WHERE id = ?1",
                    [&id],
                    |row| {
                        let kind: String = row.get(1)?;
                        Ok(SourceRecord {
                            id: row.get(0)?,
                            kind: SourceKind::from_str(&kind).unwrap_or(SourceKind::File),
                            uri: row.get(2)?,
                            name: row.get(3)?,
                            created_at: row.get(4)?,
                        })
                    },
                )
                .optional()
            })
            .await?;
        Ok(record)
    }

    async fn find_by_uri(&self, uri: &str) -> Result<Option<SourceRecord>, StoreError> {
        let uri = uri.to_string();
        let record = self
            .conn
            .call(move |conn| {
                conn.query_row(
                    "SELECT id, kind, uri, name, created_at FROM sources WHERE uri = ?1",
                    [&uri],
                    |row| {
                        let kind: String = row.get(1)?;
                        Ok(SourceRecord {
                            id: row.get(0)?,
                            kind: SourceKind::from_str(&kind).unwrap_or(SourceKind::File),
                            uri: row.get(2)?,
                            name: row.get(3)?,
                            created_at: row.get(4)?,
                        })
                    },
                )
                .optional()
            })
            .await?;
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<SourceRecord>, StoreError> {
        let records = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, kind, uri, name, created_at FROM sources
                         ORDER BY created_at DESC",
                )?;
                let rows = stmt.query_map([], |row| {
                    let kind: String = row.get(1)?;
                    Ok(SourceRecord {
                        id: row.get(0)?,
                        kind: SourceKind::from_str(&kind).unwrap_or(SourceKind::File),
                        uri: row.get(2)?,
                        name: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?;
                let mut records = Vec::new();
                for row in rows {
                    records.push(row?);
                }
                Ok(records)
            })
            .await?;
        Ok(records)
    }

    async fn remove(&self, id: &str) -> Result<(), StoreError> {
        let id = id.to_string();
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM sources WHERE id = ?1", [&id])?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(id: &str, source_id: &str, title_path: &str, content: &str) -> ParentChunk {
        ParentChunk {
            id: id.to_string(),
            source_id: source_id.to_string(),
            title_path: title_path.to_string(),
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn put_and_get_round_trip() {
        let store = SqliteStore::open_in_memory().await.expect("store");
        let chunk = section("p1", "s1", "Guide->Setup", "Install the tooling.");
        store.put(&chunk).await.expect("put");

        let loaded = store.get("p1").await.expect("get").expect("present");
        assert_eq!(loaded, chunk);
    }

    #[tokio::test]
    async fn get_returns_none_for_dangling_reference() {
        let store = SqliteStore::open_in_memory().await.expect("store");
        assert!(store.get("missing").await.expect("get").is_none());
    }

    #[tokio::test]
    async fn sections_for_source_preserves_insertion_order() {
        let store = SqliteStore::open_in_memory().await.expect("store");
        store
            .put(&section("p1", "s1", "A", "first"))
            .await
            .expect("put");
        store
            .put(&section("p2", "s1", "B", "second"))
            .await
            .expect("put");
        store
            .put(&section("p3", "other", "C", "elsewhere"))
            .await
            .expect("put");

        let sections = store.sections_for_source("s1").await.expect("list");
        let titles: Vec<_> = sections.iter().map(|s| s.title_path.as_str()).collect();
        assert_eq!(titles, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn delete_for_source_cascades_only_that_source() {
        let store = SqliteStore::open_in_memory().await.expect("store");
        store
            .put(&section("p1", "s1", "A", "first"))
            .await
            .expect("put");
        store
            .put(&section("p2", "s1", "B", "second"))
            .await
            .expect("put");
        store
            .put(&section("p3", "s2", "C", "kept"))
            .await
            .expect("put");

        let removed = store.delete_for_source("s1").await.expect("delete");
        assert_eq!(removed, 2);
        assert!(store.get("p1").await.expect("get").is_none());
        assert!(store.get("p3").await.expect("get").is_some());
    }

    #[tokio::test]
    async fn catalog_register_list_and_remove() {
        let store = SqliteStore::open_in_memory().await.expect("store");
        let record = SourceRecord::new("s1", SourceKind::Url, "https://example.com", "Example");
        store.register(&record).await.expect("register");

        let found = store
            .find_by_uri("https://example.com")
            .await
            .expect("find")
            .expect("present");
        assert_eq!(found.id, "s1");
        assert_eq!(found.kind, SourceKind::Url);

        assert_eq!(store.list().await.expect("list").len(), 1);

        store.remove("s1").await.expect("remove");
        assert!(store.source("s1").await.expect("get").is_none());
    }

    #[tokio::test]
    async fn open_creates_missing_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("knowledge.db");
        let store = SqliteStore::open(&path).await.expect("store");
        store
            .put(&section("p1", "s1", "A", "persisted"))
            .await
            .expect("put");
        assert!(path.exists());
    }
}
