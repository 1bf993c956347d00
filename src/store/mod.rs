//! Parent-section and knowledge-source persistence.
//!
//! Child vectors live in the vector index; the verbatim parent sections they
//! reference live here, keyed by id. The same database keeps the catalog of
//! knowledge sources so that removing a source can cascade over both stores.

pub mod sqlite;

pub use sqlite::SqliteStore;

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

/// Errors returned by the parent store and source catalog.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLite operation failed.
    #[error("Store operation failed: {0}")]
    Sqlite(#[from] tokio_rusqlite::Error),
    /// Database file location could not be prepared.
    #[error("Failed to prepare store path: {0}")]
    Path(String),
}

/// A heading-bounded section of a document, stored verbatim.
///
/// Exactly one row exists per section produced by the header split; rows are
/// immutable once written and are only removed by a source-level cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentChunk {
    /// Identifier referenced by child vectors.
    pub id: String,
    /// Owning knowledge source.
    pub source_id: String,
    /// `->`-joined heading hierarchy at the point the section was collected.
    pub title_path: String,
    /// Verbatim section body.
    pub content: String,
}

/// Kind of a registered knowledge source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Local file handed to the loader.
    File,
    /// Captured web page or URL.
    Url,
    /// Directory of documents.
    Directory,
}

impl SourceKind {
    /// Stable string form stored in the catalog.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Url => "url",
            Self::Directory => "directory",
        }
    }
}

impl std::str::FromStr for SourceKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(Self::File),
            "url" => Ok(Self::Url),
            "directory" => Ok(Self::Directory),
            _ => Err(()),
        }
    }
}

/// Catalog row describing one registered knowledge source.
#[derive(Debug, Clone)]
pub struct SourceRecord {
    /// Source identifier; owns parent chunks and child vectors.
    pub id: String,
    /// Kind of the source.
    pub kind: SourceKind,
    /// URI the source was loaded from.
    pub uri: String,
    /// Human-readable name shown alongside retrieval results.
    pub name: String,
    /// RFC3339 registration timestamp.
    pub created_at: String,
}

impl SourceRecord {
    /// Build a record stamped with the current time.
    pub fn new(id: &str, kind: SourceKind, uri: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            kind,
            uri: uri.to_string(),
            name: name.to_string(),
            created_at: current_timestamp_rfc3339(),
        }
    }
}

pub(crate) fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Key-value collaborator persisting parent sections by id.
#[async_trait]
pub trait ParentStore: Send + Sync {
    /// Persist one parent section.
    async fn put(&self, chunk: &ParentChunk) -> Result<(), StoreError>;

    /// Retrieve a parent section by id; `None` when the reference dangles.
    async fn get(&self, id: &str) -> Result<Option<ParentChunk>, StoreError>;

    /// List the stored sections of a source in insertion order.
    async fn sections_for_source(&self, source_id: &str) -> Result<Vec<ParentChunk>, StoreError>;

    /// Remove every section owned by a source, returning the removed count.
    async fn delete_for_source(&self, source_id: &str) -> Result<usize, StoreError>;
}

/// Registry of knowledge sources known to the pipeline.
#[async_trait]
pub trait SourceCatalog: Send + Sync {
    /// Insert or replace a source record.
    async fn register(&self, source: &SourceRecord) -> Result<(), StoreError>;

    /// Look up a source by id.
    async fn source(&self, id: &str) -> Result<Option<SourceRecord>, StoreError>;

    /// Look up a source by the URI it was loaded from.
    async fn find_by_uri(&self, uri: &str) -> Result<Option<SourceRecord>, StoreError>;

    /// Enumerate all registered sources, newest first.
    async fn list(&self) -> Result<Vec<SourceRecord>, StoreError>;

    /// Remove a source's catalog row.
    async fn remove(&self, id: &str) -> Result<(), StoreError>;
}
