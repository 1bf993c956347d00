//! Record types and error definitions for the ingestion and retrieval stages.
//!
//! Each pipeline stage exchanges an explicit record shape with the next; the
//! conversions happen at stage boundaries rather than inside the stages.

use serde::Serialize;
use thiserror::Error;

use crate::embedding::EmbedError;
use crate::qdrant::IndexError;
use crate::store::{SourceKind, StoreError};

/// Identity of the document handed to the ingestion pipeline.
///
/// The raw text itself is supplied by an external loader; the pipeline only
/// needs to know which source owns the rows it writes.
#[derive(Debug, Clone)]
pub struct SourceMeta {
    /// Knowledge-source identifier owning all produced rows.
    pub source_id: String,
    /// URI the document was loaded from.
    pub source_uri: String,
    /// Human-readable name carried into retrieval results.
    pub display_name: String,
    /// Kind of the source as registered in the catalog.
    pub kind: SourceKind,
}

/// Summary of a completed ingestion.
///
/// Per-chunk embedding failures are recovered, not raised; the report is the
/// only place they surface.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct IngestionReport {
    /// Number of parent sections produced by the header split.
    pub sections: usize,
    /// Child chunks embedded and indexed.
    pub children_indexed: usize,
    /// Child chunks dropped because embedding failed.
    pub children_failed: usize,
}

/// Errors that prevent an ingestion from making any progress.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Vector index connect/open or write failure; ingestion is a foreground
    /// action, so this surfaces to the caller.
    #[error("Vector index operation failed: {0}")]
    Index(#[from] IndexError),
    /// Parent store write failure.
    #[error("Parent store operation failed: {0}")]
    Store(#[from] StoreError),
}

/// Errors occurring inside a retrieval attempt.
///
/// Never escapes [`crate::processing::RetrievalEngine::retrieve`]; the engine
/// trades completeness for availability and answers with an empty list.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Query embedding failed.
    #[error("Failed to embed query: {0}")]
    Embedding(#[from] EmbedError),
    /// Hybrid query against the vector index failed.
    #[error("Vector index query failed: {0}")]
    Index(#[from] IndexError),
    /// Parent store lookup failed during resolution.
    #[error("Parent store lookup failed: {0}")]
    Store(#[from] StoreError),
}

/// Candidate produced from a hybrid-query row, before reduction.
#[derive(Debug, Clone)]
pub struct RetrievalCandidate {
    /// URI of the owning source.
    pub source: String,
    /// Display name of the owning source.
    pub name: String,
    /// Child-level text the row matched on.
    pub text: String,
    /// Back-reference to the parent section.
    pub parent_id: String,
    /// Relevance score; hybrid at first, replaced by the rerank probability
    /// on the deep path.
    pub score: f32,
}

/// Final, parent-resolved result handed to the consuming chat flow.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalResult {
    /// URI of the owning source.
    pub source: String,
    /// Display name of the owning source.
    pub name: String,
    /// Parent-section content when resolution succeeded, otherwise the
    /// child-level text the index matched on.
    pub text: String,
    /// Empty once the parent was resolved; the dangling child reference
    /// otherwise.
    pub parent_id: String,
    /// Score the result was ranked by.
    pub score: f32,
}

impl From<RetrievalCandidate> for RetrievalResult {
    fn from(candidate: RetrievalCandidate) -> Self {
        Self {
            source: candidate.source,
            name: candidate.name,
            text: candidate.text,
            parent_id: candidate.parent_id,
            score: candidate.score,
        }
    }
}
