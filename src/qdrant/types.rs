//! Shared types used by the Qdrant index client and helpers.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors returned while interacting with the vector index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid Qdrant URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Qdrant responded with an unexpected status code.
    #[error("Unexpected Qdrant response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from Qdrant.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
}

/// Child-chunk row scheduled for insertion into the index.
///
/// One row per successfully embedded child window. `parent_id` is a
/// non-owning back-reference into the parent store; deleting a source must
/// delete rows in both stores explicitly.
#[derive(Debug, Clone)]
pub struct ChildRecord {
    /// Searchable text: the parent's title path joined with the window text.
    pub text: String,
    /// Embedding vector produced for the text.
    pub vector: Vec<f32>,
    /// Id of the parent section this window was cut from.
    pub parent_id: String,
    /// Owning knowledge source.
    pub source_id: String,
    /// Display name of the source, carried into retrieval results.
    pub source_name: String,
    /// URI the source was loaded from.
    pub source_uri: String,
}

/// Scored row returned by hybrid queries, ordered by fused relevance.
#[derive(Debug, Clone)]
pub struct ScoredRow {
    /// Point identifier assigned at insertion time.
    pub id: String,
    /// Combined vector/full-text relevance score.
    pub score: f32,
    /// URI of the owning source.
    pub source: String,
    /// Display name of the owning source.
    pub source_name: String,
    /// Indexed child text.
    pub text: String,
    /// Back-reference to the parent section.
    pub parent_id: String,
}

#[derive(Deserialize)]
pub(crate) struct QueryResponse {
    pub(crate) result: QueryResponseResult,
}

#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum QueryResponseResult {
    Points(Vec<QueryPoint>),
    Object {
        #[serde(default)]
        points: Vec<QueryPoint>,
    },
}

#[derive(Deserialize)]
pub(crate) struct QueryPoint {
    pub(crate) id: Value,
    pub(crate) score: f32,
    #[serde(default)]
    pub(crate) payload: Option<Map<String, Value>>,
}
