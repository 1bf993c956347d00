//! Qdrant-backed hybrid vector index for child chunks.

pub mod client;
pub mod payload;
pub mod types;

pub use client::QdrantIndex;
pub use types::{ChildRecord, IndexError, ScoredRow};
