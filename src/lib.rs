#![deny(missing_docs)]

//! Retrieval core for a local-first personal knowledge base.
//!
//! Documents are split into heading-bounded parent sections and overlapping
//! child windows; children are embedded and indexed for hybrid
//! vector+full-text search, while parents are stored verbatim and returned
//! as retrieval context. See [`processing::IngestionPipeline`] and
//! [`processing::RetrievalEngine`] for the two entry points.

/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion metrics helpers.
pub mod metrics;
/// Splitting, ingestion, and retrieval pipeline.
pub mod processing;
/// Qdrant hybrid vector index integration.
pub mod qdrant;
/// Reranker abstraction and adapters.
pub mod rerank;
/// Parent-section and knowledge-source persistence.
pub mod store;
