//! Ingestion pipeline: split, embed, and index one document at a time.

use std::sync::Arc;

use uuid::Uuid;

use crate::embedding::{Embedder, sanitize_input};
use crate::metrics::{IngestMetrics, MetricsSnapshot};
use crate::processing::limiter::RateLimiter;
use crate::processing::splitting::{SplitOptions, split_headers, split_windows};
use crate::processing::types::{IngestError, IngestionReport, SourceMeta};
use crate::qdrant::{ChildRecord, QdrantIndex};
use crate::store::{ParentChunk, ParentStore, SourceCatalog, SourceRecord};

/// Composes the splitters, embedder, parent store, and vector index into the
/// one-way ingestion flow: document → sections → windows → vectors → stores.
///
/// The pipeline owns no global state; construct it once near process start
/// with the shared store handles and reuse it for every document. Callers
/// serialize ingestions per source id — concurrent ingestion of the same
/// source is not a supported scenario.
pub struct IngestionPipeline {
    embedder: Arc<dyn Embedder>,
    limiter: Arc<dyn RateLimiter>,
    store: Arc<dyn ParentStore>,
    catalog: Arc<dyn SourceCatalog>,
    index: Arc<QdrantIndex>,
    options: SplitOptions,
    metrics: Arc<IngestMetrics>,
}

impl IngestionPipeline {
    /// Build a pipeline around the shared collaborators.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        limiter: Arc<dyn RateLimiter>,
        store: Arc<dyn ParentStore>,
        catalog: Arc<dyn SourceCatalog>,
        index: Arc<QdrantIndex>,
        options: SplitOptions,
    ) -> Self {
        Self {
            embedder,
            limiter,
            store,
            catalog,
            index,
            options,
            metrics: Arc::new(IngestMetrics::new()),
        }
    }

    /// Ingest one document: register its source, replace any earlier rows,
    /// split into parents and windows, embed, and batch-index the children.
    ///
    /// Embedding failures are recovered per child and tallied in the report;
    /// store and index failures surface, since ingestion is an explicit
    /// foreground action.
    pub async fn ingest(
        &self,
        meta: &SourceMeta,
        raw_text: &str,
    ) -> Result<IngestionReport, IngestError> {
        tracing::info!(
            source_id = %meta.source_id,
            name = %meta.display_name,
            "Ingesting document"
        );
        self.index.ensure_table().await?;
        self.catalog
            .register(&SourceRecord::new(
                &meta.source_id,
                meta.kind,
                &meta.source_uri,
                &meta.display_name,
            ))
            .await?;

        // Re-ingestion replaces the previous generation of rows wholesale;
        // this is also the documented recovery path for partial writes.
        self.index.delete_by_source(&meta.source_id).await?;
        let replaced = self.store.delete_for_source(&meta.source_id).await?;
        if replaced > 0 {
            tracing::debug!(source_id = %meta.source_id, replaced, "Replaced earlier ingestion");
        }

        let sections = split_headers(raw_text, self.options.max_header_level);
        let mut records = Vec::new();
        let mut failed = 0usize;

        for section in &sections {
            let parent = ParentChunk {
                id: Uuid::new_v4().to_string(),
                source_id: meta.source_id.clone(),
                title_path: section.title_path.clone(),
                content: section.content.clone(),
            };
            self.store.put(&parent).await?;

            let chunk_text = format!("{}\n{}", section.title_path, section.content);
            for window in split_windows(
                &chunk_text,
                self.options.window_size,
                self.options.window_overlap,
            ) {
                self.limiter.acquire().await;
                match self.embedder.embed(&sanitize_input(&window)).await {
                    Ok(vector) => records.push(ChildRecord {
                        text: window,
                        vector,
                        parent_id: parent.id.clone(),
                        source_id: meta.source_id.clone(),
                        source_name: meta.display_name.clone(),
                        source_uri: meta.source_uri.clone(),
                    }),
                    Err(error) => {
                        failed += 1;
                        tracing::warn!(
                            source_id = %meta.source_id,
                            title_path = %section.title_path,
                            error = %error,
                            "Embedding failed for child chunk; skipping"
                        );
                    }
                }
            }
        }

        let indexed = records.len();
        if !records.is_empty() {
            self.index.add(records).await?;
            // Refresh the full-text schema so a query issued right after this
            // call sees the new rows.
            self.index.create_full_text_index("text").await?;
        }

        self.metrics.record_document(indexed as u64, failed as u64);
        tracing::info!(
            source_id = %meta.source_id,
            sections = sections.len(),
            children_indexed = indexed,
            children_failed = failed,
            "Document ingested"
        );

        Ok(IngestionReport {
            sections: sections.len(),
            children_indexed: indexed,
            children_failed: failed,
        })
    }

    /// Remove a knowledge source: its vector rows, its parent sections, and
    /// its catalog entry, in that order.
    ///
    /// The child rows' `parent_id` back-references never cascade on their
    /// own; this explicit two-store delete is the only cleanup path.
    pub async fn remove_source(&self, source_id: &str) -> Result<(), IngestError> {
        self.index.delete_by_source(source_id).await?;
        let removed = self.store.delete_for_source(source_id).await?;
        self.catalog.remove(source_id).await?;
        tracing::info!(
            source_id,
            sections_removed = removed,
            "Knowledge source removed"
        );
        Ok(())
    }

    /// Return the current ingestion metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
