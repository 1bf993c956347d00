//! Retrieval engine: hybrid search, optional reranking, parent resolution.
//!
//! Children are indexed for match precision; parents are returned for
//! context. The engine funnels an over-fetched hybrid candidate set through
//! a relevance floor, an optional cross-encoder rerank, and a per-parent
//! reduction before swapping in the parent-section content.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::join_all;

use crate::embedding::{Embedder, sanitize_input};
use crate::processing::types::{RetrievalCandidate, RetrievalError, RetrievalResult};
use crate::qdrant::{QdrantIndex, ScoredRow};
use crate::rerank::{Reranker, sigmoid};
use crate::store::ParentStore;

/// Hybrid rows at or below this relevance score are discarded as noise.
const RELEVANCE_FLOOR: f32 = 0.01;
/// Rerank probabilities below this are dropped on the deep path.
const RERANK_FLOOR: f32 = 0.1;
/// Over-fetch factor leaving room for threshold and dedup attrition.
const OVERFETCH: usize = 4;
/// Score assigned to a candidate whose rerank call failed; the floor filter
/// excludes it naturally.
const RERANK_FAILURE_SCORE: f32 = -1.0;

/// Composes the embedder, vector index, reranker, and parent store into the
/// query-time flow: query → candidates → resolved results.
pub struct RetrievalEngine {
    embedder: Arc<dyn Embedder>,
    reranker: Arc<dyn Reranker>,
    store: Arc<dyn ParentStore>,
    index: Arc<QdrantIndex>,
}

impl RetrievalEngine {
    /// Build an engine around the shared collaborators.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        reranker: Arc<dyn Reranker>,
        store: Arc<dyn ParentStore>,
        index: Arc<QdrantIndex>,
    ) -> Self {
        Self {
            embedder,
            reranker,
            store,
            index,
        }
    }

    /// Answer a retrieval query with at most `limit` parent-resolved results
    /// in descending score order.
    ///
    /// Retrieval runs implicitly while answering a question, so it must never
    /// break the consuming chat flow: any internal failure is logged and
    /// converted into an empty list.
    pub async fn retrieve(
        &self,
        query_text: &str,
        limit: usize,
        deep_search: bool,
    ) -> Vec<RetrievalResult> {
        match self.try_retrieve(query_text, limit, deep_search).await {
            Ok(results) => results,
            Err(error) => {
                tracing::warn!(error = %error, "Retrieval failed; returning no results");
                Vec::new()
            }
        }
    }

    async fn try_retrieve(
        &self,
        query_text: &str,
        limit: usize,
        deep_search: bool,
    ) -> Result<Vec<RetrievalResult>, RetrievalError> {
        let vector = self.embedder.embed(&sanitize_input(query_text)).await?;
        let overfetch = limit.saturating_mul(OVERFETCH).max(1);
        let rows = self
            .index
            .hybrid_query(vector, query_text, overfetch)
            .await?;
        let fetched = rows.len();
        let candidates = screen_rows(rows);
        tracing::debug!(
            fetched,
            candidates = candidates.len(),
            deep_search,
            "Screened hybrid candidates"
        );

        let reduced = if deep_search {
            let survivors = self.rerank_candidates(query_text, candidates).await;
            dedup_by_parent_top_k(survivors, limit)
        } else {
            dedup_by_parent_top_k(candidates, limit)
        };

        self.resolve_parents(reduced).await
    }

    /// Score every candidate against the query concurrently.
    ///
    /// A failed rerank call degrades only that candidate: it receives the
    /// sentinel score and falls to the floor filter, never aborting the
    /// batch.
    async fn rerank_candidates(
        &self,
        query_text: &str,
        candidates: Vec<RetrievalCandidate>,
    ) -> Vec<RetrievalCandidate> {
        if candidates.is_empty() {
            return candidates;
        }

        let scores = join_all(candidates.iter().map(|candidate| {
            let reranker = Arc::clone(&self.reranker);
            async move {
                match reranker.score(query_text, &candidate.text).await {
                    Ok(logit) => sigmoid(logit),
                    Err(error) => {
                        tracing::warn!(error = %error, "Rerank failed for candidate");
                        RERANK_FAILURE_SCORE
                    }
                }
            }
        }))
        .await;

        candidates
            .into_iter()
            .zip(scores)
            .filter(|(_, score)| *score >= RERANK_FLOOR)
            .map(|(mut candidate, score)| {
                candidate.score = score;
                candidate
            })
            .collect()
    }

    /// Swap child text for parent-section content.
    ///
    /// A resolved result carries an empty `parent_id` (no finer reference
    /// remains); a dangling reference keeps the child-level text.
    async fn resolve_parents(
        &self,
        reduced: Vec<RetrievalCandidate>,
    ) -> Result<Vec<RetrievalResult>, RetrievalError> {
        let mut results = Vec::with_capacity(reduced.len());
        for candidate in reduced {
            let mut result = RetrievalResult::from(candidate);
            if !result.parent_id.is_empty() {
                match self.store.get(&result.parent_id).await? {
                    Some(parent) => {
                        result.text = parent.content;
                        result.parent_id.clear();
                    }
                    None => {
                        tracing::warn!(
                            parent_id = %result.parent_id,
                            "Parent reference dangling; keeping child text"
                        );
                    }
                }
            }
            results.push(result);
        }
        Ok(results)
    }
}

/// Drop rows at or below the relevance floor and lift survivors into
/// candidates.
fn screen_rows(rows: Vec<ScoredRow>) -> Vec<RetrievalCandidate> {
    rows.into_iter()
        .filter(|row| row.score > RELEVANCE_FLOOR)
        .map(|row| RetrievalCandidate {
            source: row.source,
            name: row.source_name,
            text: row.text,
            parent_id: row.parent_id,
            score: row.score,
        })
        .collect()
}

/// Reduce child-level hits to at most one per parent — the best-scoring one —
/// then keep the top `k` parents by that score, descending.
fn dedup_by_parent_top_k(items: Vec<RetrievalCandidate>, k: usize) -> Vec<RetrievalCandidate> {
    let mut best: Vec<RetrievalCandidate> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();

    for item in items {
        match slots.get(&item.parent_id) {
            Some(&slot) => {
                if item.score > best[slot].score {
                    best[slot] = item;
                }
            }
            None => {
                slots.insert(item.parent_id.clone(), best.len());
                best.push(item);
            }
        }
    }

    best.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    best.truncate(k);
    best
}
