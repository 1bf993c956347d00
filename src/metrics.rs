use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing ingestion activity.
#[derive(Default)]
pub struct IngestMetrics {
    documents_ingested: AtomicU64,
    children_indexed: AtomicU64,
    children_failed: AtomicU64,
}

impl IngestMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a processed document and its child-chunk tallies.
    pub fn record_document(&self, indexed: u64, failed: u64) {
        self.documents_ingested.fetch_add(1, Ordering::Relaxed);
        self.children_indexed.fetch_add(indexed, Ordering::Relaxed);
        self.children_failed.fetch_add(failed, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_ingested: self.documents_ingested.load(Ordering::Relaxed),
            children_indexed: self.children_indexed.load(Ordering::Relaxed),
            children_failed: self.children_failed.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of ingestion counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of documents ingested since startup.
    pub documents_ingested: u64,
    /// Total child chunks embedded and indexed across all documents.
    pub children_indexed: u64,
    /// Total child chunks dropped because embedding failed.
    pub children_failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_documents_and_children() {
        let metrics = IngestMetrics::new();
        metrics.record_document(4, 1);
        metrics.record_document(3, 0);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.documents_ingested, 2);
        assert_eq!(snapshot.children_indexed, 7);
        assert_eq!(snapshot.children_failed, 1);
    }

    #[test]
    fn snapshot_starts_empty() {
        let metrics = IngestMetrics::new();
        assert_eq!(metrics.snapshot().documents_ingested, 0);
        assert_eq!(metrics.snapshot().children_indexed, 0);
        assert_eq!(metrics.snapshot().children_failed, 0);
    }
}
