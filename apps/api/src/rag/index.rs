//! Similarity Index: exact cosine ranking over the whole reference corpus.
//!
//! Every query rescans the store, O(N·D) for N documents of dimension D.
//! The corpus is a handful of job descriptions; an approximate index can
//! replace [`LinearScanIndex`] behind [`SimilarityIndex`] if that changes.

use std::sync::Arc;

use async_trait::async_trait;

use crate::db::StoreError;
use crate::models::reference::ReferenceDocument;
use crate::rag::store::ReferenceStore;

#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document: ReferenceDocument,
    pub score: f64,
}

#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// The `k` documents most similar to `query`, best first.
    async fn top_k(&self, query: &[f32], k: usize) -> Result<Vec<ScoredDocument>, StoreError>;
}

/// `dot(a, b) / (|a| · |b|)`, accumulated in f64.
///
/// Zero-norm vectors and mismatched dimensions score 0 instead of erroring,
/// so one malformed stored embedding cannot break a search.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0_f64, 0.0_f64, 0.0_f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let similarity = dot / (norm_a.sqrt() * norm_b.sqrt());
    if similarity.is_finite() {
        similarity
    } else {
        0.0
    }
}

/// Scores every document and keeps the best `k`. The sort is stable, so equal
/// scores keep scan order.
pub fn rank(query: &[f32], documents: Vec<ReferenceDocument>, k: usize) -> Vec<ScoredDocument> {
    let mut scored: Vec<ScoredDocument> = documents
        .into_iter()
        .map(|document| ScoredDocument {
            score: cosine_similarity(query, &document.embedding),
            document,
        })
        .collect();
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(k);
    scored
}

/// Brute-force index that reads the full corpus on every query.
pub struct LinearScanIndex {
    store: Arc<dyn ReferenceStore>,
}

impl LinearScanIndex {
    pub fn new(store: Arc<dyn ReferenceStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SimilarityIndex for LinearScanIndex {
    async fn top_k(&self, query: &[f32], k: usize) -> Result<Vec<ScoredDocument>, StoreError> {
        let documents = self.store.list_all().await?;
        Ok(rank(query, documents, k))
    }
}
