//! Embedding-based retrieval: reference documents, a similarity index over
//! them, and the retriever that turns two input texts into prompt context.

pub mod handlers;
pub mod index;
pub mod ingest;
pub mod retriever;
pub mod store;

use thiserror::Error;

use crate::db::StoreError;
use crate::evaluation::retry::Exhausted;

pub use index::{LinearScanIndex, SimilarityIndex};
pub use retriever::ContextRetriever;
pub use store::{PgReferenceStore, ReferenceStore};

#[derive(Debug, Error)]
pub enum RagError {
    #[error("{0} text must not be empty")]
    EmptyInput(&'static str),

    #[error("embedding failed: {0}")]
    Embedding(#[from] Exhausted),

    #[error(transparent)]
    Store(#[from] StoreError),
}
