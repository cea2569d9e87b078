use std::sync::Arc;

use crate::config::Config;
use crate::documents::DocumentStore;
use crate::jobs::JobStore;
use crate::llm_client::LlmService;
use crate::queue::WorkQueue;
use crate::rag::ReferenceStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<dyn JobStore>,
    pub queue: Arc<dyn WorkQueue>,
    pub references: Arc<dyn ReferenceStore>,
    pub documents: Arc<DocumentStore>,
    pub llm: Arc<dyn LlmService>,
    pub config: Config,
}
