pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use crate::documents::handlers as documents;
use crate::evaluation::handlers as evaluation;
use crate::rag::handlers as rag;
use crate::state::AppState;

/// Slack on top of two maximum-size files for multipart framing.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state
        .config
        .max_file_size
        .saturating_mul(2)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/health", get(health::health_handler))
        // Documents
        .route(
            "/api/v1/upload",
            post(documents::handle_upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/api/v1/upload-with-content",
            post(documents::handle_upload_with_content).layer(DefaultBodyLimit::max(upload_limit)),
        )
        // Evaluation jobs
        .route("/api/v1/evaluate", post(evaluation::handle_evaluate))
        .route("/api/v1/result/:id", get(evaluation::handle_get_result))
        .route("/api/v1/job/:id", get(evaluation::handle_get_job))
        .route("/api/v1/jobs", get(evaluation::handle_list_jobs))
        // Queue administration
        .route(
            "/api/v1/queue",
            get(evaluation::handle_queue_status).delete(evaluation::handle_clear_queue),
        )
        .route(
            "/api/v1/queue/:id",
            delete(evaluation::handle_remove_from_queue),
        )
        // Retrieval corpus
        .route(
            "/api/v1/reference-documents",
            post(rag::handle_create_reference_document),
        )
        .with_state(state)
}
