use axum::{extract::State, http::StatusCode, Json};

use crate::errors::AppError;
use crate::models::reference::ReferenceDocument;
use crate::rag::ingest::{create_reference_document, NewReferenceDocument};
use crate::state::AppState;

/// POST /api/v1/reference-documents
pub async fn handle_create_reference_document(
    State(state): State<AppState>,
    Json(req): Json<NewReferenceDocument>,
) -> Result<(StatusCode, Json<ReferenceDocument>), AppError> {
    let document = create_reference_document(
        state.llm.as_ref(),
        state.references.as_ref(),
        state.config.llm_retry_policy(),
        &req,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(document)))
}
