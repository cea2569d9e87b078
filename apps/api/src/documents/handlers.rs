use axum::{extract::Multipart, extract::State, Json};
use bytes::Bytes;
use serde::Serialize;
use tracing::warn;

use crate::documents::{DocumentError, DocumentStore, StoredDocument};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct UploadResponse {
    pub cv_file: StoredDocument,
    pub project_file: StoredDocument,
}

#[derive(Serialize)]
pub struct UploadWithContentResponse {
    pub cv_file: StoredDocument,
    pub project_file: StoredDocument,
    pub cv_content: String,
    pub project_content: String,
}

/// POST /api/v1/upload
/// Multipart body with `cv_file` and `project_file` parts.
pub async fn handle_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let (cv_file, project_file) = receive_pair(&state.documents, multipart).await?;
    Ok(Json(UploadResponse {
        cv_file,
        project_file,
    }))
}

/// POST /api/v1/upload-with-content
/// Same body as `/upload`; also returns the extracted text of both files.
pub async fn handle_upload_with_content(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadWithContentResponse>, AppError> {
    let documents = state.documents.as_ref();
    let (cv_file, project_file) = receive_pair(documents, multipart).await?;

    let extracted = async {
        let cv = documents.read_text(&cv_file.file_name).await?;
        let project = documents.read_text(&project_file.file_name).await?;
        Ok::<_, DocumentError>((cv, project))
    }
    .await;

    match extracted {
        Ok((cv_content, project_content)) => Ok(Json(UploadWithContentResponse {
            cv_file,
            project_file,
            cv_content,
            project_content,
        })),
        Err(e) => {
            discard(documents, vec![cv_file, project_file]).await;
            Err(e.into())
        }
    }
}

/// Saves both parts. On any failure, whatever was already written is deleted
/// before the error is returned.
async fn receive_pair(
    documents: &DocumentStore,
    mut multipart: Multipart,
) -> Result<(StoredDocument, StoredDocument), AppError> {
    let mut cv_file = None;
    let mut project_file = None;

    if let Err(e) = read_parts(documents, &mut multipart, &mut cv_file, &mut project_file).await {
        discard(documents, cv_file.into_iter().chain(project_file).collect()).await;
        return Err(e);
    }

    match (cv_file, project_file) {
        (Some(cv_file), Some(project_file)) => Ok((cv_file, project_file)),
        (cv_file, project_file) => {
            let missing = if cv_file.is_none() {
                "cv_file"
            } else {
                "project_file"
            };
            discard(documents, cv_file.into_iter().chain(project_file).collect()).await;
            Err(AppError::Validation(format!("{missing} is required")))
        }
    }
}

async fn read_parts(
    documents: &DocumentStore,
    multipart: &mut Multipart,
    cv_file: &mut Option<StoredDocument>,
    project_file: &mut Option<StoredDocument>,
) -> Result<(), AppError> {
    while let Some(field) = multipart.next_field().await? {
        let slot = match field.name() {
            Some("cv_file") => &mut *cv_file,
            Some("project_file") => &mut *project_file,
            _ => continue,
        };
        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::Validation("file part is missing a file name".into()))?;
        let bytes: Bytes = field.bytes().await?;
        let saved = documents.save(&file_name, &bytes).await?;
        // A repeated part replaces the earlier file
        if let Some(previous) = slot.take() {
            if previous.file_name != saved.file_name {
                discard(documents, vec![previous]).await;
            }
        }
        *slot = Some(saved);
    }
    Ok(())
}

async fn discard(documents: &DocumentStore, files: Vec<StoredDocument>) {
    for file in files {
        if let Err(e) = documents.remove(&file.file_name).await {
            warn!("Failed to remove upload {}: {e}", file.file_name);
        }
    }
}
