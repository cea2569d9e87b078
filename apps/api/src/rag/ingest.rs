//! Reference-document ingestion and the startup seed.

use serde::Deserialize;
use tracing::info;

use crate::evaluation::retry::{with_backoff, RetryPolicy};
use crate::llm_client::LlmService;
use crate::models::reference::ReferenceDocument;
use crate::rag::store::ReferenceStore;
use crate::rag::RagError;

#[derive(Debug, Clone, Deserialize)]
pub struct NewReferenceDocument {
    pub title: String,
    pub description: String,
    pub requirements: String,
}

/// Embeds the document text and persists the document.
pub async fn create_reference_document(
    llm: &dyn LlmService,
    store: &dyn ReferenceStore,
    retry: RetryPolicy,
    new: &NewReferenceDocument,
) -> Result<ReferenceDocument, RagError> {
    if new.title.trim().is_empty() {
        return Err(RagError::EmptyInput("title"));
    }
    if new.description.trim().is_empty() && new.requirements.trim().is_empty() {
        return Err(RagError::EmptyInput("description"));
    }

    let text = ReferenceDocument::embedding_text(&new.title, &new.description, &new.requirements);
    let embedding = with_backoff(retry, "reference embedding", || {
        llm.generate_embedding(&text)
    })
    .await?;

    let document =
        ReferenceDocument::new(&new.title, &new.description, &new.requirements, embedding);
    store.insert(&document).await?;

    info!(
        "Reference document created: id={}, title={:?}, dims={}",
        document.id,
        document.title,
        document.embedding.len()
    );
    Ok(document)
}

/// Ingests the default corpus when the store is empty. Returns how many
/// documents were created.
pub async fn seed_defaults(
    llm: &dyn LlmService,
    store: &dyn ReferenceStore,
    retry: RetryPolicy,
) -> Result<usize, RagError> {
    let existing = store.count().await?;
    if existing > 0 {
        info!("Reference corpus already has {existing} document(s), skipping seed");
        return Ok(0);
    }

    let defaults = default_corpus();
    for document in &defaults {
        create_reference_document(llm, store, retry, document).await?;
    }
    Ok(defaults.len())
}

pub fn default_corpus() -> Vec<NewReferenceDocument> {
    vec![NewReferenceDocument {
        title: "Product Engineer (Backend)".into(),
        description: "Build and operate the backend services behind an AI-assisted \
            product. Design APIs and data models, wire LLM calls into reliable \
            pipelines with retrieval, prompt chaining and structured outputs, and \
            own features end to end from design to production monitoring. Work \
            closely with product and frontend engineers in small, fast iterations."
            .into(),
        requirements: "Strong backend fundamentals in at least one of Rust, Go, \
            Python or Node.js. Experience with relational databases (PostgreSQL or \
            MySQL), caching and queues (Redis). REST API design, authentication and \
            background job processing. Familiarity with cloud deployment, Docker \
            and CI. Hands-on exposure to LLM APIs, embeddings and vector search. \
            Writes tests, handles failures with retries and timeouts, and \
            documents decisions clearly."
            .into(),
    }]
}
