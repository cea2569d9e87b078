//! Context Retriever: one similarity search per input document, merged into a
//! single deduplicated prompt context.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::evaluation::retry::{with_backoff, RetryPolicy};
use crate::llm_client::LlmService;
use crate::models::reference::ReferenceDocument;
use crate::rag::index::{ScoredDocument, SimilarityIndex};
use crate::rag::RagError;

const CONTEXT_HEADER: &str = "Relevant Job Descriptions:\n\n";

pub struct ContextRetriever {
    llm: Arc<dyn LlmService>,
    index: Arc<dyn SimilarityIndex>,
    top_k: usize,
    retry: RetryPolicy,
}

/// Reference documents selected for one evaluation, CV hits first.
#[derive(Debug, Clone, Default)]
pub struct RetrievedContext {
    pub documents: Vec<ReferenceDocument>,
}

impl RetrievedContext {
    /// Collapses duplicates by id, keeping first-seen order.
    fn merge(searches: [Vec<ScoredDocument>; 2]) -> Self {
        let mut seen = HashSet::new();
        let documents = searches
            .into_iter()
            .flatten()
            .filter(|hit| seen.insert(hit.document.id))
            .map(|hit| hit.document)
            .collect();
        Self { documents }
    }

    pub fn render(&self) -> String {
        let mut out = String::from(CONTEXT_HEADER);
        for doc in &self.documents {
            out.push_str(&format!(
                "Title: {}\nDescription: {}\nRequirements: {}\n\n",
                doc.title, doc.description, doc.requirements
            ));
        }
        out
    }
}

impl ContextRetriever {
    pub fn new(
        llm: Arc<dyn LlmService>,
        index: Arc<dyn SimilarityIndex>,
        top_k: usize,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            llm,
            index,
            top_k,
            retry,
        }
    }

    /// Either search failing fails the whole retrieval.
    pub async fn retrieve(
        &self,
        cv_text: &str,
        project_text: &str,
    ) -> Result<RetrievedContext, RagError> {
        if cv_text.trim().is_empty() {
            return Err(RagError::EmptyInput("cv"));
        }
        if project_text.trim().is_empty() {
            return Err(RagError::EmptyInput("project"));
        }

        let cv_hits = self.search("cv", cv_text).await?;
        let project_hits = self.search("project", project_text).await?;
        let context = RetrievedContext::merge([cv_hits, project_hits]);

        debug!("Retrieved {} reference document(s)", context.documents.len());
        Ok(context)
    }

    async fn search(&self, label: &str, text: &str) -> Result<Vec<ScoredDocument>, RagError> {
        let embedding = with_backoff(self.retry, &format!("{label} embedding"), || {
            self.llm.generate_embedding(text)
        })
        .await?;
        Ok(self.index.top_k(&embedding, self.top_k).await?)
    }
}
