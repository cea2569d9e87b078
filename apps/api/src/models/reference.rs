use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A stored job description used as retrieval context. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReferenceDocument {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub requirements: String,
    #[serde(skip_serializing, default)]
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

impl ReferenceDocument {
    pub fn new(title: &str, description: &str, requirements: &str, embedding: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: description.to_string(),
            requirements: requirements.to_string(),
            embedding,
            created_at: Utc::now(),
        }
    }

    /// The text that gets embedded for this document.
    pub fn embedding_text(title: &str, description: &str, requirements: &str) -> String {
        format!("Title: {title}\nDescription: {description}\nRequirements: {requirements}")
    }
}
