use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::StoreError;
use crate::models::reference::ReferenceDocument;

/// Persistence for reference documents. Documents are insert-only.
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    async fn insert(&self, document: &ReferenceDocument) -> Result<(), StoreError>;

    /// Every document, in a stable scan order.
    async fn list_all(&self) -> Result<Vec<ReferenceDocument>, StoreError>;

    async fn count(&self) -> Result<i64, StoreError>;
}

#[derive(Clone)]
pub struct PgReferenceStore {
    db: PgPool,
}

impl PgReferenceStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ReferenceStore for PgReferenceStore {
    async fn insert(&self, document: &ReferenceDocument) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO reference_documents
                (id, title, description, requirements, embedding, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(document.id)
        .bind(&document.title)
        .bind(&document.description)
        .bind(&document.requirements)
        .bind(&document.embedding)
        .bind(document.created_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<ReferenceDocument>, StoreError> {
        let documents = sqlx::query_as::<_, ReferenceDocument>(
            r#"
            SELECT id, title, description, requirements, embedding, created_at
            FROM reference_documents
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(documents)
    }

    async fn count(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reference_documents")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
pub use memory::InMemoryReferenceStore;
