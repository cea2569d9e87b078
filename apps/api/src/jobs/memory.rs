//! In-process [`JobStore`] for tests. Applies the same transition rules as
//! the Postgres store through the [`Job`] methods.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{JobFilter, JobStore};
use crate::db::StoreError;
use crate::models::evaluation::EvaluationResult;
use crate::models::job::{Job, JobStatus, TransitionError};

#[derive(Default)]
struct Inner {
    jobs: HashMap<Uuid, Job>,
    /// Creation order, for deterministic listing.
    order: Vec<Uuid>,
}

#[derive(Default)]
pub struct InMemoryJobStore {
    inner: Mutex<Inner>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `apply` to the job under the lock, so readers see either the
    /// old or the new record.
    async fn mutate<T>(
        &self,
        id: Uuid,
        apply: impl FnOnce(&mut Job) -> Result<T, TransitionError>,
    ) -> Result<T, StoreError> {
        let mut inner = self.inner.lock().await;
        let job = inner.jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        let mut updated = job.clone();
        let value = apply(&mut updated).map_err(|source| StoreError::InvalidTransition { id, source })?;
        *job = updated;
        Ok(value)
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, job: &Job) -> Result<Uuid, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.order.push(job.id);
        inner.jobs.insert(job.id, job.clone());
        Ok(job.id)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        Ok(self.inner.lock().await.jobs.get(&id).cloned())
    }

    async fn update_status(&self, id: Uuid, status: JobStatus) -> Result<Job, StoreError> {
        self.mutate(id, |job| {
            match status {
                JobStatus::Processing => job.start(Utc::now())?,
                to => {
                    return Err(TransitionError {
                        from: job.status,
                        to,
                    })
                }
            }
            Ok(job.clone())
        })
        .await
    }

    async fn update_result(
        &self,
        id: Uuid,
        result: &EvaluationResult,
    ) -> Result<Job, StoreError> {
        self.mutate(id, |job| {
            job.complete(result.clone(), Utc::now())?;
            Ok(job.clone())
        })
        .await
    }

    async fn update_error(&self, id: Uuid, message: &str) -> Result<Job, StoreError> {
        self.mutate(id, |job| {
            job.fail(message, Utc::now())?;
            Ok(job.clone())
        })
        .await
    }

    async fn increment_retry(&self, id: Uuid) -> Result<u32, StoreError> {
        self.mutate(id, |job| {
            job.increment_retry(Utc::now());
            Ok(job.retry_count)
        })
        .await
    }

    async fn list_pending(&self) -> Result<Vec<Job>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .order
            .iter()
            .filter_map(|id| inner.jobs.get(id))
            .filter(|job| !job.status.is_terminal())
            .cloned()
            .collect())
    }

    async fn list_with_filter(&self, filter: JobFilter) -> Result<Vec<Job>, StoreError> {
        let filter = filter.normalized();
        let inner = self.inner.lock().await;
        Ok(inner
            .order
            .iter()
            .rev()
            .filter_map(|id| inner.jobs.get(id))
            .filter(|job| filter.status.map_or(true, |s| job.status == s))
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::evaluation::tests::sample_result;
    use crate::models::job::JobInput;

    async fn store_with_job() -> (InMemoryJobStore, Uuid) {
        let store = InMemoryJobStore::new();
        let id = store
            .create(&Job::new(JobInput::from_text("cv", "project")))
            .await
            .unwrap();
        (store, id)
    }

    #[tokio::test]
    async fn test_happy_path_transitions() {
        let (store, id) = store_with_job().await;

        let job = store.update_status(id, JobStatus::Processing).await.unwrap();
        assert!(job.started_at.is_some());

        let job = store.update_result(id, &sample_result()).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.is_consistent());
    }

    #[tokio::test]
    async fn test_terminal_states_are_sticky() {
        let (store, id) = store_with_job().await;
        store.update_error(id, "boom").await.unwrap();

        for attempt in [
            store.update_status(id, JobStatus::Processing).await,
            store.update_result(id, &sample_result()).await,
            store.update_error(id, "again").await,
        ] {
            assert!(matches!(
                attempt,
                Err(StoreError::InvalidTransition { .. })
            ));
        }
        let job = store.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error_message.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_update_status_refuses_terminal_target() {
        let (store, id) = store_with_job().await;
        store.update_status(id, JobStatus::Processing).await.unwrap();

        let err = store
            .update_status(id, JobStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));
        assert_eq!(
            store.get_by_id(id).await.unwrap().unwrap().status,
            JobStatus::Processing
        );
    }

    #[tokio::test]
    async fn test_second_claim_is_rejected() {
        let (store, id) = store_with_job().await;
        store.update_status(id, JobStatus::Processing).await.unwrap();
        assert!(store.update_status(id, JobStatus::Processing).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let store = InMemoryJobStore::new();
        let id = Uuid::new_v4();
        assert!(store.get_by_id(id).await.unwrap().is_none());
        assert!(matches!(
            store.increment_retry(id).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_retry_counter_is_monotonic_across_states() {
        let (store, id) = store_with_job().await;
        assert_eq!(store.increment_retry(id).await.unwrap(), 1);
        store.update_error(id, "x").await.unwrap();
        assert_eq!(store.increment_retry(id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_listing_filters_and_pages() {
        let store = InMemoryJobStore::new();
        let mut ids = Vec::new();
        for i in 0..5 {
            let job = Job::new(JobInput::from_text(format!("cv {i}"), "p"));
            ids.push(store.create(&job).await.unwrap());
        }
        store.update_error(ids[1], "bad").await.unwrap();
        store.update_status(ids[3], JobStatus::Processing).await.unwrap();

        let pending = store.list_pending().await.unwrap();
        assert_eq!(pending.len(), 4);
        assert_eq!(pending[0].id, ids[0]);

        let failed = store
            .list_with_filter(JobFilter {
                status: Some(JobStatus::Failed),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].id, ids[1]);

        let page = store
            .list_with_filter(JobFilter {
                status: None,
                limit: 2,
                offset: 1,
            })
            .await
            .unwrap();
        let page_ids: Vec<Uuid> = page.iter().map(|j| j.id).collect();
        assert_eq!(page_ids, [ids[3], ids[2]]);
    }
}
