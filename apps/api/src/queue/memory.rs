//! In-process FIFO queue for tests.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use uuid::Uuid;

use super::{QueueError, WorkQueue};

#[derive(Default)]
pub struct InMemoryWorkQueue {
    items: Mutex<VecDeque<Uuid>>,
    ready: Notify,
}

impl InMemoryWorkQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkQueue for InMemoryWorkQueue {
    async fn push(&self, id: Uuid) -> Result<(), QueueError> {
        self.items.lock().await.push_back(id);
        self.ready.notify_one();
        Ok(())
    }

    async fn pop(&self) -> Result<Uuid, QueueError> {
        loop {
            if let Some(id) = self.items.lock().await.pop_front() {
                return Ok(id);
            }
            self.ready.notified().await;
        }
    }

    async fn len(&self) -> Result<usize, QueueError> {
        Ok(self.items.lock().await.len())
    }

    async fn clear(&self) -> Result<(), QueueError> {
        self.items.lock().await.clear();
        Ok(())
    }

    async fn remove(&self, id: Uuid) -> Result<usize, QueueError> {
        let mut items = self.items.lock().await;
        let before = items.len();
        items.retain(|queued| *queued != id);
        Ok(before - items.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = InMemoryWorkQueue::new();
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        for id in &ids {
            queue.push(*id).await.unwrap();
        }
        for id in &ids {
            assert_eq!(queue.pop().await.unwrap(), *id);
        }
    }

    #[tokio::test]
    async fn test_pop_waits_for_push() {
        let queue = Arc::new(InMemoryWorkQueue::new());
        let id = Uuid::new_v4();

        let popper = tokio::spawn({
            let queue = queue.clone();
            async move { queue.pop().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!popper.is_finished());

        queue.push(id).await.unwrap();
        assert_eq!(popper.await.unwrap().unwrap(), id);
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let queue = InMemoryWorkQueue::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        for id in [a, b, a] {
            queue.push(id).await.unwrap();
        }

        assert_eq!(queue.remove(a).await.unwrap(), 2);
        assert_eq!(queue.len().await.unwrap(), 1);
        queue.clear().await.unwrap();
        assert_eq!(queue.len().await.unwrap(), 0);
    }
}
