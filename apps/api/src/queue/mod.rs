//! Work Queue: FIFO handoff of job ids from submission to the worker.
//!
//! Delivery is at-least-once; the worker re-reads every popped id from the
//! job store and never trusts the queue for job state.

#[cfg(test)]
pub mod memory;
pub mod redis_queue;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub use redis_queue::RedisWorkQueue;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("queue unavailable: {0}")]
    Unavailable(String),

    #[error("invalid queue payload {0:?}")]
    InvalidPayload(String),
}

impl QueueError {
    /// Infrastructure failures the worker should back off from. A bad payload
    /// is already consumed, so popping again right away is fine.
    pub fn needs_backoff(&self) -> bool {
        !matches!(self, QueueError::InvalidPayload(_))
    }
}

#[async_trait]
pub trait WorkQueue: Send + Sync {
    async fn push(&self, id: Uuid) -> Result<(), QueueError>;

    /// Waits indefinitely for the next id.
    async fn pop(&self) -> Result<Uuid, QueueError>;

    async fn len(&self) -> Result<usize, QueueError>;

    async fn clear(&self) -> Result<(), QueueError>;

    /// Drops every pending occurrence of `id`. Returns how many were removed.
    async fn remove(&self, id: Uuid) -> Result<usize, QueueError>;
}

pub(crate) fn parse_payload(raw: &str) -> Result<Uuid, QueueError> {
    Uuid::parse_str(raw.trim()).map_err(|_| QueueError::InvalidPayload(raw.to_string()))
}
