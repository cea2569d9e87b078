use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use super::{parse_payload, QueueError, WorkQueue};

/// Redis list queue: `LPUSH` on submit, `BRPOP` on the worker side, which
/// makes the list FIFO.
///
/// The blocking pop gets its own connection so a parked `BRPOP` never stalls
/// the pushes and counts multiplexed on the shared one.
pub struct RedisWorkQueue {
    client: redis::Client,
    conn: MultiplexedConnection,
    pop_conn: Mutex<Option<MultiplexedConnection>>,
    key: String,
}

impl RedisWorkQueue {
    pub async fn connect(client: redis::Client, key: impl Into<String>) -> Result<Self, QueueError> {
        let conn = client.get_multiplexed_async_connection().await?;
        let key = key.into();
        info!("Redis work queue ready (key: {key})");
        Ok(Self {
            client,
            conn,
            pop_conn: Mutex::new(None),
            key,
        })
    }
}

#[async_trait]
impl WorkQueue for RedisWorkQueue {
    async fn push(&self, id: Uuid) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        conn.lpush::<_, _, ()>(&self.key, id.to_string()).await?;
        Ok(())
    }

    async fn pop(&self) -> Result<Uuid, QueueError> {
        let mut slot = self.pop_conn.lock().await;
        let mut conn = match slot.take() {
            Some(conn) => conn,
            None => self.client.get_multiplexed_async_connection().await?,
        };

        let reply: Result<Option<(String, String)>, redis::RedisError> = redis::cmd("BRPOP")
            .arg(&self.key)
            .arg(0)
            .query_async(&mut conn)
            .await;

        match reply {
            Ok(popped) => {
                *slot = Some(conn);
                match popped {
                    Some((_key, payload)) => parse_payload(&payload),
                    None => Err(QueueError::Unavailable("BRPOP returned no element".into())),
                }
            }
            Err(e) => {
                warn!("Dropping blocking-pop connection after error: {e}");
                Err(e.into())
            }
        }
    }

    async fn len(&self) -> Result<usize, QueueError> {
        let mut conn = self.conn.clone();
        Ok(conn.llen(&self.key).await?)
    }

    async fn clear(&self) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(&self.key).await?;
        Ok(())
    }

    async fn remove(&self, id: Uuid) -> Result<usize, QueueError> {
        let mut conn = self.conn.clone();
        Ok(conn.lrem(&self.key, 0, id.to_string()).await?)
    }
}
