use anyhow::Result;
use redis::{AsyncCommands, Client};
use tracing::warn;

/// Redis-backed page cache. List pages are stored as their serialized
/// response bodies under the full request path including the query string;
/// entries expire on their own; nothing in the write paths invalidates them.
#[derive(Clone)]
pub struct PageCache {
    client: Client,
}

impl PageCache {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;
        let mut conn = client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(Self { client })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }

    /// Cache lookup failures are treated as misses; the page is recomputed.
    pub async fn get_page(&self, key: &str) -> Option<String> {
        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(_) => return None,
        };
        conn.get::<_, Option<String>>(key).await.ok().flatten()
    }

    pub async fn store_page(&self, key: &str, body: &str, ttl_seconds: u64) {
        if let Ok(mut conn) = self.client.get_multiplexed_async_connection().await {
            if let Err(err) = conn.set_ex::<_, _, ()>(key, body, ttl_seconds).await {
                warn!(error = ?err, key, "failed to write page cache");
            }
        }
    }
}
