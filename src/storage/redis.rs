use std::{sync::Arc, time::Duration};

use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use tokio::sync::OnceCell;

use crate::error::AppResult;

/// Redis handle; the multiplexed connection is opened on first use and
/// shared by every clone.
#[derive(Clone)]
pub struct RedisClient {
    client: Client,
    conn: Arc<OnceCell<MultiplexedConnection>>,
}

fn revoked_key(jti: &str) -> String {
    format!("revoked_token:{}", jti)
}

impl RedisClient {
    pub fn new(url: &str) -> AppResult<Self> {
        let client = Client::open(url)?;
        Ok(Self {
            client,
            conn: Arc::new(OnceCell::new()),
        })
    }

    pub async fn connection(&self) -> AppResult<MultiplexedConnection> {
        let conn = self
            .conn
            .get_or_try_init(|| self.client.get_multiplexed_async_connection())
            .await?;
        Ok(conn.clone())
    }

    /// Remember a logged-out token until it would have expired anyway.
    pub async fn revoke_token(&self, jti: &str, ttl: Duration) -> AppResult<()> {
        let mut conn = self.connection().await?;
        // SET EX rejects a zero expiry
        let seconds = ttl.as_secs().max(1);
        let _: () = conn.set_ex(revoked_key(jti), "1", seconds).await?;
        Ok(())
    }

    pub async fn is_token_revoked(&self, jti: &str) -> AppResult<bool> {
        let mut conn = self.connection().await?;
        let revoked: bool = conn.exists(revoked_key(jti)).await?;
        Ok(revoked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revoked_keys_are_namespaced() {
        assert_eq!(revoked_key("abc"), "revoked_token:abc");
    }

    #[test]
    fn client_creation_does_not_connect() {
        assert!(RedisClient::new("redis://127.0.0.1:1/0").is_ok());
        assert!(RedisClient::new("not a url").is_err());
    }
}
