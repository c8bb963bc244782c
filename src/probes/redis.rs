// src/probes/redis.rs

use async_trait::async_trait;
use redis::Client;
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::{GateError, Result};
use crate::probes::{bounded, Probe};

/// Opens a transient connection and expects `PONG` to a `PING`
pub struct RedisProbe {
    name: String,
    url: String,
    client: Client,
    timeout: Duration,
}

// Manually implement Debug, the client carries connection info we keep out of logs
impl fmt::Debug for RedisProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisProbe")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RedisProbe {
    /// Creates a probe for the given URL. The client does not connect yet.
    pub fn new(name: impl Into<String>, url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::open(url)
            .map_err(|e| GateError::Config(format!("invalid Redis URL '{}': {}", url, e)))?;

        Ok(Self {
            name: name.into(),
            url: url.to_string(),
            client,
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Probe for RedisProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn attempt(&self, cancel: &CancellationToken) -> Result<()> {
        bounded(cancel, self.timeout, async {
            // connection lives only for this attempt and is dropped on every path
            let mut conn = self.client.get_multiplexed_async_connection().await?;
            let reply = redis::AsyncCommands::ping::<String>(&mut conn).await?;

            if reply == "PONG" {
                Ok(())
            } else {
                Err(GateError::Transport(format!(
                    "Unexpected response from Redis PING: {}",
                    reply
                )))
            }
        })
        .await
    }
}
