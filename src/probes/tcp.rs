// src/probes/tcp.rs

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use crate::error::{GateError, Result};
use crate::probes::{bounded, Probe};

/// Succeeds when a TCP connection to `address` can be established
#[derive(Debug, Clone)]
pub struct TcpProbe {
    name: String,
    address: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(name: impl Into<String>, address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            timeout,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl Probe for TcpProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn attempt(&self, cancel: &CancellationToken) -> Result<()> {
        bounded(cancel, self.timeout, async {
            let mut stream = TcpStream::connect(&self.address).await.map_err(|e| {
                GateError::Transport(format!("connect to {} failed: {}", self.address, e))
            })?;
            // the peer may already have closed; the connect is what counts
            let _ = stream.shutdown().await;
            Ok(())
        })
        .await
    }
}
