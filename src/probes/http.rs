// src/probes/http.rs

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::{GateError, Result};
use crate::probes::{bounded, Probe};

/// Succeeds when a GET to `url` answers with a 2xx status
#[derive(Debug, Clone)]
pub struct HttpProbe {
    name: String,
    url: String,
    client: Client,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(name: impl Into<String>, url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GateError::Config(format!("cannot build HTTP client: {e}")))?;

        Ok(Self::with_client(name, url, client, timeout))
    }

    /// Share an existing client (connection pool, TLS config...) across probes
    pub fn with_client(
        name: impl Into<String>,
        url: impl Into<String>,
        client: Client,
        timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            client,
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn classify(&self, err: reqwest::Error) -> GateError {
        if err.is_timeout() {
            GateError::Timeout(self.timeout)
        } else {
            GateError::Transport(format!("GET {} failed: {}", self.url, err))
        }
    }
}

#[async_trait]
impl Probe for HttpProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn attempt(&self, cancel: &CancellationToken) -> Result<()> {
        bounded(cancel, self.timeout, async {
            let response = self
                .client
                .get(&self.url)
                .send()
                .await
                .map_err(|e| self.classify(e))?;

            // dropping the response releases the connection
            GateError::from_status(response.status().as_u16())
        })
        .await
    }
}
