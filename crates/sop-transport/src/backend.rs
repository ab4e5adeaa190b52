//! Backends that deliver one payload to one URL.
//!
//! The [`ChatBackend`] seam separates "send this body there" from the tier
//! logic in the client. Production uses [`HttpBackend`]; tests plug in
//! scripted or fault-injecting backends.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONNECTION};

use crate::config::{ClientConfig, RetryPolicy};
use crate::error::TransportError;
use crate::payload::ChatPayload;

/// Raw HTTP reply: status and body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

/// Sends one payload to one URL.
pub trait ChatBackend: Send + Sync {
    /// POST `payload` to `url`, waiting at most `read_timeout` between
    /// successive reads of the reply. A slow but steady reply is not cut off.
    ///
    /// Transport-level failures are errors; any HTTP status is a reply.
    fn send(
        &self,
        url: &str,
        payload: &ChatPayload,
        read_timeout: Duration,
    ) -> impl Future<Output = Result<HttpReply, TransportError>> + Send;
}

/// reqwest-based backend.
///
/// A fresh client with at most one pooled connection is built for every
/// call, so no connection outlives the call that opened it.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    api_key: Option<String>,
    connect_timeout: Duration,
    retry: RetryPolicy,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            connect_timeout: config.connect_timeout,
            retry: config.http_retry.clone(),
        }
    }

    fn client(&self, read_timeout: Duration) -> Result<reqwest::Client, TransportError> {
        reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .read_timeout(read_timeout)
            .pool_max_idle_per_host(1)
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))
    }
}

fn classify(err: &reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Request(err.to_string())
    }
}

impl ChatBackend for HttpBackend {
    async fn send(
        &self,
        url: &str,
        payload: &ChatPayload,
        read_timeout: Duration,
    ) -> Result<HttpReply, TransportError> {
        let client = self.client(read_timeout)?;
        let mut retry = 0;

        loop {
            let mut request = client
                .post(url)
                .header(ACCEPT, "application/json")
                .header(CONNECTION, "close")
                .json(payload);
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }

            let outcome = request.send().await;
            let retryable = match &outcome {
                Ok(resp) => self.retry.should_retry_status(resp.status().as_u16()),
                Err(e) => e.is_connect() || e.is_timeout(),
            };

            if retryable && retry < self.retry.retries_max {
                let delay = self.retry.delay(retry);
                match &outcome {
                    Ok(resp) => tracing::debug!(url, status = resp.status().as_u16(), ?delay, "retrying request"),
                    Err(e) => tracing::debug!(url, error = %e, ?delay, "retrying request"),
                }
                drop(outcome);
                retry += 1;
                tokio::time::sleep(delay).await;
                continue;
            }

            let resp = outcome.map_err(|e| classify(&e))?;
            let status = resp.status().as_u16();
            let body = resp.text().await.map_err(|e| classify(&e))?;
            return Ok(HttpReply { status, body });
        }
    }
}
