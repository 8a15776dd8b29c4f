use async_trait::async_trait;
use reqwest::{Client, Response};
use std::time::Duration;

use super::ChunkSource;
use anyhow::{bail, Result};

/// Streaming HTTP reader for remote ZIP files
///
/// Issues a single GET request and hands out the response body as it
/// arrives, so the archive is never held in memory as a whole.
pub struct HttpStreamSource {
    response: Response,
    content_length: Option<u64>,
    transferred_bytes: u64,
}

impl HttpStreamSource {
    /// Open a streaming GET request
    ///
    /// Connecting is retried on timeouts and connection errors; once the
    /// body is streaming, errors are returned as is.
    pub async fn new(url: &str) -> Result<Self> {
        Self::with_retries(url, 10).await
    }

    pub async fn with_retries(url: &str, max_retry: u32) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        let mut retry_count = 0;
        let response = loop {
            match client.get(url).send().await {
                Ok(resp) => break resp,
                Err(e) if e.is_timeout() || e.is_connect() => {
                    retry_count += 1;
                    if retry_count >= max_retry {
                        bail!("Max retries exceeded");
                    }
                    log::warn!(
                        "Connection error, retry {}/{}: {}",
                        retry_count, max_retry, e
                    );
                    tokio::time::sleep(Duration::from_millis(500 * retry_count as u64)).await;
                }
                Err(e) => return Err(e.into()),
            }
        };

        if !response.status().is_success() {
            bail!("HTTP request failed with status: {}", response.status());
        }

        let content_length = response.content_length();
        Ok(Self {
            response,
            content_length,
            transferred_bytes: 0,
        })
    }

    /// Size announced by the server, if any
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Get total bytes transferred from network
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes
    }
}

#[async_trait]
impl ChunkSource for HttpStreamSource {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        match self.response.chunk().await? {
            Some(bytes) => {
                self.transferred_bytes += bytes.len() as u64;
                Ok(Some(bytes.to_vec()))
            }
            None => Ok(None),
        }
    }
}
