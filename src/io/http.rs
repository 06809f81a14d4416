use async_trait::async_trait;
use reqwest::header::{self, HeaderMap};
use reqwest::{Client, Response, StatusCode};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use super::ReadAt;
use anyhow::{Result, anyhow, bail};

/// Reader for an archive published over HTTP.
///
/// Only the byte ranges the ZIP layer asks for are fetched, so listing a
/// large remote archive costs a few small requests at its tail and importing
/// one image costs one more.
pub struct HttpRangeReader {
    client: Client,
    url: String,
    size: u64,
    transferred_bytes: AtomicU64,
    requests: AtomicU64,
    max_retry: u32,
}

impl HttpRangeReader {
    pub const DEFAULT_MAX_RETRY: u32 = 5;

    /// Connect to `url`, checking with a HEAD request that the server honours
    /// byte ranges and reports the archive size.
    pub async fn new(url: String) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Self::with_client(client, url).await
    }

    /// Same as [`HttpRangeReader::new`] but reuses an existing client.
    pub async fn with_client(client: Client, url: String) -> Result<Self> {
        let resp = client.head(&url).send().await?;
        if !resp.status().is_success() {
            bail!("HTTP request failed with status: {}", resp.status());
        }
        let size = archive_size(resp.headers())?;
        debug!(url = %url, size, "remote archive");

        Ok(Self {
            client,
            url,
            size,
            transferred_bytes: AtomicU64::new(0),
            requests: AtomicU64::new(1),
            max_retry: Self::DEFAULT_MAX_RETRY,
        })
    }

    /// Give up on a range after this many connection failures.
    pub fn with_max_retry(mut self, max_retry: u32) -> Self {
        self.max_retry = max_retry.max(1);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Payload bytes received so far, HEAD excluded.
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }

    /// HTTP requests sent so far, HEAD included.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Accept only a partial reply that starts exactly at `start`.
    fn check_range(&self, resp: &Response, start: u64) -> Result<()> {
        match resp.status() {
            StatusCode::PARTIAL_CONTENT => {}
            StatusCode::OK => bail!("Server ignored the Range header for {}", self.url),
            status => bail!("HTTP request failed with status: {}", status),
        }

        match content_range_start(resp.headers()) {
            Some(served) if served != start => {
                bail!("Server answered range at {} instead of {}", served, start)
            }
            _ => Ok(()),
        }
    }
}

/// Archive size from a HEAD reply, refusing servers without byte ranges.
fn archive_size(headers: &HeaderMap) -> Result<u64> {
    let accept_ranges = headers
        .get(header::ACCEPT_RANGES)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("none");
    if !accept_ranges.contains("bytes") {
        bail!("Remote server does not support Range requests");
    }

    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| anyhow!("Remote server did not return Content-Length"))
}

/// First byte position of a `Content-Range: bytes a-b/total` header.
fn content_range_start(headers: &HeaderMap) -> Option<u64> {
    let value = headers.get(header::CONTENT_RANGE)?.to_str().ok()?;
    let (first, _) = value.strip_prefix("bytes ")?.split_once('-')?;
    first.trim().parse().ok()
}

#[async_trait]
impl ReadAt for HttpRangeReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() || offset >= self.size {
            return Ok(0);
        }

        let end = (offset + buf.len() as u64 - 1).min(self.size - 1);
        let expected = (end - offset + 1) as usize;

        let mut received = 0;
        let mut retry_count = 0;
        while received < expected {
            let start = offset + received as u64;
            self.requests.fetch_add(1, Ordering::Relaxed);

            let result = self
                .client
                .get(&self.url)
                .header(header::RANGE, format!("bytes={}-{}", start, end))
                .send()
                .await;

            match result {
                Ok(resp) => {
                    self.check_range(&resp, start)?;
                    let bytes = resp.bytes().await?;
                    if bytes.is_empty() {
                        bail!("Server returned an empty range at {}", start);
                    }
                    let chunk_len = bytes.len().min(expected - received);
                    buf[received..received + chunk_len].copy_from_slice(&bytes[..chunk_len]);
                    received += chunk_len;

                    self.transferred_bytes
                        .fetch_add(chunk_len as u64, Ordering::Relaxed);
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    retry_count += 1;
                    if retry_count >= self.max_retry {
                        bail!("Giving up on {} after {} retries: {}", self.url, retry_count, e);
                    }
                    warn!(
                        "Connection error, retry {}/{}: {}",
                        retry_count, self.max_retry, e
                    );
                    tokio::time::sleep(Duration::from_millis(500 * retry_count as u64)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(received)
    }

    fn size(&self) -> u64 {
        self.size
    }
}
