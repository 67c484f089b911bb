/// Fetching of images embedded in the certificate

use futures::future::BoxFuture;

#[cfg(feature = "http")]
use crate::{Config, Error};
#[cfg(feature = "http")]
use reqwest::Client;
#[cfg(feature = "http")]
use std::time::Duration;

/// Upper bound on a single image download.
pub const MAX_IMAGE_BYTES: usize = 8 * 1024 * 1024;

pub trait ImageFetcher: Send + Sync {
    /// Raw encoded bytes for `url`, or a human-readable reason.
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, String>>;
}

impl std::fmt::Debug for dyn ImageFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ImageFetcher")
    }
}

/// Fetcher that never loads anything; images fall back to a placeholder.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopImageFetcher;

impl ImageFetcher for NoopImageFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, String>> {
        Box::pin(async move { Err(format!("image loading disabled ({})", url)) })
    }
}

#[cfg(feature = "http")]
pub struct HttpImageFetcher {
    client: Client,
}

#[cfg(feature = "http")]
impl HttpImageFetcher {
    pub fn new(config: &Config) -> crate::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[cfg(feature = "http")]
impl ImageFetcher for HttpImageFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, String>> {
        Box::pin(async move {
            let mut resp = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| format!("request failed: {}", e))?;
            if !resp.status().is_success() {
                return Err(format!("HTTP {}", resp.status().as_u16()));
            }
            if let Some(len) = resp.content_length() {
                if len > MAX_IMAGE_BYTES as u64 {
                    return Err(format!("image too large ({} bytes)", len));
                }
            }
            let mut body = Vec::new();
            while let Some(chunk) = resp.chunk().await.map_err(|e| format!("read failed: {}", e))? {
                if body.len() + chunk.len() > MAX_IMAGE_BYTES {
                    return Err(format!("image larger than {} bytes", MAX_IMAGE_BYTES));
                }
                body.extend_from_slice(&chunk);
            }
            Ok(body)
        })
    }
}
