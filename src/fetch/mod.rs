//! Page fetching with bounded retry
//!
//! [`Transport`] performs exactly one GET. [`RetryingFetcher`] wraps a
//! transport and retries connection/timeout failures with `2^attempt`
//! second backoff. HTTP error statuses are returned as-is so callers can
//! decide whether a non-200 page means "no data".

pub mod http;
pub mod retry;

pub use http::{HttpConfig, ReqwestTransport};
pub use retry::{RetryingFetcher, backoff_delay};

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP client error: {0}")]
    Client(String),
}

impl FetchError {
    /// Only connection and timeout failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Network(_) | FetchError::Timeout)
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// Raw response of a single GET, whatever its status.
#[derive(Debug, Clone)]
pub struct PageResponse {
    pub url: String,
    pub status: u16,
    pub body: Bytes,
}

impl PageResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// One HTTP GET, no retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        url: &str,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<PageResponse>;
}

/// Fetch seam consumed by discovery and downloaders.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(
        &self,
        url: &str,
        headers: &[(String, String)],
        max_retries: u32,
    ) -> Result<PageResponse>;
}
