use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use super::{PageFetcher, PageResponse, Result, Transport};

/// Delay after failed attempt `attempt` (0-indexed): 1s, 2s, 4s, ...
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.min(16))
}

/// GET with bounded retry on connection/timeout failures.
pub struct RetryingFetcher<T> {
    transport: T,
    timeout: Duration,
}

impl<T: Transport> RetryingFetcher<T> {
    pub fn new(transport: T, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    /// Fetch `url`, making at most `max_retries` attempts in total.
    ///
    /// Non-2xx responses are returned without retry. The last network error
    /// is propagated once attempts are exhausted.
    pub async fn fetch(
        &self,
        url: &str,
        headers: &[(String, String)],
        max_retries: u32,
        timeout: Duration,
    ) -> Result<PageResponse> {
        let attempts = max_retries.max(1);
        let mut attempt = 0;

        loop {
            match self.transport.send(url, headers, timeout).await {
                Ok(response) => {
                    if attempt > 0 {
                        debug!(url, attempts = attempt + 1, "Fetch succeeded after retry");
                    }
                    return Ok(response);
                }
                Err(e) if e.is_retryable() && attempt + 1 < attempts => {
                    let delay = backoff_delay(attempt);
                    warn!(
                        url,
                        attempt = attempt + 1,
                        error = %e,
                        delay_secs = delay.as_secs(),
                        "Fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(url, attempts = attempt + 1, error = %e, "Fetch failed");
                    return Err(e);
                }
            }
        }
    }
}

#[async_trait]
impl<T: Transport> PageFetcher for RetryingFetcher<T> {
    async fn fetch_page(
        &self,
        url: &str,
        headers: &[(String, String)],
        max_retries: u32,
    ) -> Result<PageResponse> {
        self.fetch(url, headers, max_retries, self.timeout).await
    }
}
