//! reqwest-backed transport

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::{FetchError, PageResponse, Result, Transport};

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
    /// Sent with every request; per-call headers override these by name.
    pub default_headers: Vec<(String, String)>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            user_agent: concat!("tourfetch/", env!("CARGO_PKG_VERSION")).to_string(),
            default_headers: Vec::new(),
        }
    }
}

pub struct ReqwestTransport {
    client: Client,
    default_headers: Vec<(String, String)>,
}

impl ReqwestTransport {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            client,
            default_headers: config.default_headers.clone(),
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        url: &str,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<PageResponse> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;

        let mut request = self.client.get(parsed).timeout(timeout);
        for (name, value) in &self.default_headers {
            if !headers.iter().any(|(n, _)| n.eq_ignore_ascii_case(name)) {
                request = request.header(name, value);
            }
        }
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(classify)?;

        debug!(url, status, size = body.len(), "Fetched page");

        Ok(PageResponse {
            url: url.to_string(),
            status,
            body,
        })
    }
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else if err.is_builder() {
        FetchError::Client(err.to_string())
    } else {
        FetchError::Network(err.to_string())
    }
}
