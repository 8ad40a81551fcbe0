use crate::discovery::DiscoverySettings;
use crate::fetch::HttpConfig;
use crate::humanize::{ByteSize, HumanDuration};
use crate::jobs::{GpxOptions, PoolSettings};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    #[serde(default)]
    pub api: ApiLimits,
}

/// API request limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiLimits {
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: ByteSize,
    #[serde(default = "default_max_collections_per_job")]
    pub max_collections_per_job: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            api: ApiLimits::default(),
        }
    }
}

impl Default for ApiLimits {
    fn default() -> Self {
        Self {
            max_payload_bytes: default_max_payload_bytes(),
            max_collections_per_job: default_max_collections_per_job(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_max_payload_bytes() -> ByteSize {
    ByteSize(1024 * 1024) // 1 MB
}

fn default_max_collections_per_job() -> usize {
    100
}

/// HTTP fetching
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetchConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: HumanDuration,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: HumanDuration,
    /// Attempts per listing page and per GPX download
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Attempts per discovery probe
    #[serde(default = "default_probe_max_retries")]
    pub probe_max_retries: u32,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_headers")]
    pub default_headers: BTreeMap<String, String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout: default_connect_timeout(),
            request_timeout: default_request_timeout(),
            max_retries: default_max_retries(),
            probe_max_retries: default_probe_max_retries(),
            user_agent: default_user_agent(),
            default_headers: default_headers(),
        }
    }
}

impl FetchConfig {
    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            connect_timeout: self.connect_timeout.as_duration(),
            request_timeout: self.request_timeout.as_duration(),
            user_agent: self.user_agent.clone(),
            default_headers: self
                .default_headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

fn default_connect_timeout() -> HumanDuration {
    HumanDuration::from_secs(10)
}

fn default_request_timeout() -> HumanDuration {
    HumanDuration::from_secs(30)
}

fn default_max_retries() -> u32 {
    3
}

fn default_probe_max_retries() -> u32 {
    2
}

fn default_user_agent() -> String {
    concat!(
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 ",
        "(KHTML, like Gecko) Chrome/120.0 Safari/537.36"
    )
    .to_string()
}

fn default_headers() -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            "Accept".to_string(),
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
        ),
        ("Accept-Language".to_string(), "en-US,en;q=0.5".to_string()),
        ("Referer".to_string(), "https://www.komoot.com/".to_string()),
    ])
}

/// Collection discovery
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscoveryConfig {
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    #[serde(default = "default_page_sizes")]
    pub page_sizes: Vec<usize>,
    #[serde(default = "default_probe_workers")]
    pub default_workers: usize,
    #[serde(default = "default_max_probe_workers")]
    pub max_workers: usize,
    #[serde(default = "default_probe_delay_ms")]
    pub probe_delay_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            page_sizes: default_page_sizes(),
            default_workers: default_probe_workers(),
            max_workers: default_max_probe_workers(),
            probe_delay_ms: default_probe_delay_ms(),
        }
    }
}

impl DiscoveryConfig {
    pub fn settings(&self, fetch: &FetchConfig) -> DiscoverySettings {
        DiscoverySettings {
            max_pages: self.max_pages,
            page_sizes: self.page_sizes.clone(),
            default_workers: self.default_workers,
            max_workers: self.max_workers,
            probe_delay: Duration::from_millis(self.probe_delay_ms),
            base_max_retries: fetch.max_retries,
            probe_max_retries: fetch.probe_max_retries,
        }
    }
}

fn default_max_pages() -> usize {
    20
}

fn default_page_sizes() -> Vec<usize> {
    vec![50, 100, 200, 300, 500]
}

fn default_probe_workers() -> usize {
    5
}

fn default_max_probe_workers() -> usize {
    8
}

fn default_probe_delay_ms() -> u64 {
    200
}

/// Download job pools and status retention
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobsConfig {
    #[serde(default = "default_collection_workers")]
    pub collection_workers: usize,
    #[serde(default = "default_tour_workers")]
    pub tour_workers: usize,
    /// Log entries kept per job
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
    /// Log entries returned when polling
    #[serde(default = "default_log_tail")]
    pub log_tail: usize,
    #[serde(default)]
    pub gpx: GpxOptions,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            collection_workers: default_collection_workers(),
            tour_workers: default_tour_workers(),
            log_capacity: default_log_capacity(),
            log_tail: default_log_tail(),
            gpx: GpxOptions::default(),
        }
    }
}

impl JobsConfig {
    pub fn pools(&self) -> PoolSettings {
        PoolSettings {
            collection_workers: self.collection_workers,
            tour_workers: self.tour_workers,
        }
    }
}

fn default_collection_workers() -> usize {
    3
}

fn default_tour_workers() -> usize {
    5
}

fn default_log_capacity() -> usize {
    200
}

fn default_log_tail() -> usize {
    10
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    #[default]
    Memory,
    Local,
}

/// Where downloaded artifacts go
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub provider: StorageProvider,
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: StorageProvider::default(),
            root: default_storage_root(),
        }
    }
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("downloads")
}

/// Remote tour source
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Collection URLs that make up the "all tours" selection
    #[serde(default)]
    pub collections: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_base: default_api_base(),
            collections: Vec::new(),
        }
    }
}

fn default_base_url() -> String {
    "https://www.komoot.com".to_string()
}

fn default_api_base() -> String {
    "https://www.komoot.com/api/v007".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    /// Used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.server.api.max_payload_bytes.as_u64(), 1024 * 1024);
        assert_eq!(config.fetch.max_retries, 3);
        assert_eq!(config.fetch.probe_max_retries, 2);
        assert_eq!(config.discovery.page_sizes, vec![50, 100, 200, 300, 500]);
        assert_eq!(config.jobs.log_tail, 10);
        assert_eq!(config.storage.provider, StorageProvider::Memory);
    }

    #[test]
    fn test_derived_settings() {
        let config = Config::default();

        let http = config.fetch.http_config();
        assert_eq!(http.request_timeout, Duration::from_secs(30));
        assert_eq!(http.default_headers.len(), 3);

        let discovery = config.discovery.settings(&config.fetch);
        assert_eq!(discovery.probe_delay, Duration::from_millis(200));
        assert_eq!(discovery.base_max_retries, 3);
        assert_eq!(discovery.probe_max_retries, 2);

        assert_eq!(config.jobs.pools().tour_workers, 5);
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config: Config = toml::from_str(
            r#"
[fetch]
request_timeout = "45s"

[jobs.gpx]
add_date = false

[storage]
provider = "local"
root = "/var/lib/tourfetch"
"#,
        )
        .unwrap();

        assert_eq!(config.fetch.request_timeout.as_duration(), Duration::from_secs(45));
        assert_eq!(config.fetch.max_retries, 3);
        assert!(!config.jobs.gpx.add_date);
        assert_eq!(config.jobs.tour_workers, 5);
        assert_eq!(config.storage.provider, StorageProvider::Local);
        assert_eq!(config.storage.root, PathBuf::from("/var/lib/tourfetch"));
        assert_eq!(config.server.api.max_collections_per_job, 100);
    }
}
