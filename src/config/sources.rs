use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "TOURFETCH_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/tourfetch.toml";
const ENV_PREFIX: &str = "TOURFETCH";
const ENV_SEPARATOR: &str = "__";

/// Load configuration with priority (lowest first):
/// 1. Defaults (embedded in structs)
/// 2. TOML file, if present
/// 3. `.env` file (via dotenvy)
/// 4. Process environment
pub fn load() -> Result<Config, ConfigError> {
    let _ = dotenvy::dotenv();

    let config_path = env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    load_from_sources(config_path)
}

/// Load from a specific file plus the environment.
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::debug!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // TOURFETCH__JOBS__TOUR_WORKERS -> jobs.tour_workers
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .list_separator(",")
            .with_list_parse_key("discovery.page_sizes")
            .with_list_parse_key("source.collections")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_only() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.server.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.discovery.max_pages, 20);
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[server]
bind_addr = "127.0.0.1:9000"

[server.api]
max_payload_bytes = "256KB"

[fetch]
request_timeout = "45s"
max_retries = 5

[discovery]
page_sizes = [100, 1000]
probe_delay_ms = 0

[jobs]
tour_workers = 8

[jobs.gpx]
add_date = false
max_title_length = 40
skip_existing = false
include_metadata = false

[source]
collections = ["https://www.komoot.com/collection/1", "https://www.komoot.com/collection/2"]
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.server.bind_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(config.server.api.max_payload_bytes.as_u64(), 256 * 1024);
        assert_eq!(config.fetch.request_timeout.as_duration().as_secs(), 45);
        assert_eq!(config.fetch.max_retries, 5);
        assert_eq!(config.discovery.page_sizes, vec![100, 1000]);
        assert_eq!(config.jobs.tour_workers, 8);
        assert_eq!(config.jobs.gpx.max_title_length, 40);
        assert_eq!(config.source.collections.len(), 2);
        // untouched sections keep defaults
        assert_eq!(config.jobs.collection_workers, 3);
    }

    #[test]
    fn test_malformed_toml_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bad.toml");
        fs::write(&config_path, "[jobs\ntour_workers = ").unwrap();

        assert!(load_from_sources(config_path).is_err());
    }
}
