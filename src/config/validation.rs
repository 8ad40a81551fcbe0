use super::models::Config;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Worker count must be positive: {field} = 0")]
    ZeroWorkers { field: &'static str },

    #[error("max_retries must be at least 1 ({field})")]
    ZeroRetries { field: &'static str },

    #[error("discovery.page_sizes must contain at least one positive size")]
    NoPageSizes,

    #[error("discovery.max_pages must be at least 2, got {0}")]
    TooFewPages(usize),

    #[error("jobs.log_capacity must be positive")]
    ZeroLogCapacity,

    #[error("jobs.log_tail ({tail}) exceeds jobs.log_capacity ({capacity})")]
    LogTailExceedsCapacity { tail: usize, capacity: usize },

    #[error("Invalid URL for {field}: '{value}'")]
    InvalidUrl { field: &'static str, value: String },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_fetch(config)?;
    validate_discovery(config)?;
    validate_jobs(config)?;
    validate_source(config)?;
    Ok(())
}

fn validate_fetch(config: &Config) -> Result<(), ValidationError> {
    if config.fetch.max_retries == 0 {
        return Err(ValidationError::ZeroRetries {
            field: "fetch.max_retries",
        });
    }
    if config.fetch.probe_max_retries == 0 {
        return Err(ValidationError::ZeroRetries {
            field: "fetch.probe_max_retries",
        });
    }
    Ok(())
}

fn validate_discovery(config: &Config) -> Result<(), ValidationError> {
    let discovery = &config.discovery;
    if discovery.page_sizes.is_empty() || discovery.page_sizes.contains(&0) {
        return Err(ValidationError::NoPageSizes);
    }
    if discovery.max_pages < 2 {
        return Err(ValidationError::TooFewPages(discovery.max_pages));
    }
    for (field, value) in [
        ("discovery.default_workers", discovery.default_workers),
        ("discovery.max_workers", discovery.max_workers),
    ] {
        if value == 0 {
            return Err(ValidationError::ZeroWorkers { field });
        }
    }
    Ok(())
}

fn validate_jobs(config: &Config) -> Result<(), ValidationError> {
    let jobs = &config.jobs;
    for (field, value) in [
        ("jobs.collection_workers", jobs.collection_workers),
        ("jobs.tour_workers", jobs.tour_workers),
    ] {
        if value == 0 {
            return Err(ValidationError::ZeroWorkers { field });
        }
    }
    if jobs.log_capacity == 0 {
        return Err(ValidationError::ZeroLogCapacity);
    }
    if jobs.log_tail > jobs.log_capacity {
        return Err(ValidationError::LogTailExceedsCapacity {
            tail: jobs.log_tail,
            capacity: jobs.log_capacity,
        });
    }
    Ok(())
}

fn validate_source(config: &Config) -> Result<(), ValidationError> {
    let source = &config.source;
    let urls = [("source.base_url", &source.base_url), ("source.api_base", &source.api_base)]
        .into_iter()
        .chain(source.collections.iter().map(|url| ("source.collections", url)));

    for (field, value) in urls {
        if !(value.starts_with("http://") || value.starts_with("https://")) {
            return Err(ValidationError::InvalidUrl {
                field,
                value: value.clone(),
            });
        }
    }
    Ok(())
}
