pub mod api;
pub mod config;
pub mod discovery;
pub mod fetch;
pub mod humanize;
pub mod jobs;
pub mod model;
pub mod observability;
pub mod progress;
pub mod storage;
