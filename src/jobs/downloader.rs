//! Per-tour download collaborator
//!
//! [`TourDownloader`] is the seam the orchestrator drives. [`GpxDownloader`]
//! is the production implementation: it fetches the tour's GPX export and
//! stores it under a per-collection folder.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::fetch::{FetchError, PageFetcher};
use crate::model::{CollectionRecord, DownloadResult, TourRef, date_part, is_tour_id};
use crate::storage::{StorageClient, StorageError};

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Failed(String),
}

/// Collection a tour is being downloaded for.
#[derive(Debug, Clone)]
pub struct CollectionContext {
    pub collection_id: String,
    pub collection_name: String,
    /// Storage prefix for this collection's artifacts
    pub folder: String,
}

impl CollectionContext {
    pub fn for_record(record: &CollectionRecord) -> Self {
        let name = record.display_name();
        Self {
            collection_id: record.id.clone(),
            folder: format!("collections/{}", collection_slug(&record.id, &name)),
            collection_name: name,
        }
    }
}

#[async_trait]
pub trait TourDownloader: Send + Sync {
    /// Per-collection setup. An error here drops the whole collection.
    async fn prepare_collection(
        &self,
        _record: &CollectionRecord,
        _ctx: &CollectionContext,
    ) -> Result<(), DownloadError> {
        Ok(())
    }

    async fn download_tour(
        &self,
        tour: &TourRef,
        ctx: &CollectionContext,
    ) -> Result<DownloadResult, DownloadError>;

    /// Called after every tour of the collection was attempted.
    async fn finish_collection(
        &self,
        _ctx: &CollectionContext,
        _results: &[DownloadResult],
    ) -> Result<(), DownloadError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GpxOptions {
    /// Prefix filenames with `YYYY-MM-DD-`
    pub add_date: bool,
    /// 0: id only; > 0: truncate title then append id; < 0: full title
    pub max_title_length: i32,
    pub skip_existing: bool,
    /// Write `collection_info.json` next to the tours
    pub include_metadata: bool,
}

impl Default for GpxOptions {
    fn default() -> Self {
        Self {
            add_date: true,
            max_title_length: -1,
            skip_existing: true,
            include_metadata: true,
        }
    }
}

pub struct GpxDownloader {
    fetcher: Arc<dyn PageFetcher>,
    storage: StorageClient,
    api_base: String,
    max_retries: u32,
    options: GpxOptions,
}

impl GpxDownloader {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        storage: StorageClient,
        api_base: impl Into<String>,
        max_retries: u32,
        options: GpxOptions,
    ) -> Self {
        Self {
            fetcher,
            storage,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            max_retries,
            options,
        }
    }

    fn gpx_url(&self, tour_id: &str) -> String {
        format!("{}/tours/{}/gpx", self.api_base, tour_id)
    }
}

#[async_trait]
impl TourDownloader for GpxDownloader {
    async fn prepare_collection(
        &self,
        record: &CollectionRecord,
        ctx: &CollectionContext,
    ) -> Result<(), DownloadError> {
        if !self.options.include_metadata {
            return Ok(());
        }
        let body =
            serde_json::to_vec_pretty(record).map_err(|e| DownloadError::Failed(e.to_string()))?;
        self.storage
            .upload(&format!("{}/collection_info.json", ctx.folder), body)
            .await?;
        Ok(())
    }

    async fn download_tour(
        &self,
        tour: &TourRef,
        ctx: &CollectionContext,
    ) -> Result<DownloadResult, DownloadError> {
        if !is_tour_id(&tour.id) {
            return Err(DownloadError::Failed(format!("invalid tour id '{}'", tour.id)));
        }
        let filename = gpx_filename(tour, &self.options);
        let key = format!("{}/{}", ctx.folder, filename);

        let mut result = DownloadResult::from_tour(tour);
        result.collection_id = Some(ctx.collection_id.clone());
        result.collection_name = Some(ctx.collection_name.clone());
        result.filename = Some(filename);
        result.location = Some(self.storage.location(&key));

        if self.options.skip_existing && self.storage.exists(&key).await? {
            debug!(tour_id = %tour.id, key, "GPX already stored, skipping");
            return Ok(result);
        }

        let url = self.gpx_url(&tour.id);
        let response = self.fetcher.fetch_page(&url, &[], self.max_retries).await?;
        if !response.is_success() {
            return Err(DownloadError::Status {
                status: response.status,
                url,
            });
        }

        self.storage.upload(&key, response.body.to_vec()).await?;
        Ok(result)
    }

    async fn finish_collection(
        &self,
        ctx: &CollectionContext,
        results: &[DownloadResult],
    ) -> Result<(), DownloadError> {
        let summary = json!({
            "collection_id": ctx.collection_id,
            "collection_name": ctx.collection_name,
            "downloaded": results.len(),
            "tours": results,
        });
        let body =
            serde_json::to_vec_pretty(&summary).map_err(|e| DownloadError::Failed(e.to_string()))?;
        self.storage
            .upload(&format!("{}/download_summary.json", ctx.folder), body)
            .await?;
        Ok(())
    }
}

/// Replace characters that are unsafe in filenames and collapse whitespace.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c| c == '.' || c == ' ')
        .to_string()
}

/// Folder name for a collection, at most 50 characters.
pub fn collection_slug(id: &str, name: &str) -> String {
    let mut slug = String::new();
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let slug: String = slug.chars().take(50).collect();
    let slug = slug.trim_matches('-');

    match (slug.is_empty(), id.is_empty()) {
        (true, true) => "collection".to_string(),
        (true, false) => id.to_string(),
        (false, true) => slug.to_string(),
        (false, false) => format!("{id}-{slug}"),
    }
}

/// `[YYYY-MM-DD-]<title>-<id>.gpx`, shaped by [`GpxOptions`].
pub fn gpx_filename(tour: &TourRef, options: &GpxOptions) -> String {
    let date_prefix = match (&tour.stats.date, options.add_date) {
        (Some(date), true) if !date.trim().is_empty() => format!("{}-", date_part(date)),
        _ => String::new(),
    };

    let title = sanitize_filename(&tour.display_name());
    let stem = match options.max_title_length {
        0 => tour.id.clone(),
        n if n > 0 && title.chars().count() > n as usize => {
            let cut: String = title.chars().take(n as usize).collect();
            format!("{}-{}", cut.trim_end(), tour.id)
        }
        _ => format!("{}-{}", title, tour.id),
    };

    format!("{date_prefix}{stem}.gpx")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{PageResponse, Result as FetchResult};
    use bytes::Bytes;

    struct StaticFetcher {
        status: u16,
    }

    #[async_trait]
    impl PageFetcher for StaticFetcher {
        async fn fetch_page(
            &self,
            url: &str,
            _headers: &[(String, String)],
            _max_retries: u32,
        ) -> FetchResult<PageResponse> {
            Ok(PageResponse {
                url: url.to_string(),
                status: self.status,
                body: Bytes::from_static(b"<gpx></gpx>"),
            })
        }
    }

    fn tour() -> TourRef {
        let mut t = TourRef::new("42", "Col du Galibier: north/south", "https://x/tour/42");
        t.stats.date = Some("2023-07-14T09:00:00.000+02:00".into());
        t.stats.distance = Some(34_500.0);
        t
    }

    fn context() -> CollectionContext {
        CollectionContext::for_record(&CollectionRecord::new("9", "Tour de France Climbs!", ""))
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("a/b: c?  d."), "a_b_ c_ d");
    }

    #[test]
    fn test_collection_slug() {
        assert_eq!(collection_slug("9", "Tour de France Climbs!"), "9-tour-de-france-climbs");
        assert_eq!(collection_slug("9", "!!!"), "9");
        assert!(collection_slug("1", &"x".repeat(80)).len() <= 52);
    }

    #[test]
    fn test_gpx_filename_variants() {
        let t = tour();
        let options = GpxOptions::default();
        assert_eq!(gpx_filename(&t, &options), "2023-07-14-Col du Galibier_ north_south-42.gpx");

        let id_only = GpxOptions {
            max_title_length: 0,
            add_date: false,
            ..Default::default()
        };
        assert_eq!(gpx_filename(&t, &id_only), "42.gpx");

        let short = GpxOptions {
            max_title_length: 6,
            add_date: false,
            ..Default::default()
        };
        assert_eq!(gpx_filename(&t, &short), "Col du-42.gpx");
    }

    #[tokio::test]
    async fn test_download_stores_gpx_and_enriches_result() {
        let storage = StorageClient::in_memory();
        let downloader = GpxDownloader::new(
            Arc::new(StaticFetcher { status: 200 }),
            storage.clone(),
            "https://x/api/v007/",
            3,
            GpxOptions::default(),
        );
        let ctx = context();

        let result = downloader.download_tour(&tour(), &ctx).await.unwrap();

        assert_eq!(result.collection_id.as_deref(), Some("9"));
        assert_eq!(result.distance_km, Some(34.5));
        let key = format!("{}/{}", ctx.folder, result.filename.unwrap());
        assert_eq!(storage.download(&key).await.unwrap(), b"<gpx></gpx>");
    }

    #[tokio::test]
    async fn test_non_200_is_status_error() {
        let downloader = GpxDownloader::new(
            Arc::new(StaticFetcher { status: 403 }),
            StorageClient::in_memory(),
            "https://x/api/v007",
            3,
            GpxOptions::default(),
        );

        let err = downloader.download_tour(&tour(), &context()).await.unwrap_err();

        match err {
            DownloadError::Status { status, url } => {
                assert_eq!(status, 403);
                assert_eq!(url, "https://x/api/v007/tours/42/gpx");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_numeric_id_is_rejected() {
        let downloader = GpxDownloader::new(
            Arc::new(StaticFetcher { status: 200 }),
            StorageClient::in_memory(),
            "https://x/api/v007",
            3,
            GpxOptions::default(),
        );
        let ctx = context();
        let tour = TourRef::new("1/../../admin", "Sneaky", "");

        let err = downloader.download_tour(&tour, &ctx).await.unwrap_err();

        assert!(matches!(err, DownloadError::Failed(msg) if msg.contains("invalid tour id")));
    }

    #[tokio::test]
    async fn test_collection_hooks_write_metadata() {
        let storage = StorageClient::in_memory();
        let downloader = GpxDownloader::new(
            Arc::new(StaticFetcher { status: 200 }),
            storage.clone(),
            "https://x",
            3,
            GpxOptions::default(),
        );
        let record = CollectionRecord::with_tours("9", "Tour de France Climbs!", "", vec![tour()]);
        let ctx = CollectionContext::for_record(&record);

        downloader.prepare_collection(&record, &ctx).await.unwrap();
        downloader.finish_collection(&ctx, &[]).await.unwrap();

        assert!(storage.exists(&format!("{}/collection_info.json", ctx.folder)).await.unwrap());
        assert!(storage.exists(&format!("{}/download_summary.json", ctx.folder)).await.unwrap());
    }
}
