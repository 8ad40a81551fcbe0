use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tower::ServiceExt; // for `oneshot`

use tourfetch::api::{self, AppState};
use tourfetch::config::{ByteSize, Config};
use tourfetch::discovery::{CollectionDiscoverer, DiscoverySettings, LinkScanParser};
use tourfetch::fetch::{FetchError, PageFetcher, PageResponse};
use tourfetch::jobs::{
    CollectionContext, DownloadError, JobManager, JobOrchestrator, PoolSettings, SetupError,
    TourDownloader, TourSource,
};
use tourfetch::model::{DownloadResult, TourRef};
use tourfetch::observability::Metrics;
use tourfetch::progress::ProgressTracker;

/// App wired from the default config: memory storage and no source
/// collections, so nothing here touches the network.
fn build_test_app(config: Config) -> Router {
    let state = api::build_state(config).expect("Failed to build app state");
    api::router(state)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, json)
}

fn post_json(uri: &str, payload: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn wait_until_settled(app: &Router) -> Value {
    for _ in 0..100 {
        let (_, status) = send(app, get("/jobs/status")).await;
        if status["status"] != "running" {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job did not settle");
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = build_test_app(Config::default());
    let (status, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["job_state"], "idle");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["metrics"]["jobs_started"], 0);
}

#[tokio::test]
async fn test_initial_status_and_results() {
    let app = build_test_app(Config::default());

    let (status, body) = send(&app, get("/jobs/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "idle");
    assert_eq!(body["progress"], 0.0);

    let (status, body) = send(&app, get("/jobs/results")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_start_job_rejects_wrong_content_type() {
    let app = build_test_app(Config::default());
    let request = Request::builder()
        .method("POST")
        .uri("/jobs")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from(r#"{"selection":{"kind":"all_tours"}}"#))
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_PAYLOAD");
}

#[tokio::test]
async fn test_start_job_rejects_malformed_json() {
    let app = build_test_app(Config::default());
    let request = Request::builder()
        .method("POST")
        .uri("/jobs")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_start_job_validation() {
    let app = build_test_app(Config::default());

    let blank = json!({"selection": {"kind": "tour", "id": "  "}});
    let (status, body) = send(&app, post_json("/jobs", blank)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("tour id"));

    let empty_chunk = json!({"selection": {"kind": "all_tours"}, "chunk": {"start": 0, "size": 0}});
    let (status, _) = send(&app, post_json("/jobs", empty_chunk)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let no_collections = json!({"selection": {"kind": "collections", "collections": []}});
    let (status, _) = send(&app, post_json("/jobs", no_collections)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let unknown = json!({"selection": {"kind": "everything"}});
    let (status, _) = send(&app, post_json("/jobs", unknown)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_start_job_rejects_path_like_tour_id() {
    let app = build_test_app(Config::default());

    let payload = json!({"selection": {"kind": "tour", "id": "1/../../x"}});
    let (status, body) = send(&app, post_json("/jobs", payload)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("must be numeric"));
    let (_, status) = send(&app, get("/jobs/status")).await;
    assert_eq!(status["status"], "idle");
}

#[tokio::test]
async fn test_payload_too_large() {
    let mut config = Config::default();
    config.server.api.max_payload_bytes = ByteSize(64);
    let app = build_test_app(config);

    let name = "x".repeat(200);
    let (status, body) = send(
        &app,
        post_json("/jobs", json!({"selection": {"kind": "tour", "id": "1", "name": name}})),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");
}

#[tokio::test]
async fn test_all_tours_job_without_source_fails_setup() {
    let app = build_test_app(Config::default());

    let payload = json!({"selection": {"kind": "all_tours"}});
    let (status, body) = send(&app, post_json("/jobs", payload)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["accepted"], true);
    assert!(!body["job_id"].as_str().unwrap().is_empty());

    let status = wait_until_settled(&app).await;
    assert_eq!(status["status"], "error");
    assert!(status["error"].as_str().unwrap().contains("no source collections"));
    assert_eq!(status["job_id"], body["job_id"]);
}

#[tokio::test]
async fn test_clear_and_stop_when_idle() {
    let app = build_test_app(Config::default());

    let (status, body) = send(&app, post_json("/jobs/clear", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = send(&app, post_json("/jobs/stop", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stopped"], false);
    assert_eq!(body["status"], "idle");
}

#[tokio::test]
async fn test_discover_rejects_non_collection_url() {
    let app = build_test_app(Config::default());

    let (status, body) = send(
        &app,
        post_json("/collections/discover", json!({"url": "https://www.komoot.com/tour/1"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_PAYLOAD");
}

#[tokio::test]
async fn test_unknown_route() {
    let app = build_test_app(Config::default());
    let (status, _) = send(&app, get("/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

struct OfflineFetcher;

#[async_trait]
impl PageFetcher for OfflineFetcher {
    async fn fetch_page(
        &self,
        url: &str,
        _: &[(String, String)],
        _: u32,
    ) -> Result<PageResponse, FetchError> {
        Err(FetchError::Network(format!("offline: {url}")))
    }
}

struct OneTour;

#[async_trait]
impl TourSource for OneTour {
    async fn list_tours(&self, _: &ProgressTracker) -> Result<Vec<TourRef>, SetupError> {
        Ok(vec![TourRef::new("1", "Morning loop", "")])
    }
}

struct GatedDownloader(Arc<Semaphore>);

#[async_trait]
impl TourDownloader for GatedDownloader {
    async fn download_tour(
        &self,
        tour: &TourRef,
        _: &CollectionContext,
    ) -> Result<DownloadResult, DownloadError> {
        let _permit = self
            .0
            .acquire()
            .await
            .map_err(|e| DownloadError::Failed(e.to_string()))?;
        Ok(DownloadResult::from_tour(tour))
    }
}

#[tokio::test]
async fn test_clear_while_running_conflicts() {
    let gate = Arc::new(Semaphore::new(0));
    let metrics = Arc::new(Metrics::new());
    let discoverer = Arc::new(CollectionDiscoverer::new(
        Arc::new(OfflineFetcher),
        Arc::new(LinkScanParser::new("https://www.komoot.com")),
        DiscoverySettings::default(),
        Arc::clone(&metrics),
    ));
    let orchestrator = JobOrchestrator::new(
        Arc::new(GatedDownloader(Arc::clone(&gate))),
        PoolSettings::default(),
        Arc::clone(&metrics),
    );
    let jobs = JobManager::new(
        Arc::new(ProgressTracker::default()),
        Arc::new(orchestrator),
        Arc::clone(&discoverer),
        Arc::new(OneTour),
        Arc::clone(&metrics),
    );
    let app = api::router(AppState::new(Config::default(), jobs, discoverer, metrics));

    let payload = json!({"selection": {"kind": "all_tours"}});
    let (status, _) = send(&app, post_json("/jobs", payload)).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, body) = send(&app, post_json("/jobs/clear", json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    gate.add_permits(1);
    let status = wait_until_settled(&app).await;
    assert_eq!(status["status"], "completed");
    assert_eq!(status["results"][0]["name"], "Morning loop");

    let (_, body) = send(&app, get("/jobs/results")).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, post_json("/jobs/clear", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&app, get("/jobs/results")).await;
    assert_eq!(body, json!([]));
}
