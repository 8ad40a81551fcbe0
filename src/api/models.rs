//! Request and response bodies of the HTTP API.
//!
//! A job is started with `POST /jobs`:
//!
//! ```json
//! {
//!   "selection": { "kind": "all_tours" },
//!   "chunk": { "start": 0, "size": 50 }
//! }
//! ```
//!
//! Other selections:
//! - `{ "kind": "tour", "id": "123456", "name": "Evening ride" }`
//! - `{ "kind": "collections", "collections": [{ "url": "https://x/collection/42" }] }`
//!
//! The chunk is only honoured for `all_tours`. A follow-up request with
//! `start` set to the returned `next_chunk_offset` resumes the job.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::jobs::{ChunkSpec, Selection};
use crate::observability::MetricsSnapshot;
use crate::progress::JobState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartJobRequest {
    pub selection: Selection,
    #[serde(default)]
    pub chunk: Option<ChunkSpec>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JobAcceptedResponse {
    pub accepted: bool,
    pub message: String,
    pub job_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DiscoverRequest {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClearResponse {
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StopResponse {
    /// Whether a running job was flagged
    pub stopped: bool,
    pub status: JobState,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: HashMap<String, String>,
    pub job_state: JobState,
    pub metrics: MetricsSnapshot,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_request_with_chunk() {
        let req: StartJobRequest = serde_json::from_str(
            r#"{"selection": {"kind": "all_tours"}, "chunk": {"start": 10, "size": 10}}"#,
        )
        .unwrap();
        assert!(matches!(req.selection, Selection::AllTours));
        assert_eq!(req.chunk, Some(ChunkSpec::new(10, 10)));
    }

    #[test]
    fn test_start_request_collections() {
        let req: StartJobRequest = serde_json::from_value(serde_json::json!({
            "selection": {
                "kind": "collections",
                "collections": [
                    {"url": "https://x/collection/1"},
                    {"id": "2", "tours": [{"id": "9"}]}
                ]
            }
        }))
        .unwrap();
        match req.selection {
            Selection::Collections { collections } => {
                assert_eq!(collections.len(), 2);
                assert_eq!(collections[1].tours[0].id, "9");
            }
            other => panic!("unexpected selection {other:?}"),
        }
        assert!(req.chunk.is_none());
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let body = r#"{"selection": {"kind": "everything"}}"#;
        assert!(serde_json::from_str::<StartJobRequest>(body).is_err());
    }
}
