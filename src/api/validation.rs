use thiserror::Error;

use super::models::{DiscoverRequest, StartJobRequest};
use crate::config::ApiLimits;
use crate::discovery::collection_id_from_url;
use crate::jobs::Selection;
use crate::model::is_tour_id;

#[derive(Debug, Error)]
pub enum RequestValidationError {
    #[error("tour id must not be empty")]
    EmptyTourId,
    #[error("tour id '{0}' must be numeric")]
    InvalidTourId(String),
    #[error("collections must contain between 1 and {0} entries")]
    InvalidCollectionCount(usize),
    #[error("collection #{0} needs tours, an id or a url")]
    EmptyCollectionTarget(usize),
    #[error("collection #{0} url must be http/https")]
    InvalidCollectionUrl(usize),
    #[error("chunk size must be positive")]
    ZeroChunkSize,
    #[error("'{0}' is not a collection url")]
    NotACollectionUrl(String),
}

pub fn validate_start_request(
    req: &StartJobRequest,
    limits: &ApiLimits,
) -> Result<(), RequestValidationError> {
    if let Some(chunk) = &req.chunk {
        if chunk.size == Some(0) {
            return Err(RequestValidationError::ZeroChunkSize);
        }
    }

    match &req.selection {
        Selection::Tour { id, .. } => {
            if id.trim().is_empty() {
                return Err(RequestValidationError::EmptyTourId);
            }
            if !is_tour_id(id) {
                return Err(RequestValidationError::InvalidTourId(id.clone()));
            }
        }
        Selection::Collections { collections } => {
            let max = limits.max_collections_per_job;
            if collections.is_empty() || collections.len() > max {
                return Err(RequestValidationError::InvalidCollectionCount(max));
            }
            for (idx, target) in collections.iter().enumerate() {
                let has_url = target.url.as_deref().is_some_and(|u| !u.is_empty());
                if target.tours.is_empty() && !has_url && target.id.is_none() {
                    return Err(RequestValidationError::EmptyCollectionTarget(idx));
                }
                if let Some(tour) = target.tours.iter().find(|t| !is_tour_id(&t.id)) {
                    return Err(RequestValidationError::InvalidTourId(tour.id.clone()));
                }
                if let Some(url) = target.url.as_deref().filter(|u| !u.is_empty()) {
                    if !(url.starts_with("http://") || url.starts_with("https://")) {
                        return Err(RequestValidationError::InvalidCollectionUrl(idx));
                    }
                }
            }
        }
        Selection::AllTours => {}
    }

    Ok(())
}

pub fn validate_discover_request(req: &DiscoverRequest) -> Result<(), RequestValidationError> {
    let url = req.url.trim();
    let is_http = url.starts_with("http://") || url.starts_with("https://");
    if !is_http || collection_id_from_url(url).is_none() {
        return Err(RequestValidationError::NotACollectionUrl(req.url.clone()));
    }
    Ok(())
}
