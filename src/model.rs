//! Records shared by collection discovery and job orchestration.
//!
//! - [`TourRef`] - one downloadable tour, identified by `id`
//! - [`CollectionRecord`] - a named group of tours, deduplicated by tour id
//! - [`CollectionTarget`] - client-supplied reference to a collection
//! - [`DownloadResult`] - what a finished tour download reports back

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Best-effort tour statistics scraped from listings or enriched later.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TourStats {
    /// Distance in metres
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    /// Moving time in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation_up: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation_down: Option<f64>,
    /// ISO-8601 date or datetime as reported by the source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sport: Option<String>,
}

impl TourStats {
    /// Fill fields that are still missing from `other`. Present values win.
    fn fill_from(&mut self, other: &TourStats) {
        self.distance = self.distance.or(other.distance);
        self.duration = self.duration.or(other.duration);
        self.elevation_up = self.elevation_up.or(other.elevation_up);
        self.elevation_down = self.elevation_down.or(other.elevation_down);
        if self.date.is_none() {
            self.date.clone_from(&other.date);
        }
        if self.sport.is_none() {
            self.sport.clone_from(&other.sport);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, flatten)]
    pub stats: TourStats,
}

/// Tour ids are numeric. Anything else must not reach a request path.
pub fn is_tour_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
}

impl TourRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            stats: TourStats::default(),
        }
    }

    /// Display name, falling back to the id when the listing had no title.
    pub fn display_name(&self) -> String {
        if self.name.trim().is_empty() {
            format!("Tour_{}", self.id)
        } else {
            self.name.clone()
        }
    }

    fn enrich(&mut self, other: &TourRef) {
        if self.name.trim().is_empty() {
            self.name.clone_from(&other.name);
        }
        if self.url.is_empty() {
            self.url.clone_from(&other.url);
        }
        self.stats.fill_from(&other.stats);
    }
}

/// A collection and its deduplicated member tours.
///
/// Tours are keyed by id, so merging the same tour twice is a no-op apart
/// from filling in fields that were missing on the first sighting. Iteration
/// order is by id, which keeps chunk boundaries stable between calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "CollectionWire", from = "CollectionWire")]
pub struct CollectionRecord {
    pub id: String,
    pub name: String,
    pub url: String,
    /// Server-reported size. Unreliable in both directions.
    pub expected_count: Option<usize>,
    tours: BTreeMap<String, TourRef>,
}

impl CollectionRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            expected_count: None,
            tours: BTreeMap::new(),
        }
    }

    /// Build a record that already carries its tours.
    pub fn with_tours(
        id: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
        tours: impl IntoIterator<Item = TourRef>,
    ) -> Self {
        let mut record = Self::new(id, name, url);
        record.merge_tours(tours);
        record
    }

    /// Merge tours into the set, returning how many ids were new.
    pub fn merge_tours(&mut self, tours: impl IntoIterator<Item = TourRef>) -> usize {
        let mut added = 0;
        for tour in tours {
            if tour.id.is_empty() {
                continue;
            }
            match self.tours.get_mut(&tour.id) {
                Some(existing) => existing.enrich(&tour),
                None => {
                    self.tours.insert(tour.id.clone(), tour);
                    added += 1;
                }
            }
        }
        added
    }

    pub fn tour_count(&self) -> usize {
        self.tours.len()
    }

    pub fn contains(&self, tour_id: &str) -> bool {
        self.tours.contains_key(tour_id)
    }

    pub fn tours(&self) -> impl Iterator<Item = &TourRef> {
        self.tours.values()
    }

    pub fn tour_list(&self) -> Vec<TourRef> {
        self.tours.values().cloned().collect()
    }

    pub fn display_name(&self) -> String {
        if self.name.trim().is_empty() {
            format!("Collection_{}", self.id)
        } else {
            self.name.clone()
        }
    }
}

/// Serialized shape of a collection: tours as a list plus a derived count.
#[derive(Serialize, Deserialize)]
struct CollectionWire {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    expected_count: Option<usize>,
    #[serde(default)]
    tours: Vec<TourRef>,
    #[serde(default)]
    tour_count: usize,
}

impl From<CollectionRecord> for CollectionWire {
    fn from(record: CollectionRecord) -> Self {
        let tour_count = record.tour_count();
        Self {
            id: record.id,
            name: record.name,
            url: record.url,
            expected_count: record.expected_count,
            tours: record.tours.into_values().collect(),
            tour_count,
        }
    }
}

impl From<CollectionWire> for CollectionRecord {
    fn from(wire: CollectionWire) -> Self {
        let mut record = CollectionRecord::new(wire.id, wire.name, wire.url);
        record.expected_count = wire.expected_count;
        record.merge_tours(wire.tours);
        record
    }
}

/// Client-supplied collection for a download job.
///
/// Either `tours` is already populated, or `url` points at a listing page
/// that discovery resolves before dispatch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionTarget {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub tours: Vec<TourRef>,
}

impl CollectionTarget {
    pub fn label(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.id.clone())
            .or_else(|| self.url.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    /// Record built from the tours the client sent along.
    pub fn to_record(&self) -> CollectionRecord {
        CollectionRecord::with_tours(
            self.id.clone().unwrap_or_default(),
            self.name.clone().unwrap_or_default(),
            self.url.clone().unwrap_or_default(),
            self.tours.iter().cloned(),
        )
    }
}

/// Outcome of one successful tour download, enriched with tour stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadResult {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Storage key of the written artifact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sport: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    /// Hours, rounded to two decimals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation_up: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation_down: Option<f64>,
}

impl DownloadResult {
    /// Start a result from the tour's listing data.
    pub fn from_tour(tour: &TourRef) -> Self {
        let stats = &tour.stats;
        Self {
            id: tour.id.clone(),
            name: tour.display_name(),
            collection_id: None,
            collection_name: None,
            url: tour.url.clone(),
            filename: None,
            location: None,
            date: stats.date.as_deref().map(date_part),
            sport: stats.sport.clone(),
            distance_km: stats.distance.map(|m| round2(m / 1000.0)),
            duration: stats.duration.map(|s| round2(s / 3600.0)),
            elevation_up: stats.elevation_up,
            elevation_down: stats.elevation_down,
        }
    }
}

/// `2022-01-02T12:26:41.795+01:00` -> `2022-01-02`
pub(crate) fn date_part(raw: &str) -> String {
    let trimmed = raw.trim();
    let date = trimmed.split('T').next().unwrap_or(trimmed);
    date.chars().take(10).collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tour(id: &str) -> TourRef {
        TourRef::new(id, format!("Tour {id}"), format!("https://example.com/tour/{id}"))
    }

    #[test]
    fn test_tour_id_is_digits_only() {
        assert!(is_tour_id("2860921"));
        assert!(!is_tour_id(""));
        assert!(!is_tour_id("12/../3"));
        assert!(!is_tour_id("-5"));
    }

    #[test]
    fn test_merge_ignores_duplicate_ids() {
        let mut record = CollectionRecord::new("7", "Alps", "https://example.com/collection/7");
        assert_eq!(record.merge_tours(vec![tour("1"), tour("2")]), 2);
        assert_eq!(record.merge_tours(vec![tour("2"), tour("3"), tour("3")]), 1);
        assert_eq!(record.tour_count(), 3);
    }

    #[test]
    fn test_merge_is_order_independent() {
        let batches = [vec![tour("1"), tour("2")], vec![tour("2"), tour("3")], vec![tour("4")]];

        let mut forward = CollectionRecord::new("c", "", "");
        for batch in batches.iter() {
            forward.merge_tours(batch.clone());
        }
        let mut backward = CollectionRecord::new("c", "", "");
        for batch in batches.iter().rev() {
            backward.merge_tours(batch.clone());
        }

        let ids = |r: &CollectionRecord| r.tours().map(|t| t.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&forward), ids(&backward));
    }

    #[test]
    fn test_merge_enriches_missing_fields() {
        let mut record = CollectionRecord::new("c", "", "");
        record.merge_tours(vec![TourRef::new("1", "", "")]);

        let mut richer = tour("1");
        richer.stats.distance = Some(12_500.0);
        record.merge_tours(vec![richer]);

        let stored = record.tours().next().unwrap();
        assert_eq!(stored.name, "Tour 1");
        assert_eq!(stored.stats.distance, Some(12_500.0));
    }

    #[test]
    fn test_collection_serializes_tour_count() {
        let record = CollectionRecord::with_tours("9", "Coast", "", vec![tour("1"), tour("2")]);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["tour_count"], 2);
        assert_eq!(json["tours"].as_array().unwrap().len(), 2);

        let back: CollectionRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_download_result_converts_units() {
        let mut t = tour("5");
        t.stats.distance = Some(12_340.0);
        t.stats.duration = Some(5400.0);
        t.stats.date = Some("2022-01-02T12:26:41.795+01:00".to_string());

        let result = DownloadResult::from_tour(&t);
        assert_eq!(result.distance_km, Some(12.34));
        assert_eq!(result.duration, Some(1.5));
        assert_eq!(result.date.as_deref(), Some("2022-01-02"));
    }
}
