//! Listing-page parsing seam and the default link-scan parser

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use thiserror::Error;

use crate::model::TourRef;

#[derive(Debug, Clone, Error)]
pub enum ParseError {
    #[error("empty page")]
    Empty,

    #[error("malformed page: {0}")]
    Malformed(String),
}

/// What one listing page yields.
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    pub tours: Vec<TourRef>,
    /// Best-effort size hint; `None` when absent or zero
    pub expected_count: Option<usize>,
    pub title: Option<String>,
}

/// Turns raw listing content into tour references.
pub trait PageParser: Send + Sync {
    fn parse(&self, content: &str) -> Result<ParsedPage, ParseError>;
}

static TOUR_ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*href\s*=\s*["']([^"']*/tour/(\d+)[^"']*)["'][^>]*>(.*?)</a>"#)
        .expect("tour anchor regex")
});

static COUNT_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d[\d,]*)\s*(?:routes|tours)\b").expect("count regex"));

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h1\b[^>]*>(.*?)</h1>").expect("heading regex"));

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag regex"));

static COLLECTION_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/collection/(\d+)").expect("collection id regex"));

/// Scans anchors pointing at `/tour/<id>`.
///
/// Relative hrefs are resolved against `base_url`. The same id appearing
/// twice on a page keeps its first non-empty name.
#[derive(Debug, Clone)]
pub struct LinkScanParser {
    base_url: String,
}

impl LinkScanParser {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn absolute(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else if href.starts_with('/') {
            format!("{}{}", self.base_url, href)
        } else {
            format!("{}/{}", self.base_url, href)
        }
    }
}

impl PageParser for LinkScanParser {
    fn parse(&self, content: &str) -> Result<ParsedPage, ParseError> {
        if content.trim().is_empty() {
            return Err(ParseError::Empty);
        }

        let mut seen = HashSet::new();
        let mut tours: Vec<TourRef> = Vec::new();
        for caps in TOUR_ANCHOR.captures_iter(content) {
            let href = &caps[1];
            let id = caps[2].to_string();
            let name = strip_tags(&caps[3]);

            if seen.insert(id.clone()) {
                let url = self.absolute(href.split(['?', '#']).next().unwrap_or(href));
                tours.push(TourRef::new(id, name, url));
            } else if let Some(existing) = tours.iter_mut().find(|t| t.id == id) {
                if existing.name.is_empty() {
                    existing.name = name;
                }
            }
        }

        let expected_count = COUNT_LABEL
            .captures(&strip_tags(content))
            .and_then(|caps| caps[1].replace(',', "").parse::<usize>().ok())
            .filter(|n| *n > 0);

        let title = HEADING
            .captures(content)
            .map(|caps| strip_tags(&caps[1]))
            .filter(|t| !t.is_empty());

        Ok(ParsedPage {
            tours,
            expected_count,
            title,
        })
    }
}

fn strip_tags(html: &str) -> String {
    let text = TAG.replace_all(html, " ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Numeric id from `.../collection/<id>[/...]`.
pub fn collection_id_from_url(url: &str) -> Option<String> {
    COLLECTION_ID.captures(url).map(|caps| caps[1].to_string())
}
