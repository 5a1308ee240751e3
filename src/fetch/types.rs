//! Type definitions for the fetch module.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Duration;

/// A raw review record as supplied by the source. No identity guarantees;
/// may contain duplicates across pages and apps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawReview {
    pub content: Option<String>,
    pub score: Option<f64>,
    /// Source timestamp, free-form; canonicalized during normalization.
    pub posted_at: Option<String>,
    #[serde(default)]
    pub sentiment_label: Option<String>,
    #[serde(default)]
    pub sentiment_score: Option<f64>,
    #[serde(default)]
    pub themes: Option<String>,
}

/// One page of raw reviews plus the continuation token for the next page.
/// A `None` cursor is the terminal marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewPage {
    #[serde(default)]
    pub reviews: Vec<RawReview>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} timed out after {seconds}s")]
    Timeout { url: String, seconds: u64 },
    #[error("http status {status} for {url}")]
    HttpStatus { status: u16, url: String },
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("malformed review page: {0}")]
    Malformed(String),
}

// Constants
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const PAGE_DELAY: Duration = Duration::from_secs(1);
pub const MAX_PAGE_SIZE: usize = 200;
