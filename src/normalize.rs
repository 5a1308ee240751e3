//! Normalization of raw source records into canonical reviews.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::fetch::RawReview;
use crate::TARGET_PIPELINE;

/// A canonical review, ready for persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub review_id: i64,
    pub text: String,
    pub rating: i64,
    /// Canonical ISO date, `YYYY-MM-DD`.
    pub date: String,
    pub bank_name: String,
    pub source: String,
    pub sentiment_label: Option<String>,
    pub sentiment_score: Option<f64>,
    pub themes: Option<String>,
}

impl Review {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        text: String,
        rating: i64,
        date: String,
        bank_name: String,
        source: String,
        sentiment_label: Option<String>,
        sentiment_score: Option<f64>,
        themes: Option<String>,
    ) -> Self {
        let review_id = compute_review_id(&text, &bank_name, &date);
        Self {
            review_id,
            text,
            rating,
            date,
            bank_name,
            source,
            sentiment_label,
            sentiment_score,
            themes,
        }
    }
}

/// Result of normalizing one raw batch.
#[derive(Debug, Default)]
pub struct NormalizedBatch {
    pub reviews: Vec<Review>,
    pub dropped_invalid: usize,
    pub dropped_duplicates: usize,
}

/// Deterministic 64-bit review identity: the first 8 bytes of
/// `Sha256(text \n bank \n date)` as a big-endian i64. Stable across process
/// restarts, and composite so identical boilerplate text under two banks or
/// on two dates gets distinct identities.
pub fn compute_review_id(text: &str, bank_name: &str, date: &str) -> i64 {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update(b"\n");
    hasher.update(bank_name.as_bytes());
    hasher.update(b"\n");
    hasher.update(date.as_bytes());
    let digest = hasher.finalize();
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(prefix)
}

/// Parse a source timestamp in various formats down to a calendar date.
pub fn parse_review_date(date_str: &str) -> Option<NaiveDate> {
    // Try RFC3339
    if let Ok(date) = DateTime::parse_from_rfc3339(date_str) {
        return Some(date.date_naive());
    }

    // Try RFC2822
    if let Ok(date) = DateTime::parse_from_rfc2822(date_str) {
        return Some(date.date_naive());
    }

    // Try common datetime formats
    for format in &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(date) = NaiveDateTime::parse_from_str(date_str, format) {
            return Some(date.date());
        }
    }

    // Try bare date formats
    for format in &["%Y-%m-%d", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(date_str, format) {
            return Some(date);
        }
    }

    None
}

/// Map a batch of raw records for one bank into canonical reviews.
///
/// Records missing text, rating, or a parseable date are dropped and counted,
/// never an error. The (text, date, bank) triple is deduplicated within the
/// batch, first occurrence wins, and output order follows input order of the
/// surviving records.
pub fn normalize(raw_reviews: Vec<RawReview>, bank_name: &str, source: &str) -> NormalizedBatch {
    let total = raw_reviews.len();
    let mut batch = NormalizedBatch::default();
    let mut seen: HashSet<(String, String)> = HashSet::new();

    for raw in raw_reviews {
        let text = match raw.content.as_deref().map(str::trim) {
            Some(trimmed) if !trimmed.is_empty() => trimmed.to_string(),
            _ => {
                batch.dropped_invalid += 1;
                continue;
            }
        };

        // Missing rating drops the record; out-of-domain numeric values pass
        // through unchanged.
        let rating = match raw.score {
            Some(score) => score as i64,
            None => {
                batch.dropped_invalid += 1;
                continue;
            }
        };

        let date = match raw.posted_at.as_deref().and_then(parse_review_date) {
            Some(date) => date.format("%Y-%m-%d").to_string(),
            None => {
                warn!(
                    target: TARGET_PIPELINE,
                    "Dropping review with unparseable date {:?} for bank '{}'",
                    raw.posted_at, bank_name
                );
                batch.dropped_invalid += 1;
                continue;
            }
        };

        if !seen.insert((text.clone(), date.clone())) {
            batch.dropped_duplicates += 1;
            continue;
        }

        batch.reviews.push(Review::new(
            text,
            rating,
            date,
            bank_name.to_string(),
            source.to_string(),
            raw.sentiment_label,
            raw.sentiment_score,
            raw.themes,
        ));
    }

    debug!(
        target: TARGET_PIPELINE,
        "Normalized {} of {} raw reviews for '{}' ({} invalid, {} duplicates)",
        batch.reviews.len(),
        total,
        bank_name,
        batch.dropped_invalid,
        batch.dropped_duplicates
    );
    batch
}
