//! Paginated collection loop with per-app failure isolation.

use tokio::time::{sleep, Duration};
use tracing::{debug, error, info};

use super::source::ReviewSource;
use super::types::{FetchError, RawReview, MAX_PAGE_SIZE, PAGE_DELAY};
use crate::environment::AppSpec;
use crate::TARGET_WEB_REQUEST;

/// What one app's collection produced. A fetch error does not discard the
/// pages already collected; it is carried alongside them for the caller to
/// report.
#[derive(Debug)]
pub struct CollectOutcome {
    pub reviews: Vec<RawReview>,
    pub pages_fetched: usize,
    pub error: Option<FetchError>,
}

#[derive(Debug, Clone)]
pub struct PaginatedCollector {
    page_size: usize,
    page_delay: Duration,
}

impl Default for PaginatedCollector {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            page_delay: PAGE_DELAY,
        }
    }
}

impl PaginatedCollector {
    pub fn new(page_size: usize, page_delay: Duration) -> Self {
        Self {
            page_size: page_size.max(1),
            page_delay,
        }
    }

    /// Collect at least `target_count` reviews for one app, fewer if the
    /// source runs out of pages or fails mid-way. `target_count` of zero
    /// returns immediately without touching the source.
    pub async fn collect<S: ReviewSource>(
        &self,
        source: &S,
        app: &AppSpec,
        target_count: usize,
    ) -> CollectOutcome {
        let mut outcome = CollectOutcome {
            reviews: Vec::new(),
            pages_fetched: 0,
            error: None,
        };

        if target_count == 0 {
            return outcome;
        }

        let mut cursor: Option<String> = None;

        while outcome.reviews.len() < target_count {
            let remaining = target_count - outcome.reviews.len();
            let request_size = self.page_size.min(remaining);

            debug!(
                target: TARGET_WEB_REQUEST,
                "Fetching up to {} reviews for {} (collected {}/{})",
                request_size, app.app_id, outcome.reviews.len(), target_count
            );

            let page = match source
                .fetch_page(&app.app_id, request_size, cursor.as_deref())
                .await
            {
                Ok(page) => page,
                Err(err) => {
                    // Abort collection for this app only; keep what we have.
                    error!(
                        target: TARGET_WEB_REQUEST,
                        "Fetch failed for {} after {} pages: {}",
                        app.app_id, outcome.pages_fetched, err
                    );
                    outcome.error = Some(err);
                    return outcome;
                }
            };

            outcome.pages_fetched += 1;

            if page.reviews.is_empty() {
                debug!(target: TARGET_WEB_REQUEST, "Empty batch from {}, stopping", app.app_id);
                break;
            }

            outcome.reviews.extend(page.reviews);

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => {
                    debug!(target: TARGET_WEB_REQUEST, "Terminal cursor from {}, stopping", app.app_id);
                    break;
                }
            }

            // Courtesy rate limit between successful page fetches only.
            if outcome.reviews.len() < target_count && !self.page_delay.is_zero() {
                sleep(self.page_delay).await;
            }
        }

        info!(
            target: TARGET_WEB_REQUEST,
            "Collected {} reviews for {} ({}) over {} pages",
            outcome.reviews.len(), app.bank_name, app.app_id, outcome.pages_fetched
        );
        outcome
    }
}
