//! The pluggable source seam behind the paginated collector.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::types::{FetchError, RawReview, ReviewPage};

/// A paginated review source.
///
/// `fetch_page` must be an idempotent point-in-time read for a given cursor;
/// the collector never retries a failed page, it gives up on the current app
/// instead.
#[async_trait]
pub trait ReviewSource: Send + Sync {
    async fn fetch_page(
        &self,
        app_id: &str,
        page_size: usize,
        cursor: Option<&str>,
    ) -> Result<ReviewPage, FetchError>;
}

/// An in-memory page sequence, used in tests and dry runs. Cursors are the
/// stringified index of the next page; the last page carries a `None` cursor.
pub struct StaticReviewSource {
    pages: Vec<Vec<RawReview>>,
    fetch_calls: AtomicUsize,
    /// When set, every fetch fails after `pages` have been served.
    fail_after_pages: Option<usize>,
}

impl StaticReviewSource {
    pub fn new(pages: Vec<Vec<RawReview>>) -> Self {
        Self {
            pages,
            fetch_calls: AtomicUsize::new(0),
            fail_after_pages: None,
        }
    }

    /// A source that serves `pages` successfully and then errors on the next
    /// fetch instead of terminating.
    pub fn failing_after(pages: Vec<Vec<RawReview>>, successful_pages: usize) -> Self {
        Self {
            pages,
            fetch_calls: AtomicUsize::new(0),
            fail_after_pages: Some(successful_pages),
        }
    }

    /// Number of `fetch_page` calls served so far.
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReviewSource for StaticReviewSource {
    async fn fetch_page(
        &self,
        _app_id: &str,
        page_size: usize,
        cursor: Option<&str>,
    ) -> Result<ReviewPage, FetchError> {
        let call_index = self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(limit) = self.fail_after_pages {
            if call_index >= limit {
                return Err(FetchError::Malformed(
                    "synthetic source failure".to_string(),
                ));
            }
        }

        let page_index: usize = match cursor {
            Some(cursor) => cursor
                .parse()
                .map_err(|_| FetchError::Malformed(format!("bad cursor: {cursor}")))?,
            None => 0,
        };

        let Some(page) = self.pages.get(page_index) else {
            return Ok(ReviewPage {
                reviews: Vec::new(),
                next_cursor: None,
            });
        };

        let reviews = page.iter().take(page_size).cloned().collect();
        let next_cursor = if page_index + 1 < self.pages.len() {
            Some((page_index + 1).to_string())
        } else {
            None
        };

        Ok(ReviewPage {
            reviews,
            next_cursor,
        })
    }
}
