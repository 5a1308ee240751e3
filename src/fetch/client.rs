//! HTTP client implementation of the review source.

use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::source::ReviewSource;
use super::types::{FetchError, ReviewPage, REQUEST_TIMEOUT};
use crate::TARGET_WEB_REQUEST;

/// Review source backed by a JSON endpoint of the shape
/// `GET {base}/apps/{app_id}/reviews?count=N[&cursor=C]`, returning a
/// `ReviewPage` document.
pub struct HttpReviewSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpReviewSource {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .gzip(true)
            .redirect(reqwest::redirect::Policy::default())
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Build the page request. The continuation cursor is opaque and may
    /// contain reserved characters, so it goes through reqwest's query
    /// encoding rather than string concatenation.
    fn page_request(
        &self,
        app_id: &str,
        page_size: usize,
        cursor: Option<&str>,
    ) -> Result<reqwest::Request, FetchError> {
        let mut builder = self
            .client
            .get(format!("{}/apps/{}/reviews", self.base_url, app_id))
            .query(&[("count", page_size.to_string())]);
        if let Some(cursor) = cursor {
            builder = builder.query(&[("cursor", cursor)]);
        }
        builder.build().map_err(FetchError::Request)
    }
}

#[async_trait]
impl ReviewSource for HttpReviewSource {
    async fn fetch_page(
        &self,
        app_id: &str,
        page_size: usize,
        cursor: Option<&str>,
    ) -> Result<ReviewPage, FetchError> {
        let request = self.page_request(app_id, page_size, cursor)?;
        let url = request.url().to_string();
        debug!(target: TARGET_WEB_REQUEST, "Requesting review page: {}", url);

        let response = match timeout(REQUEST_TIMEOUT, self.client.execute(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                warn!(target: TARGET_WEB_REQUEST, "Request to {} failed: {}", url, err);
                return Err(FetchError::Request(err));
            }
            Err(_) => {
                warn!(target: TARGET_WEB_REQUEST, "Request to {} timed out after {}s", url, REQUEST_TIMEOUT.as_secs());
                return Err(FetchError::Timeout {
                    url,
                    seconds: REQUEST_TIMEOUT.as_secs(),
                });
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(target: TARGET_WEB_REQUEST, "Non-success status {} from {}", status, url);
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.text().await.map_err(FetchError::Request)?;
        let page: ReviewPage = serde_json::from_str(&body)
            .map_err(|err| FetchError::Malformed(format!("invalid page JSON from {url}: {err}")))?;

        debug!(
            target: TARGET_WEB_REQUEST,
            "Fetched {} reviews from {} (terminal: {})",
            page.reviews.len(),
            url,
            page.next_cursor.is_none()
        );
        Ok(page)
    }
}
