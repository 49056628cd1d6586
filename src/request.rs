use std::time::Duration;

use chrono::{NaiveDate, Utc};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::config::Credentials;
use crate::model::{SearchResponse, Tweet};
use crate::oauth::OAuth1Signer;
use crate::{Error, Result, SEARCH_URL};

/// Wait used when a 429 arrives without an `x-rate-limit-reset` header.
const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(15 * 60);
/// Added on top of the advertised reset time to absorb clock skew.
const RESET_MARGIN: Duration = Duration::from_secs(1);

/// Parameters of a search, shared by every page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub query: String,
    pub lang: String,
    pub until: NaiveDate,
    /// Tweets per page, at most 100.
    pub count: u8,
}

impl SearchQuery {
    fn params(&self, max_id: Option<u64>) -> Vec<(String, String)> {
        let mut params = vec![
            ("q".to_string(), self.query.clone()),
            ("lang".to_string(), self.lang.clone()),
            ("tweet_mode".to_string(), "extended".to_string()),
            ("until".to_string(), self.until.format("%Y-%m-%d").to_string()),
            ("count".to_string(), self.count.to_string()),
        ];
        if let Some(max_id) = max_id {
            params.push(("max_id".to_string(), max_id.to_string()));
        }
        params
    }
}

/// Source of tweets for the collector.
///
/// The returned stream is lazy: pages are requested only as the consumer pulls tweets, so
/// bounding it with `take` bounds the number of requests. Implementations may block for
/// an unspecified time to satisfy the provider's quota.
pub trait SearchClient: Send + Sync {
    fn search<'a>(&'a self, query: &'a SearchQuery) -> BoxStream<'a, Result<Tweet>>;
}

/// Where the next page starts.
#[derive(Debug, Clone, Copy)]
enum Cursor {
    Start,
    MaxId(u64),
    Exhausted,
}

/// User-context client for the v1.1 standard search endpoint.
#[derive(Debug, Clone)]
pub struct TwitterClient {
    http_client: Client,
    signer: OAuth1Signer,
    search_url: String,
}

impl TwitterClient {
    pub fn new(credentials: Credentials) -> Result<Self> {
        Self::with_search_url(credentials, SEARCH_URL)
    }

    pub fn with_search_url(
        credentials: Credentials,
        search_url: impl Into<String>,
    ) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            signer: OAuth1Signer::new(credentials),
            search_url: search_url.into(),
        })
    }

    /// Requests one page, sleeping through rate limit windows until the provider answers.
    pub async fn fetch_page(
        &self,
        query: &SearchQuery,
        max_id: Option<u64>,
    ) -> Result<SearchResponse> {
        let params = query.params(max_id);
        loop {
            let auth = self.signer.authorization("GET", &self.search_url, &params);
            debug!(?max_id, "Requesting search page");
            let res = self
                .http_client
                .get(&self.search_url)
                .query(&params)
                .header(AUTHORIZATION, auth)
                .send()
                .await?;

            let status = res.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                let wait = rate_limit_wait(res.headers(), Utc::now().timestamp());
                warn!(wait_secs = wait.as_secs(), "Rate limit reached, waiting for reset");
                tokio::time::sleep(wait).await;
                continue;
            }
            if !status.is_success() {
                let message = match res.text().await {
                    Ok(body) if !body.trim().is_empty() => body,
                    _ => status.canonical_reason().unwrap_or_default().to_string(),
                };
                return Err(Error::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let body = res.text().await?;
            return Ok(serde_json::from_str(&body)?);
        }
    }
}

impl SearchClient for TwitterClient {
    fn search<'a>(&'a self, query: &'a SearchQuery) -> BoxStream<'a, Result<Tweet>> {
        stream::try_unfold(Cursor::Start, move |cursor| async move {
            let max_id = match cursor {
                Cursor::Start => None,
                Cursor::MaxId(id) => Some(id),
                Cursor::Exhausted => return Ok(None),
            };

            let page = self.fetch_page(query, max_id).await?;
            if page.statuses.is_empty() {
                return Ok(None);
            }

            let has_more = page
                .search_metadata
                .as_ref()
                .is_some_and(|meta| meta.next_results.is_some());
            let next = match page.statuses.iter().map(|t| t.id).min() {
                Some(lowest) if has_more && lowest > 0 => Cursor::MaxId(lowest - 1),
                _ => Cursor::Exhausted,
            };
            debug!(tweets = page.statuses.len(), ?next, "Received search page");

            Ok::<_, Error>(Some((page.statuses, next)))
        })
        .map_ok(|statuses| stream::iter(statuses.into_iter().map(Ok::<Tweet, Error>)))
        .try_flatten()
        .boxed()
    }
}

/// Time until the window in `x-rate-limit-reset` (epoch seconds) opens again.
fn rate_limit_wait(headers: &HeaderMap, now: i64) -> Duration {
    headers
        .get("x-rate-limit-reset")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok())
        .map(|reset| {
            Duration::from_secs(reset.saturating_sub(now).max(0) as u64) + RESET_MARGIN
        })
        .unwrap_or(DEFAULT_RATE_LIMIT_WAIT)
}
