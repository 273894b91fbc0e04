//! Prowlarr API client implementing the core's `Search` capability.
//!
//! Keeps the rate-limited HTTP client shape from the original Radarr
//! integration; the surface is narrowed to the single `search` entry
//! point the core depends on. Releases come back in the order
//! Prowlarr/the underlying indexers returned them — this client never
//! re-ranks them.

use crate::models::{ProwlarrQuery, ProwlarrSearchResult};
use async_trait::async_trait;
use gatherarr_core::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use gatherarr_core::domain::capabilities::{ContentKind, Release, Search, SearchOutcome, SearchRequest};
use gatherarr_core::error::{CoreError, Result};
use gatherarr_core::retry::{retry_with_backoff, RetryConfig, RetryPolicy};
use reqwest::{Client, Response};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

const SERVICE: &str = "prowlarr";
const MOVIE_CATEGORY: i32 = 2000;
const TV_CATEGORY: i32 = 5000;

#[derive(Debug, Clone)]
pub struct ProwlarrConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: u64,
    pub max_requests_per_minute: u32,
    pub user_agent: String,
}

impl Default for ProwlarrConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9696".to_string(),
            api_key: String::new(),
            timeout: 30,
            max_requests_per_minute: 60,
            user_agent: "gatherarr/0.1".to_string(),
        }
    }
}

#[derive(Debug)]
struct RateLimiter {
    max_requests: u32,
    window_duration: Duration,
    requests: Mutex<Vec<Instant>>,
}

impl RateLimiter {
    fn new(max_requests_per_minute: u32) -> Self {
        Self {
            max_requests: max_requests_per_minute,
            window_duration: Duration::from_secs(60),
            requests: Mutex::new(Vec::new()),
        }
    }

    async fn wait_if_needed(&self) {
        let mut requests = self.requests.lock().await;
        let now = Instant::now();
        requests.retain(|&time| now.duration_since(time) < self.window_duration);

        if requests.len() >= self.max_requests as usize {
            let oldest = requests[0];
            let wait_time = self.window_duration.saturating_sub(now.duration_since(oldest));
            if wait_time > Duration::from_secs(0) {
                debug!("rate limit reached, waiting {:?}", wait_time);
                drop(requests);
                tokio::time::sleep(wait_time).await;
                requests = self.requests.lock().await;
                let now = Instant::now();
                requests.retain(|&time| now.duration_since(time) < self.window_duration);
            }
        }
        requests.push(now);
    }
}

#[derive(Debug)]
pub struct ProwlarrClient {
    config: ProwlarrConfig,
    client: Client,
    rate_limiter: RateLimiter,
    base_url: Url,
    breaker: CircuitBreaker,
}

impl ProwlarrClient {
    pub fn new(config: ProwlarrConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| CoreError::ExternalServiceError {
            service: SERVICE.to_string(),
            error: format!("invalid base URL: {e}"),
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| CoreError::ExternalServiceError {
                service: SERVICE.to_string(),
                error: format!("failed to create HTTP client: {e}"),
            })?;

        let rate_limiter = RateLimiter::new(config.max_requests_per_minute);

        Ok(Self {
            config,
            client,
            rate_limiter,
            base_url,
            breaker: CircuitBreaker::new(CircuitBreakerConfig::new(SERVICE)),
        })
    }

    fn build_query(request: &SearchRequest) -> ProwlarrQuery {
        let mut query = request.text.clone();
        if let (Some(season), Some(episode)) = (request.season, request.episode) {
            query = format!("{query} S{season:02}E{episode:02}");
        } else if let Some(season) = request.season {
            query = format!("{query} S{season:02}");
        }

        let categories = match request.kind {
            Some(ContentKind::Movie) => vec![MOVIE_CATEGORY],
            Some(ContentKind::Series) => vec![TV_CATEGORY],
            None => vec![],
        };

        ProwlarrQuery {
            query,
            categories,
            limit: None,
        }
    }

    async fn run_search(&self, query: &ProwlarrQuery) -> Result<Vec<ProwlarrSearchResult>> {
        retry_with_backoff(RetryConfig::quick(), RetryPolicy::Transient, "prowlarr_search", || {
            self.breaker.call(self.run_search_once(query))
        })
        .await
    }

    async fn run_search_once(&self, query: &ProwlarrQuery) -> Result<Vec<ProwlarrSearchResult>> {
        self.rate_limiter.wait_if_needed().await;

        let mut url = self.base_url.join("/api/v1/search").map_err(|e| CoreError::ExternalServiceError {
            service: SERVICE.to_string(),
            error: format!("failed to build search URL: {e}"),
        })?;

        {
            let mut pairs = url.query_pairs_mut();
            if !query.query.is_empty() {
                pairs.append_pair("query", &query.query);
            }
            if !query.categories.is_empty() {
                let categories = query.categories.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(",");
                pairs.append_pair("categories", &categories);
            }
            if let Some(limit) = query.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
        }

        debug!("searching prowlarr: {url}");

        let response = self
            .client
            .get(url)
            .header("X-Api-Key", &self.config.api_key)
            .send()
            .await
            .map_err(|e| CoreError::NetworkError {
                service: SERVICE.to_string(),
                message: e.to_string(),
            })?;

        Self::handle_response(response).await
    }

    async fn handle_response<T>(response: Response) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let status = response.status();
        if status.is_success() {
            let text = response.text().await.map_err(|e| CoreError::ExternalServiceError {
                service: SERVICE.to_string(),
                error: format!("failed to read response: {e}"),
            })?;
            serde_json::from_str(&text).map_err(|e| CoreError::ExternalServiceError {
                service: SERVICE.to_string(),
                error: format!("failed to parse JSON response: {e}"),
            })
        } else {
            let error_text = response.text().await.unwrap_or_default();
            Err(CoreError::ExternalServiceError {
                service: SERVICE.to_string(),
                error: format!("HTTP {status}: {error_text}"),
            })
        }
    }
}

#[async_trait]
impl Search for ProwlarrClient {
    async fn search(
        &self,
        cancel: &CancellationToken,
        request: &SearchRequest,
        _quality_profile: &str,
    ) -> Result<SearchOutcome> {
        let query = Self::build_query(request);

        let results = tokio::select! {
            result = self.run_search(&query) => result,
            _ = cancel.cancelled() => Err(CoreError::ClientUnavailable {
                service: SERVICE.to_string(),
                message: "cancelled".to_string(),
            }),
        };

        match results {
            Ok(results) => Ok(SearchOutcome {
                releases: results.into_iter().map(Into::into).collect(),
                errors: Vec::new(),
            }),
            Err(e) => Ok(SearchOutcome {
                releases: Vec::new(),
                errors: vec![e.to_string()],
            }),
        }
    }
}

impl From<ProwlarrSearchResult> for Release {
    fn from(result: ProwlarrSearchResult) -> Self {
        Release {
            title: result.title,
            indexer: result.indexer,
            guid: result.guid,
            download_url: result.download_url,
            size: result.size.unwrap_or(0),
            publish_date: result.publish_date.unwrap_or_else(chrono::Utc::now),
        }
    }
}

pub fn from_env() -> Result<ProwlarrClient> {
    let base_url = std::env::var("PROWLARR_BASE_URL").unwrap_or_else(|_| "http://localhost:9696".to_string());
    let api_key = std::env::var("PROWLARR_API_KEY").map_err(|_| CoreError::Configuration {
        field: "PROWLARR_API_KEY".to_string(),
        message: "not set".to_string(),
    })?;

    ProwlarrClient::new(ProwlarrConfig {
        base_url,
        api_key,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rate_limiter_delays_once_the_window_is_full() {
        let limiter = RateLimiter::new(2);
        limiter.wait_if_needed().await;
        limiter.wait_if_needed().await;

        let start = Instant::now();
        limiter.wait_if_needed().await;
        assert!(start.elapsed() >= Duration::from_secs(59));
    }

    #[test]
    fn movie_search_request_maps_to_the_movie_category() {
        let request = SearchRequest {
            text: "Sicario".to_string(),
            kind: Some(ContentKind::Movie),
            season: None,
            episode: None,
        };
        let query = ProwlarrClient::build_query(&request);
        assert_eq!(query.categories, vec![MOVIE_CATEGORY]);
        assert_eq!(query.query, "Sicario");
    }

    #[test]
    fn episode_search_request_appends_season_and_episode() {
        let request = SearchRequest {
            text: "The Wire".to_string(),
            kind: Some(ContentKind::Series),
            season: Some(1),
            episode: Some(3),
        };
        let query = ProwlarrClient::build_query(&request);
        assert_eq!(query.categories, vec![TV_CATEGORY]);
        assert_eq!(query.query, "The Wire S01E03");
    }

    #[test]
    fn release_conversion_preserves_prowlarr_ordering_fields() {
        let result = ProwlarrSearchResult {
            title: "Example.2024.1080p".to_string(),
            download_url: "https://example.test/dl".to_string(),
            guid: "guid-1".to_string(),
            indexer_id: 1,
            indexer: "examplehd".to_string(),
            size: Some(1_500_000_000),
            seeders: Some(42),
            leechers: Some(2),
            publish_date: None,
            categories: vec![MOVIE_CATEGORY],
        };
        let release: Release = result.into();
        assert_eq!(release.title, "Example.2024.1080p");
        assert_eq!(release.size, 1_500_000_000);
    }
}
