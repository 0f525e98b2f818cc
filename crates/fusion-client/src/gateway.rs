//! High-level search entry points with response caching and detail hydration.
//!
//! [`SearchGateway`] owns a [`FusionClient`] and a [`ResponseCache`]. The
//! city/state search is the only cached operation; everything else passes
//! straight through to the client.

use std::time::Duration;

use chrono::Utc;
use fusion_core::AppConfig;
use futures::stream::{self, StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;

use crate::cache::{CacheKey, ResponseCache};
use crate::client::FusionClient;
use crate::error::FusionError;
use crate::normalize::title_case;
use crate::request::SearchRequest;
use crate::types::{AutocompleteResponse, Business, ReviewsResponse, SearchResponse};

/// Default number of businesses hydrated concurrently.
pub const DEFAULT_HYDRATION_CONCURRENCY: usize = 4;

#[derive(Debug)]
pub struct SearchGateway {
    client: FusionClient,
    cache: ResponseCache,
    hydration_concurrency: usize,
}

impl SearchGateway {
    #[must_use]
    pub fn new(client: FusionClient, cache: ResponseCache) -> Self {
        Self {
            client,
            cache,
            hydration_concurrency: DEFAULT_HYDRATION_CONCURRENCY,
        }
    }

    /// Sets how many businesses are hydrated at once. Zero is treated as one.
    #[must_use]
    pub fn with_hydration_concurrency(mut self, width: usize) -> Self {
        self.hydration_concurrency = width.max(1);
        self
    }

    /// Builds the client and cache from application configuration.
    ///
    /// # Errors
    ///
    /// See [`FusionClient::from_config`].
    pub fn from_config(config: &AppConfig) -> Result<Self, FusionError> {
        let client = FusionClient::from_config(config)?;
        let cache = ResponseCache::new(Duration::from_secs(config.cache_ttl_secs));
        Ok(Self::new(client, cache).with_hydration_concurrency(config.hydration_concurrency))
    }

    #[must_use]
    pub fn client(&self) -> &FusionClient {
        &self.client
    }

    #[must_use]
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Searches `term` in `city, state`, sorted by rating.
    ///
    /// Results are cached per `(city, state, title-cased term)`; a live
    /// entry is returned without touching the network. With `with_details`
    /// every business is replaced by its detail record, reviews included.
    /// Responses carrying an API error envelope are returned but not cached.
    ///
    /// # Errors
    ///
    /// - [`FusionError::Validation`] if neither city nor state is usable.
    /// - [`FusionError::Cancelled`] if `cancel` fires during the search or
    ///   any hydration call.
    /// - Any transport, status, or decode error from the search or from a
    ///   hydration call.
    pub async fn search_by_city_state(
        &self,
        term: &str,
        city: &str,
        state: &str,
        limit: u32,
        with_details: bool,
        cancel: &CancellationToken,
    ) -> Result<SearchResponse, FusionError> {
        let normalized = title_case(term);
        let key = CacheKey::new(city, state, &normalized);

        if let Some(cached) = self.cache.get(&key) {
            tracing::info!(key = %key, "search cache hit");
            return Ok(cached);
        }
        tracing::info!(key = %key, "search cache miss");

        let mut request = SearchRequest::new();
        if !normalized.is_empty() {
            request.set_term(normalized.as_str());
        }
        let (city, state) = (city.trim(), state.trim());
        if !city.is_empty() && !state.is_empty() {
            request.set_location(format!("{city}, {state}"));
        }
        request.set_max_results(limit).set_sort_by("rating");

        let mut response = self.client.search(&request, cancel).await?;

        if with_details && response.error.is_none() {
            let summaries = std::mem::take(&mut response.businesses);
            response.businesses = self.hydrate(summaries, cancel).await?;
        }

        response.city = Some(city.to_owned());
        response.state = Some(state.to_owned());
        response.term = Some(normalized);
        response.request_time = Some(Utc::now());

        if response.error.is_none() {
            self.cache.put_default(key, response.clone());
        }
        Ok(response)
    }

    /// Replaces each summary with its detail record and reviews, keeping
    /// the input order. At most `hydration_concurrency` businesses are in
    /// flight at once.
    async fn hydrate(
        &self,
        summaries: Vec<Business>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Business>, FusionError> {
        let client = &self.client;
        let count = summaries.len();

        let hydrated: Vec<Business> = stream::iter(summaries.into_iter().map(|summary| async move {
            if summary.id.trim().is_empty() {
                return Ok(summary);
            }
            let (detail, reviews) = tokio::try_join!(
                client.get_business(&summary.id, cancel),
                client.get_reviews(&summary.id, None, cancel),
            )?;
            Ok::<_, FusionError>(merge_detail(summary, detail, reviews))
        }))
        .buffered(self.hydration_concurrency)
        .try_collect()
        .await?;

        tracing::info!(count, "hydrated search results with details");
        Ok(hydrated)
    }

    /// See [`FusionClient::search`].
    ///
    /// # Errors
    ///
    /// See [`FusionClient::search`].
    pub async fn search(
        &self,
        request: &SearchRequest,
        cancel: &CancellationToken,
    ) -> Result<SearchResponse, FusionError> {
        self.client.search(request, cancel).await
    }

    /// See [`FusionClient::search_by_text`].
    ///
    /// # Errors
    ///
    /// See [`FusionClient::search_by_text`].
    pub async fn search_by_text(
        &self,
        term: &str,
        latitude: f64,
        longitude: f64,
        cancel: &CancellationToken,
    ) -> Result<SearchResponse, FusionError> {
        self.client
            .search_by_text(term, latitude, longitude, cancel)
            .await
    }

    /// See [`FusionClient::search_with_delivery`].
    ///
    /// # Errors
    ///
    /// See [`FusionClient::search_with_delivery`].
    pub async fn search_with_delivery(
        &self,
        term: &str,
        latitude: f64,
        longitude: f64,
        cancel: &CancellationToken,
    ) -> Result<SearchResponse, FusionError> {
        self.client
            .search_with_delivery(term, latitude, longitude, cancel)
            .await
    }

    /// See [`FusionClient::autocomplete`].
    ///
    /// # Errors
    ///
    /// See [`FusionClient::autocomplete`].
    pub async fn autocomplete(
        &self,
        text: &str,
        latitude: f64,
        longitude: f64,
        locale: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<AutocompleteResponse, FusionError> {
        self.client
            .autocomplete(text, latitude, longitude, locale, cancel)
            .await
    }

    /// See [`FusionClient::get_business`].
    ///
    /// # Errors
    ///
    /// See [`FusionClient::get_business`].
    pub async fn get_business(
        &self,
        business_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Business, FusionError> {
        self.client.get_business(business_id, cancel).await
    }

    /// See [`FusionClient::get_reviews`].
    ///
    /// # Errors
    ///
    /// See [`FusionClient::get_reviews`].
    pub async fn get_reviews(
        &self,
        business_id: &str,
        locale: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<ReviewsResponse, FusionError> {
        self.client.get_reviews(business_id, locale, cancel).await
    }
}

/// Combines a search summary with its detail and review responses.
///
/// A detail response carrying an API error leaves the summary in place.
/// The summary's search-relative fields survive since the detail endpoint
/// does not know the search origin.
fn merge_detail(summary: Business, detail: Business, reviews: ReviewsResponse) -> Business {
    let mut record = if let Some(error) = &detail.error {
        tracing::warn!(
            business_id = %summary.id,
            error = %error,
            "detail lookup failed; keeping summary"
        );
        summary.clone()
    } else {
        Business {
            distance: detail.distance.or(summary.distance),
            distance_away: summary.distance_away,
            ..detail
        }
    };

    match reviews.error {
        None => record.reviews = reviews.reviews,
        Some(error) => {
            tracing::warn!(business_id = %summary.id, error = %error, "review lookup failed");
        }
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientOptions;
    use crate::error::ValidationError;
    use crate::types::{Review, ResponseError};

    fn offline_gateway() -> SearchGateway {
        let options = ClientOptions {
            max_retries: 0,
            ..ClientOptions::default()
        };
        // Port 9 (discard) is never served in tests; any request would fail.
        let client = FusionClient::with_base_url("test-key", &options, "http://127.0.0.1:9")
            .expect("client construction should not fail");
        SearchGateway::new(client, ResponseCache::default())
    }

    fn summary(id: &str) -> Business {
        Business {
            id: id.to_owned(),
            name: format!("{id} summary"),
            distance: Some(120.5),
            distance_away: 1.25,
            ..Business::default()
        }
    }

    fn reviews_of(texts: &[&str]) -> ReviewsResponse {
        ReviewsResponse {
            reviews: texts
                .iter()
                .map(|t| Review {
                    text: (*t).to_owned(),
                    rating: 5,
                    ..Review::default()
                })
                .collect(),
            total: texts.len() as u64,
            ..ReviewsResponse::default()
        }
    }

    #[tokio::test]
    async fn cache_hit_skips_the_network() {
        let gateway = offline_gateway();
        let cached = SearchResponse {
            total: 7,
            term: Some("Tacos".to_owned()),
            ..SearchResponse::default()
        };
        gateway
            .cache()
            .put_default(CacheKey::new("Dallas", "Texas", "Tacos"), cached);

        let response = gateway
            .search_by_city_state("tacos", "Dallas", "Texas", 5, false, &CancellationToken::new())
            .await
            .expect("cached response");
        assert_eq!(response.total, 7);
        assert_eq!(response.term.as_deref(), Some("Tacos"));
    }

    #[tokio::test]
    async fn missing_city_and_state_fails_validation() {
        let gateway = offline_gateway();
        let err = gateway
            .search_by_city_state("tacos", " ", "", 5, false, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FusionError::Validation(ValidationError::MissingSearchAnchor)
        ));
        assert!(gateway.cache().is_empty());
    }

    #[tokio::test]
    async fn out_of_range_latitude_fails_before_network() {
        let gateway = offline_gateway();
        let err = gateway
            .search_by_text("tacos", 91.0, 0.0, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FusionError::Validation(ValidationError::LatitudeOutOfRange(_))
        ));
    }

    #[test]
    fn zero_concurrency_is_clamped() {
        let gateway = offline_gateway().with_hydration_concurrency(0);
        assert_eq!(gateway.hydration_concurrency, 1);
    }

    #[test]
    fn merge_prefers_detail_and_keeps_search_distances() {
        let detail = Business {
            id: "a".to_owned(),
            name: "a detail".to_owned(),
            photos: vec!["https://img/1.jpg".to_owned()],
            ..Business::default()
        };
        let merged = merge_detail(summary("a"), detail, reviews_of(&["great"]));
        assert_eq!(merged.name, "a detail");
        assert_eq!(merged.photos.len(), 1);
        assert_eq!(merged.distance, Some(120.5));
        assert!((merged.distance_away - 1.25).abs() < f64::EPSILON);
        assert_eq!(merged.reviews.len(), 1);
    }

    #[test]
    fn merge_keeps_summary_when_detail_has_error() {
        let detail = Business {
            error: Some(ResponseError {
                code: "BUSINESS_NOT_FOUND".to_owned(),
                description: "gone".to_owned(),
            }),
            ..Business::default()
        };
        let merged = merge_detail(summary("a"), detail, reviews_of(&["ok"]));
        assert_eq!(merged.name, "a summary");
        assert!(merged.error.is_none());
        assert_eq!(merged.reviews.len(), 1);
    }

    #[test]
    fn merge_ignores_reviews_with_error() {
        let reviews = ReviewsResponse {
            error: Some(ResponseError {
                code: "INTERNAL_ERROR".to_owned(),
                description: "x".to_owned(),
            }),
            ..ReviewsResponse::default()
        };
        let merged = merge_detail(summary("a"), summary("a"), reviews);
        assert!(merged.reviews.is_empty());
    }
}
