//! HTTP client for the Fusion v3 REST API.
//!
//! Wraps `reqwest` with bearer authentication, bounded retry for transient
//! failures, caller-driven cancellation, and typed deserialization. The
//! endpoint methods live in [`endpoints`].

mod endpoints;

use std::time::Duration;

use fusion_core::{AppConfig, DistanceUnit};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::error::{FusionError, ValidationError};
use crate::query::{encode_query, QueryParams};
use crate::retry::RetryPolicy;
use crate::types::ErrorEnvelope;

pub const DEFAULT_BASE_URL: &str = "https://api.yelp.com";
const API_VERSION: &str = "/v3";

/// Transport settings for [`FusionClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Additional attempts after the first failure for transient errors.
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub distance_unit: DistanceUnit,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: "fusion-search/0.1".to_owned(),
            max_retries: 2,
            backoff_base_ms: 500,
            distance_unit: DistanceUnit::default(),
        }
    }
}

impl ClientOptions {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            timeout_secs: config.request_timeout_secs,
            user_agent: config.user_agent.clone(),
            max_retries: config.max_retries,
            backoff_base_ms: config.retry_backoff_base_ms,
            distance_unit: config.distance_unit,
        }
    }
}

/// Client for the Fusion REST API.
///
/// Use [`FusionClient::new`] for production or [`FusionClient::with_base_url`]
/// to point at a mock server in tests.
pub struct FusionClient {
    client: Client,
    api_key: String,
    base_url: String,
    retry: RetryPolicy,
    distance_unit: DistanceUnit,
}

impl std::fmt::Debug for FusionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FusionClient")
            .field("api_key", &"[redacted]")
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .field("distance_unit", &self.distance_unit)
            .finish_non_exhaustive()
    }
}

impl FusionClient {
    /// Creates a client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::Validation`] for an empty key or
    /// [`FusionError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(api_key: &str, options: &ClientOptions) -> Result<Self, FusionError> {
        Self::with_base_url(api_key, options, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::Validation`] for an empty key,
    /// [`FusionError::InvalidBaseUrl`] if `base_url` does not parse, or
    /// [`FusionError::Http`] if the `reqwest::Client` cannot be built.
    pub fn with_base_url(
        api_key: &str,
        options: &ClientOptions,
        base_url: &str,
    ) -> Result<Self, FusionError> {
        if api_key.trim().is_empty() {
            return Err(ValidationError::EmptyApiKey.into());
        }

        let normalised = base_url.trim_end_matches('/').to_owned();
        Url::parse(&normalised).map_err(|e| FusionError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(options.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url: normalised,
            retry: RetryPolicy::new(options.max_retries, options.backoff_base_ms),
            distance_unit: options.distance_unit,
        })
    }

    /// Builds a client from application configuration.
    ///
    /// # Errors
    ///
    /// See [`FusionClient::with_base_url`].
    pub fn from_config(config: &AppConfig) -> Result<Self, FusionError> {
        Self::with_base_url(
            &config.api_key,
            &ClientOptions::from_config(config),
            &config.api_base_url,
        )
    }

    #[must_use]
    pub fn distance_unit(&self) -> DistanceUnit {
        self.distance_unit
    }

    /// `{base}/v3{path}{?query}`. `path` must already be escaped.
    fn endpoint_url(&self, path: &str, params: &QueryParams) -> Result<Url, FusionError> {
        let raw = format!("{}{API_VERSION}{path}{}", self.base_url, encode_query(params));
        Url::parse(&raw).map_err(|e| FusionError::InvalidBaseUrl {
            url: raw,
            reason: e.to_string(),
        })
    }

    /// Issues an authenticated GET with retry, racing `cancel` against both
    /// the in-flight request and any back-off wait.
    ///
    /// # Errors
    ///
    /// - [`FusionError::Cancelled`] if `cancel` fires first.
    /// - [`FusionError::Http`] on network failure or timeout.
    /// - [`FusionError::UnexpectedStatus`] on a non-2xx status without an
    ///   error envelope.
    /// - [`FusionError::Deserialize`] if the body does not decode as `T`.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &QueryParams,
        cancel: &CancellationToken,
    ) -> Result<T, FusionError> {
        let url = self.endpoint_url(path, params)?;

        let request = self.retry.run(cancel, || self.send_once::<T>(url.clone()));

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!(path, "Fusion API request cancelled");
                Err(FusionError::Cancelled)
            }
            result = request => result,
        }
    }

    async fn send_once<T: DeserializeOwned>(&self, url: Url) -> Result<T, FusionError> {
        tracing::debug!(url = %url, "Fusion API request");

        let response = self
            .client
            .get(url.clone())
            .bearer_auth(&self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        let status = response.status();
        let retry_after = retry_after(response.headers());
        let body = response.text().await?;

        if !status.is_success() {
            if let Ok(ErrorEnvelope { error: Some(error) }) =
                serde_json::from_str::<ErrorEnvelope>(&body)
            {
                tracing::warn!(
                    status = status.as_u16(),
                    code = %error.code,
                    url = %url,
                    "Fusion API returned an error envelope"
                );
                return decode(&body, &url);
            }
            return Err(FusionError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
                retry_after,
            });
        }

        decode(&body, &url)
    }
}

/// Delta-seconds form of `Retry-After`. The HTTP-date form is ignored and
/// the regular back-off applies instead.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn decode<T: DeserializeOwned>(body: &str, url: &Url) -> Result<T, FusionError> {
    serde_json::from_str(body).map_err(|e| FusionError::Deserialize {
        context: format!("GET {}", url.path()),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;
    use crate::query::QueryValue;

    fn test_client(base_url: &str) -> FusionClient {
        FusionClient::with_base_url("test-key", &ClientOptions::default(), base_url)
            .expect("client construction should not fail")
    }

    #[test]
    fn endpoint_url_without_params_has_no_query() {
        let client = test_client("https://api.yelp.com");
        let url = client
            .endpoint_url("/businesses/abc", &QueryParams::new())
            .unwrap();
        assert_eq!(url.as_str(), "https://api.yelp.com/v3/businesses/abc");
    }

    #[test]
    fn endpoint_url_strips_trailing_slash_and_appends_query() {
        let client = test_client("https://api.yelp.com/");
        let mut params = QueryParams::new();
        params.insert("term".to_owned(), QueryValue::from("fish tacos"));
        let url = client.endpoint_url("/businesses/search", &params).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.yelp.com/v3/businesses/search?term=fish%20tacos"
        );
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let err = FusionClient::new("  ", &ClientOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            FusionError::Validation(ValidationError::EmptyApiKey)
        ));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err =
            FusionClient::with_base_url("k", &ClientOptions::default(), "not a url").unwrap_err();
        assert!(matches!(err, FusionError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn retry_after_reads_delta_seconds_only() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);
        headers.insert(RETRY_AFTER, HeaderValue::from_static(" 3 "));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(3)));
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2026 07:28:00 GMT"),
        );
        assert_eq!(retry_after(&headers), None);
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let client = test_client("https://api.yelp.com");
        assert!(!format!("{client:?}").contains("test-key"));
    }
}
