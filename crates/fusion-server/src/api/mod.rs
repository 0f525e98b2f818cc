mod search;

use std::{sync::Arc, time::Duration};

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use fusion_client::{FusionError, SearchGateway};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{enforce_upstream_budget, request_id, RequestId, UpstreamBudget};
use crate::views;

/// Shared handler state.
///
/// `shutdown` is cancelled when the server starts draining; every handler
/// derives its per-request token from it so in-flight upstream calls stop.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<SearchGateway>,
    pub default_city: Arc<str>,
    pub default_state: Arc<str>,
    pub shutdown: CancellationToken,
}

impl AppState {
    #[must_use]
    pub fn new(gateway: SearchGateway, config: &fusion_core::AppConfig) -> Self {
        Self {
            gateway: Arc::new(gateway),
            default_city: Arc::from(config.default_city.as_str()),
            default_state: Arc::from(config.default_state.as_str()),
            shutdown: CancellationToken::new(),
        }
    }

    pub(crate) fn request_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    cached_searches: usize,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(request_id: String, data: T) -> Json<Self> {
        Json(Self {
            data,
            meta: ResponseMeta::new(request_id),
        })
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "cancelled" => StatusCode::SERVICE_UNAVAILABLE,
            "upstream_error" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

/// Largest page the search endpoint accepts.
pub(super) const MAX_LIMIT: u32 = 50;

pub(crate) fn normalize_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(20).clamp(1, MAX_LIMIT)
}

pub(crate) fn map_fusion_error(request_id: String, error: &FusionError) -> ApiError {
    match error {
        FusionError::Validation(e) => ApiError::new(request_id, "validation_error", e.to_string()),
        FusionError::Cancelled => {
            tracing::info!("upstream request cancelled");
            ApiError::new(request_id, "cancelled", "request cancelled")
        }
        FusionError::InvalidBaseUrl { .. } => {
            tracing::error!(error = %error, "fusion client misconfigured");
            ApiError::new(request_id, "internal_error", "search backend misconfigured")
        }
        FusionError::Http(_)
        | FusionError::UnexpectedStatus { .. }
        | FusionError::Deserialize { .. } => {
            tracing::error!(error = %error, "fusion API call failed");
            ApiError::new(request_id, "upstream_error", "search backend request failed")
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-request-id")])
}

/// Routes that reach the Fusion API, charged against the upstream budget.
fn upstream_router(budget: UpstreamBudget) -> Router<AppState> {
    Router::new()
        .route("/api/v1/search", get(search::search_by_text))
        .route("/api/v1/search/city", get(search::search_by_city_state))
        .route("/api/v1/delivery", get(search::search_with_delivery))
        .route("/api/v1/autocomplete", get(search::autocomplete))
        .route("/api/v1/businesses/{id}", get(search::get_business))
        .route("/api/v1/businesses/{id}/reviews", get(search::get_reviews))
        .route("/category", get(views::category))
        .layer(axum::middleware::from_fn_with_state(
            budget,
            enforce_upstream_budget,
        ))
}

pub fn build_app(state: AppState, budget: UpstreamBudget) -> Router {
    let public_routes = Router::new()
        .route("/api/v1/health", get(health))
        .route("/", get(views::index));

    Router::new()
        .merge(public_routes)
        .merge(upstream_router(budget))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    ApiResponse::new(
        req_id.0,
        HealthData {
            status: "ok",
            cached_searches: state.gateway.cache().len(),
        },
    )
}

/// 300 upstream calls a minute: about fourteen hydrated `/category` pages.
pub fn default_upstream_budget() -> UpstreamBudget {
    UpstreamBudget::new(300, Duration::from_secs(60))
}
