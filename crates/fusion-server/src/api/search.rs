use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use fusion_client::{AutocompleteResponse, Business, ReviewsResponse, SearchResponse};
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{map_fusion_error, normalize_limit, ApiError, ApiResponse, AppState};

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Debug, Deserialize)]
pub(super) struct PointQuery {
    #[serde(default)]
    pub term: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CityQuery {
    #[serde(default)]
    pub term: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub limit: Option<u32>,
    #[serde(default)]
    pub details: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct AutocompleteQuery {
    #[serde(default)]
    pub text: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub locale: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct LocaleQuery {
    pub locale: Option<String>,
}

fn require_point(
    req_id: &RequestId,
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> Result<(f64, f64), ApiError> {
    match (latitude, longitude) {
        (Some(lat), Some(lon)) => Ok((lat, lon)),
        _ => Err(ApiError::new(
            req_id.0.clone(),
            "validation_error",
            "latitude and longitude are required",
        )),
    }
}

pub(super) async fn search_by_text(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<PointQuery>,
) -> ApiResult<SearchResponse> {
    let (lat, lon) = require_point(&req_id, query.latitude, query.longitude)?;
    let response = state
        .gateway
        .search_by_text(&query.term, lat, lon, &state.request_token())
        .await
        .map_err(|e| map_fusion_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(req_id.0, response))
}

/// City/state search. Missing `city` or `state` fall back to the configured
/// defaults so `/api/v1/search/city?term=bars` works out of the box.
pub(super) async fn search_by_city_state(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<CityQuery>,
) -> ApiResult<SearchResponse> {
    let city = query.city.as_deref().unwrap_or(&*state.default_city);
    let region = query.state.as_deref().unwrap_or(&*state.default_state);
    let response = state
        .gateway
        .search_by_city_state(
            &query.term,
            city,
            region,
            normalize_limit(query.limit),
            query.details,
            &state.request_token(),
        )
        .await
        .map_err(|e| map_fusion_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(req_id.0, response))
}

pub(super) async fn search_with_delivery(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<PointQuery>,
) -> ApiResult<SearchResponse> {
    let (lat, lon) = require_point(&req_id, query.latitude, query.longitude)?;
    let response = state
        .gateway
        .search_with_delivery(&query.term, lat, lon, &state.request_token())
        .await
        .map_err(|e| map_fusion_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(req_id.0, response))
}

pub(super) async fn autocomplete(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<AutocompleteQuery>,
) -> ApiResult<AutocompleteResponse> {
    let (lat, lon) = require_point(&req_id, query.latitude, query.longitude)?;
    let response = state
        .gateway
        .autocomplete(
            &query.text,
            lat,
            lon,
            query.locale.as_deref(),
            &state.request_token(),
        )
        .await
        .map_err(|e| map_fusion_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(req_id.0, response))
}

pub(super) async fn get_business(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> ApiResult<Business> {
    let business = state
        .gateway
        .get_business(&id, &state.request_token())
        .await
        .map_err(|e| map_fusion_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(req_id.0, business))
}

pub(super) async fn get_reviews(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
    Query(query): Query<LocaleQuery>,
) -> ApiResult<ReviewsResponse> {
    let reviews = state
        .gateway
        .get_reviews(&id, query.locale.as_deref(), &state.request_token())
        .await
        .map_err(|e| map_fusion_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(req_id.0, reviews))
}
