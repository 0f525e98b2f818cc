//! Request ids and the upstream call budget.
//!
//! Every Fusion call counts against the API key's quota, and one local hit
//! can fan out: a hydrated city search costs one search plus a detail and a
//! review lookup per business. The budget therefore charges each request
//! its worst-case number of upstream calls instead of counting hits.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Query, Request, State},
    http::{header::RETRY_AFTER, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::{normalize_limit, ApiError};
use crate::views::CATEGORY_PAGE_LIMIT;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longer caller-supplied ids are replaced rather than echoed.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Request id, stored as a request extension for handlers and error bodies.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

fn caller_request_id(headers: &HeaderMap) -> Option<String> {
    let id = headers.get(REQUEST_ID_HEADER)?.to_str().ok()?.trim();
    (!id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN).then(|| id.to_owned())
}

/// Reuses the caller's `x-request-id` or mints a v4 UUID, then echoes it on
/// the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = caller_request_id(req.headers()).unwrap_or_else(|| Uuid::new_v4().to_string());
    req.extensions_mut().insert(RequestId(id.clone()));

    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Fusion calls made by a search that hydrates `limit` businesses.
pub(crate) fn hydrated_search_cost(limit: u32) -> u32 {
    limit.saturating_mul(2).saturating_add(1)
}

#[derive(Debug, Default, Deserialize)]
struct FanOut {
    #[serde(default)]
    details: bool,
    limit: Option<u32>,
}

/// Worst-case upstream calls for one request. Cache hits are charged too,
/// since whether a search will hit is only known inside the handler.
pub(crate) fn upstream_cost(req: &Request) -> u32 {
    match req.uri().path() {
        "/category" => hydrated_search_cost(CATEGORY_PAGE_LIMIT),
        "/api/v1/search/city" => {
            let fan_out = Query::<FanOut>::try_from_uri(req.uri())
                .map(|Query(q)| q)
                .unwrap_or_default();
            if fan_out.details {
                hydrated_search_cost(normalize_limit(fan_out.limit))
            } else {
                1
            }
        }
        _ => 1,
    }
}

#[derive(Debug)]
struct BudgetWindow {
    opened_at: Instant,
    spent: u32,
}

/// Fixed-window allowance of upstream calls shared by every route that
/// reaches the Fusion API.
#[derive(Debug, Clone)]
pub struct UpstreamBudget {
    calls_per_window: u32,
    window: Duration,
    current: Arc<Mutex<BudgetWindow>>,
}

impl UpstreamBudget {
    #[must_use]
    pub fn new(calls_per_window: u32, window: Duration) -> Self {
        Self {
            calls_per_window: calls_per_window.max(1),
            window,
            current: Arc::new(Mutex::new(BudgetWindow {
                opened_at: Instant::now(),
                spent: 0,
            })),
        }
    }

    /// Spends `cost` calls, or returns the time left until the window
    /// reopens. A cost above the whole allowance is charged as the whole
    /// allowance so that request can still run in an empty window.
    async fn charge(&self, cost: u32) -> Result<(), Duration> {
        let cost = cost.min(self.calls_per_window);
        let mut current = self.current.lock().await;
        let now = Instant::now();
        if now.duration_since(current.opened_at) >= self.window {
            *current = BudgetWindow {
                opened_at: now,
                spent: 0,
            };
        }
        if current.spent + cost > self.calls_per_window {
            let open_for = now.duration_since(current.opened_at);
            return Err(self.window.saturating_sub(open_for));
        }
        current.spent += cost;
        Ok(())
    }
}

/// Rejects requests the budget cannot cover with a `rate_limited`
/// [`ApiError`] and a `Retry-After` header. Must run inside [`request_id`].
pub async fn enforce_upstream_budget(
    State(budget): State<UpstreamBudget>,
    req: Request,
    next: Next,
) -> Response {
    let cost = upstream_cost(&req);
    let Err(reopens_in) = budget.charge(cost).await else {
        return next.run(req).await;
    };

    let retry_secs = reopens_in.as_secs() + u64::from(reopens_in.subsec_nanos() > 0);
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();
    tracing::warn!(
        path = %req.uri().path(),
        cost,
        retry_secs,
        "upstream call budget exhausted"
    );

    let mut response = ApiError::new(
        request_id,
        "rate_limited",
        format!("upstream call budget exhausted, retry in {retry_secs}s"),
    )
    .into_response();
    response
        .headers_mut()
        .insert(RETRY_AFTER, HeaderValue::from(retry_secs.max(1)));
    response
}
