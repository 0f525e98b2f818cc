//! Server-rendered HTML pages.
//!
//! Markup is assembled with `format!` and every value that came from the
//! API or the query string goes through `html_escape` first.

use std::fmt::Write as _;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Extension,
};
use fusion_client::{Business, SearchResponse};
use html_escape::{encode_double_quoted_attribute, encode_text};
use serde::Deserialize;

use crate::api::{map_fusion_error, AppState};
use crate::middleware::RequestId;

/// Categories linked from the index page.
const FEATURED_CATEGORIES: [(&str, &str); 6] = [
    ("bars", "Bars"),
    ("restaurants", "Restaurants"),
    ("coffee", "Coffee & Tea"),
    ("breweries", "Breweries"),
    ("pizza", "Pizza"),
    ("bbq", "Barbeque"),
];

pub(crate) const CATEGORY_PAGE_LIMIT: u32 = 10;

#[derive(Debug, Deserialize)]
pub(crate) struct CategoryQuery {
    pub cat: Option<String>,
}

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{}</title>\n</head>\n<body>\n{body}</body>\n</html>\n",
        encode_text(title)
    ))
}

pub(crate) async fn index(State(state): State<AppState>) -> Html<String> {
    let mut body = format!(
        "<h1>Fusion Search</h1>\n<p>Top rated in {}, {}</p>\n<ul>\n",
        encode_text(&state.default_city),
        encode_text(&state.default_state)
    );
    for (alias, label) in FEATURED_CATEGORIES {
        let _ = writeln!(
            body,
            "<li><a href=\"/category?cat={}\">{}</a></li>",
            encode_double_quoted_attribute(alias),
            encode_text(label)
        );
    }
    body.push_str("</ul>\n");
    page("Fusion Search", &body)
}

/// Detail-hydrated city/state search for the configured default location.
pub(crate) async fn category(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<CategoryQuery>,
) -> Response {
    let cat = query
        .cat
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or("bars");

    let result = state
        .gateway
        .search_by_city_state(
            cat,
            &state.default_city,
            &state.default_state,
            CATEGORY_PAGE_LIMIT,
            true,
            &state.request_token(),
        )
        .await;

    match result {
        Ok(response) => render_category(&response).into_response(),
        Err(e) => {
            let api_error = map_fusion_error(req_id.0, &e);
            let status = api_error.into_response().status();
            let message = if status == StatusCode::BAD_REQUEST {
                e.to_string()
            } else {
                "The search service is unavailable right now.".to_owned()
            };
            (
                status,
                page("Search failed", &format!("<p>{}</p>\n", encode_text(&message))),
            )
                .into_response()
        }
    }
}

fn render_category(response: &SearchResponse) -> Html<String> {
    let term = response.term.as_deref().unwrap_or_default();
    let city = response.city.as_deref().unwrap_or_default();
    let state = response.state.as_deref().unwrap_or_default();
    let title = format!("{term} in {city}, {state}");

    let mut body = format!("<h1>{}</h1>\n", encode_text(&title));
    if let Some(error) = &response.error {
        let _ = writeln!(body, "<p class=\"error\">{}</p>", encode_text(&error.description));
        return page(&title, &body);
    }
    if let Some(at) = response.request_time {
        let _ = writeln!(body, "<p>Fetched {}</p>", at.format("%Y-%m-%d %H:%M UTC"));
    }
    if response.businesses.is_empty() {
        body.push_str("<p>No results.</p>\n");
    }
    for business in &response.businesses {
        render_business(&mut body, business);
    }
    body.push_str("<p><a href=\"/\">Back</a></p>\n");
    page(&title, &body)
}

fn render_business(out: &mut String, business: &Business) {
    out.push_str("<section class=\"business\">\n");
    match business.url.as_deref() {
        Some(url) => {
            let _ = writeln!(
                out,
                "<h2><a href=\"{}\">{}</a></h2>",
                encode_double_quoted_attribute(url),
                encode_text(&business.name)
            );
        }
        None => {
            let _ = writeln!(out, "<h2>{}</h2>", encode_text(&business.name));
        }
    }
    let _ = writeln!(
        out,
        "<p>{:.1} stars, {} reviews{}</p>",
        business.rating,
        business.review_count,
        business
            .price
            .as_deref()
            .map(|p| format!(", {}", encode_text(p)))
            .unwrap_or_default()
    );
    if !business.location.display_address.is_empty() {
        let _ = writeln!(
            out,
            "<p>{}</p>",
            encode_text(&business.location.display_address.join(", "))
        );
    }
    if let Some(hours) = business.hours.first() {
        out.push_str("<ul class=\"hours\">\n");
        for period in &hours.open {
            let _ = writeln!(out, "<li>{}</li>", encode_text(&period.to_string()));
        }
        out.push_str("</ul>\n");
    }
    if let Some(photo) = business.photos.first() {
        let _ = writeln!(
            out,
            "<img src=\"{}\" alt=\"{}\" width=\"200\">",
            encode_double_quoted_attribute(photo),
            encode_double_quoted_attribute(&business.name)
        );
    }
    for review in &business.reviews {
        let _ = writeln!(
            out,
            "<blockquote>{} ({}/5) <cite>{}</cite></blockquote>",
            encode_text(&review.text),
            review.rating,
            encode_text(&review.user.name)
        );
    }
    out.push_str("</section>\n");
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use fusion_client::{Hours, OpenPeriod, Review, ReviewUser};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::api::test_support::state_for;
    use crate::api::{build_app, default_upstream_budget};

    async fn get_html(app: axum::Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        (status, String::from_utf8(body.to_vec()).expect("utf8"))
    }

    #[test]
    fn business_markup_escapes_api_text() {
        let business = Business {
            name: "<script>alert(1)</script>".to_owned(),
            url: Some("https://x.example/\"onmouseover".to_owned()),
            hours: vec![Hours {
                open: vec![OpenPeriod {
                    day: 4,
                    start: "1600".to_owned(),
                    end: "0200".to_owned(),
                    is_overnight: true,
                }],
                ..Hours::default()
            }],
            reviews: vec![Review {
                text: "Good & cheap".to_owned(),
                rating: 4,
                user: ReviewUser {
                    name: "Jo".to_owned(),
                    ..ReviewUser::default()
                },
                ..Review::default()
            }],
            ..Business::default()
        };
        let mut out = String::new();
        render_business(&mut out, &business);

        assert!(!out.contains("<script>"));
        assert!(out.contains("&lt;script&gt;"));
        assert!(!out.contains("/\"onmouseover"));
        assert!(out.contains("Friday: 4:00pm - 2:00am"));
        assert!(out.contains("Good &amp; cheap (4/5)"));
    }

    #[tokio::test]
    async fn index_links_featured_categories() {
        let app = build_app(state_for("http://127.0.0.1:9"), default_upstream_budget());
        let (status, html) = get_html(app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("Top rated in Wichita, Kansas"));
        assert!(html.contains("href=\"/category?cat=bars\""));
        assert!(html.contains("Coffee &amp; Tea"));
    }

    #[tokio::test]
    async fn category_page_renders_hydrated_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/businesses/search"))
            .and(query_param("term", "Bars"))
            .and(query_param("location", "Wichita, Kansas"))
            .and(query_param("limit", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "businesses": [{ "id": "pub-1", "name": "Pub summary" }],
                "total": 1
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v3/businesses/pub-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "pub-1",
                "name": "The Pub",
                "rating": 4.5,
                "review_count": 88
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v3/businesses/pub-1/reviews"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "reviews": [{ "rating": 5, "text": "Great taps", "user": { "name": "Ann" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let app = build_app(state_for(&server.uri()), default_upstream_budget());
        let (status, html) = get_html(app, "/category").await;

        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("<h1>Bars in Wichita, Kansas</h1>"));
        assert!(html.contains("The Pub"));
        assert!(html.contains("4.5 stars, 88 reviews"));
        assert!(html.contains("Great taps (5/5)"));
    }

    #[tokio::test]
    async fn category_page_reports_upstream_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let app = build_app(state_for(&server.uri()), default_upstream_budget());
        let (status, html) = get_html(app, "/category?cat=pizza").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(html.contains("unavailable right now"));
    }
}
