//! Typed client SDK for the Yelp Fusion v3 API.
//!
//! [`SearchGateway`] is the usual entry point: it wraps a [`FusionClient`]
//! with a time-bounded [`ResponseCache`] and optional detail hydration for
//! city/state searches. Requests are built with the change-tracked
//! [`SearchRequest`], so only explicitly assigned parameters go on the wire.

pub mod cache;
pub mod client;
pub mod distance;
pub mod error;
pub mod gateway;
pub mod normalize;
pub mod query;
pub mod request;
pub(crate) mod retry;
pub mod tracked;
pub mod types;

pub use cache::{CacheKey, ResponseCache, DEFAULT_TTL};
pub use client::{ClientOptions, FusionClient, DEFAULT_BASE_URL};
pub use distance::{annotate_distances, distance_between};
pub use error::{FusionError, ValidationError};
pub use gateway::SearchGateway;
pub use query::{encode_query, QueryParams, QueryValue};
pub use request::{validate_coordinates, SearchField, SearchRequest};
pub use tracked::{ChangeTracked, Touched, WireField};
pub use types::{
    AutocompleteResponse, Business, Category, Coordinates, Hours, Location, OpenPeriod, Region,
    ResponseError, Review, ReviewUser, ReviewsResponse, SearchResponse, Term,
};

pub use fusion_core::DistanceUnit;
pub use tokio_util::sync::CancellationToken;
