//! Fusion API response types.
//!
//! Every struct is decoded leniently: unknown fields are ignored and absent
//! fields fall back to their defaults, so additive API changes do not break
//! deserialization. Error envelopes (`{"error": {...}}`) decode into the
//! `error` field of whichever response type was requested.

use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// `{ "code": "...", "description": "..." }` as returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseError {
    pub code: String,
    pub description: String,
}

impl fmt::Display for ResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.description)
    }
}

/// Body shape used to recognise an error envelope on a non-2xx response.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: Option<ResponseError>,
}

fn nan_if_null<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

fn nan() -> f64 {
    f64::NAN
}

/// Explicit `null` decodes like an absent field. Pair with a container or
/// field `#[serde(default)]` so the field may also be missing.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

/// A latitude/longitude pair. Both default to NaN ("unset"), since `(0, 0)`
/// is a real place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    #[serde(default = "nan", deserialize_with = "nan_if_null")]
    pub latitude: f64,
    #[serde(default = "nan", deserialize_with = "nan_if_null")]
    pub longitude: f64,
}

impl Default for Coordinates {
    fn default() -> Self {
        Self {
            latitude: f64::NAN,
            longitude: f64::NAN,
        }
    }
}

impl Coordinates {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// `true` when both components hold a number.
    #[must_use]
    pub fn is_set(&self) -> bool {
        !self.latitude.is_nan() && !self.longitude.is_nan()
    }
}

// ---------------------------------------------------------------------------
// Business
// ---------------------------------------------------------------------------

/// Category equality ignores case on `alias`; `title` is display-only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Category {
    pub alias: String,
    pub title: String,
}

impl PartialEq for Category {
    fn eq(&self, other: &Self) -> bool {
        self.alias.eq_ignore_ascii_case(&other.alias)
    }
}

impl Eq for Category {}

impl Hash for Category {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.alias.to_ascii_lowercase().hash(state);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub address3: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub display_address: Vec<String>,
}

/// One opening window. `day` is 0 for Monday through 6 for Sunday; `start`
/// and `end` are 24-hour `HHMM` strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenPeriod {
    pub day: u8,
    pub start: String,
    pub end: String,
    pub is_overnight: bool,
}

const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// `"0830"` → `"8:30am"`. Anything that does not parse is returned unchanged.
fn format_hhmm(raw: &str) -> String {
    let parsed = (raw.len() == 4 && raw.is_ascii())
        .then(|| (raw[..2].parse::<u32>().ok(), raw[2..].parse::<u32>().ok()))
        .and_then(|(h, m)| Some((h?, m?)))
        .filter(|(h, m)| *h < 24 && *m < 60);

    match parsed {
        Some((hour, minute)) => {
            let suffix = if hour < 12 { "am" } else { "pm" };
            let display_hour = match hour % 12 {
                0 => 12,
                h => h,
            };
            format!("{display_hour}:{minute:02}{suffix}")
        }
        None => raw.to_owned(),
    }
}

impl fmt::Display for OpenPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let day = WEEKDAYS
            .get(usize::from(self.day))
            .copied()
            .unwrap_or("Unknown day");
        write!(
            f,
            "{day}: {} - {}",
            format_hhmm(&self.start),
            format_hhmm(&self.end)
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hours {
    pub hours_type: String,
    pub is_open_now: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub open: Vec<OpenPeriod>,
}

/// A business as returned by search, autocomplete, or the detail endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Business {
    pub id: String,
    pub alias: String,
    pub name: String,
    pub image_url: Option<String>,
    pub is_claimed: bool,
    pub is_closed: bool,
    pub url: Option<String>,
    pub phone: Option<String>,
    pub display_phone: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub review_count: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub categories: Vec<Category>,
    #[serde(deserialize_with = "null_as_default")]
    pub rating: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub coordinates: Coordinates,
    #[serde(deserialize_with = "null_as_default")]
    pub location: Location,
    pub price: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub hours: Vec<Hours>,
    #[serde(deserialize_with = "null_as_default")]
    pub photos: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub transactions: Vec<String>,
    /// Distance in meters as reported by the API.
    pub distance: Option<f64>,
    /// Locally computed distance from the search origin; NaN until
    /// annotated. Never read from the wire.
    #[serde(skip_deserializing, default = "nan")]
    pub distance_away: f64,
    /// Filled in by detail hydration.
    #[serde(deserialize_with = "null_as_default")]
    pub reviews: Vec<Review>,
    pub error: Option<ResponseError>,
}

impl Default for Business {
    fn default() -> Self {
        Self {
            id: String::new(),
            alias: String::new(),
            name: String::new(),
            image_url: None,
            is_claimed: false,
            is_closed: false,
            url: None,
            phone: None,
            display_phone: None,
            review_count: 0,
            categories: Vec::new(),
            rating: 0.0,
            coordinates: Coordinates::default(),
            location: Location::default(),
            price: None,
            hours: Vec::new(),
            photos: Vec::new(),
            transactions: Vec::new(),
            distance: None,
            distance_away: f64::NAN,
            reviews: Vec::new(),
            error: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Region {
    pub center: Coordinates,
}

/// Search results. `city`, `state`, `term`, and `request_time` are never
/// sent by the API; the city/state search stamps them before caching.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub businesses: Vec<Business>,
    #[serde(deserialize_with = "null_as_default")]
    pub total: u64,
    pub region: Option<Region>,
    pub error: Option<ResponseError>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub term: Option<String>,
    pub request_time: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Reviews
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewUser {
    pub id: Option<String>,
    pub name: String,
    pub image_url: Option<String>,
    pub profile_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Review {
    pub id: Option<String>,
    pub rating: u8,
    pub text: String,
    pub time_created: String,
    pub url: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub user: ReviewUser,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewsResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub reviews: Vec<Review>,
    #[serde(deserialize_with = "null_as_default")]
    pub total: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub possible_languages: Vec<String>,
    pub error: Option<ResponseError>,
}

// ---------------------------------------------------------------------------
// Autocomplete
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Term {
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AutocompleteResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub businesses: Vec<Business>,
    #[serde(deserialize_with = "null_as_default")]
    pub categories: Vec<Category>,
    #[serde(deserialize_with = "null_as_default")]
    pub terms: Vec<Term>,
    pub error: Option<ResponseError>,
}
