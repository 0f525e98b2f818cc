//! Search parameters for the `/businesses/search` endpoint.

use crate::error::ValidationError;
use crate::query::QueryValue;
use crate::tracked::{ChangeTracked, Touched, WireField};
use crate::types::Coordinates;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SearchField {
    Term,
    Location,
    Latitude,
    Longitude,
    Radius,
    Categories,
    Locale,
    Price,
    SortBy,
    MaxResults,
    ResultsOffset,
    OpenAt,
    OpenNow,
    Attributes,
}

impl WireField for SearchField {
    fn wire_name(self) -> &'static str {
        match self {
            SearchField::Term => "term",
            SearchField::Location => "location",
            SearchField::Latitude => "latitude",
            SearchField::Longitude => "longitude",
            SearchField::Radius => "radius",
            SearchField::Categories => "categories",
            SearchField::Locale => "locale",
            SearchField::Price => "price",
            SearchField::SortBy => "sort_by",
            SearchField::MaxResults => "limit",
            SearchField::ResultsOffset => "offset",
            SearchField::OpenAt => "open_at",
            SearchField::OpenNow => "open_now",
            SearchField::Attributes => "attributes",
        }
    }
}

/// Container for every parameter accepted by the search endpoint.
///
/// Only fields assigned through a setter are serialized. Setting a field to
/// the API's own default still sends it.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    term: Option<String>,
    location: Option<String>,
    latitude: f64,
    longitude: f64,
    radius: Option<u32>,
    categories: Option<String>,
    locale: Option<String>,
    price: Option<String>,
    sort_by: Option<String>,
    max_results: u32,
    results_offset: u32,
    open_at: Option<i64>,
    open_now: bool,
    attributes: Option<String>,
    touched: Touched<SearchField>,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            term: None,
            location: None,
            latitude: f64::NAN,
            longitude: f64::NAN,
            radius: None,
            categories: None,
            locale: None,
            price: None,
            sort_by: None,
            max_results: 20,
            results_offset: 0,
            open_at: None,
            open_now: false,
            attributes: None,
            touched: Touched::default(),
        }
    }
}

impl SearchRequest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- setters: the only mutation path -----------------------------------

    /// Search term, e.g. `"food"` or a business name such as `"Starbucks"`.
    pub fn set_term(&mut self, term: impl Into<String>) -> &mut Self {
        self.term = Some(term.into());
        self.touched.mark(SearchField::Term);
        self
    }

    /// Free-form location, e.g. `"Dallas, Texas"`. Required when no
    /// coordinates are given.
    pub fn set_location(&mut self, location: impl Into<String>) -> &mut Self {
        self.location = Some(location.into());
        self.touched.mark(SearchField::Location);
        self
    }

    pub fn set_latitude(&mut self, latitude: f64) -> &mut Self {
        self.latitude = latitude;
        self.touched.mark(SearchField::Latitude);
        self
    }

    pub fn set_longitude(&mut self, longitude: f64) -> &mut Self {
        self.longitude = longitude;
        self.touched.mark(SearchField::Longitude);
        self
    }

    pub fn set_coordinates(&mut self, coordinates: Coordinates) -> &mut Self {
        self.set_latitude(coordinates.latitude)
            .set_longitude(coordinates.longitude)
    }

    /// Search radius in meters; the API caps this at 40 000.
    pub fn set_radius(&mut self, radius: u32) -> &mut Self {
        self.radius = Some(radius);
        self.touched.mark(SearchField::Radius);
        self
    }

    /// Comma-delimited category aliases, e.g. `"bars,french"`.
    pub fn set_categories(&mut self, categories: impl Into<String>) -> &mut Self {
        self.categories = Some(categories.into());
        self.touched.mark(SearchField::Categories);
        self
    }

    pub fn set_locale(&mut self, locale: impl Into<String>) -> &mut Self {
        self.locale = Some(locale.into());
        self.touched.mark(SearchField::Locale);
        self
    }

    /// Price tiers, e.g. `"1,2"` or `"$"`.
    pub fn set_price(&mut self, price: impl Into<String>) -> &mut Self {
        self.price = Some(price.into());
        self.touched.mark(SearchField::Price);
        self
    }

    /// One of `best_match`, `rating`, `review_count`, `distance`.
    pub fn set_sort_by(&mut self, sort_by: impl Into<String>) -> &mut Self {
        self.sort_by = Some(sort_by.into());
        self.touched.mark(SearchField::SortBy);
        self
    }

    pub fn set_max_results(&mut self, max_results: u32) -> &mut Self {
        self.max_results = max_results;
        self.touched.mark(SearchField::MaxResults);
        self
    }

    pub fn set_results_offset(&mut self, offset: u32) -> &mut Self {
        self.results_offset = offset;
        self.touched.mark(SearchField::ResultsOffset);
        self
    }

    /// Unix time in the search location's timezone. Not combinable with
    /// `open_now` on the API side.
    pub fn set_open_at(&mut self, open_at: i64) -> &mut Self {
        self.open_at = Some(open_at);
        self.touched.mark(SearchField::OpenAt);
        self
    }

    pub fn set_open_now(&mut self, open_now: bool) -> &mut Self {
        self.open_now = open_now;
        self.touched.mark(SearchField::OpenNow);
        self
    }

    /// Comma-delimited attribute filters, e.g. `"hot_and_new,deals"`.
    pub fn set_attributes(&mut self, attributes: impl Into<String>) -> &mut Self {
        self.attributes = Some(attributes.into());
        self.touched.mark(SearchField::Attributes);
        self
    }

    /// Forgets which fields were set; values are kept.
    pub fn clear_changes(&mut self) {
        self.touched.clear();
    }

    // --- getters: never mark anything --------------------------------------

    #[must_use]
    pub fn term(&self) -> Option<&str> {
        self.term.as_deref()
    }

    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    #[must_use]
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    #[must_use]
    pub fn sort_by(&self) -> Option<&str> {
        self.sort_by.as_deref()
    }

    #[must_use]
    pub fn max_results(&self) -> u32 {
        self.max_results
    }

    #[must_use]
    pub fn price(&self) -> Option<&str> {
        self.price.as_deref()
    }

    /// Origin used for distance annotation, if both coordinates are set.
    #[must_use]
    pub fn origin(&self) -> Option<Coordinates> {
        let coords = self.coordinates();
        coords.is_set().then_some(coords)
    }

    /// Checks the request can be sent: coordinates in range when present,
    /// and either a location or a full coordinate pair.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.latitude.is_nan() {
            validate_latitude(self.latitude)?;
        }
        if !self.longitude.is_nan() {
            validate_longitude(self.longitude)?;
        }
        let has_location = self.location.as_deref().is_some_and(|l| !l.trim().is_empty());
        if !has_location && self.origin().is_none() {
            return Err(ValidationError::MissingSearchAnchor);
        }
        Ok(())
    }
}

impl ChangeTracked for SearchRequest {
    type Field = SearchField;

    fn touched(&self) -> &Touched<SearchField> {
        &self.touched
    }

    fn current_value(&self, field: SearchField) -> Option<QueryValue> {
        match field {
            SearchField::Term => self.term.clone().map(QueryValue::from),
            SearchField::Location => self.location.clone().map(QueryValue::from),
            SearchField::Latitude => Some(QueryValue::Float(self.latitude)),
            SearchField::Longitude => Some(QueryValue::Float(self.longitude)),
            SearchField::Radius => self.radius.map(QueryValue::from),
            SearchField::Categories => self.categories.clone().map(QueryValue::from),
            SearchField::Locale => self.locale.clone().map(QueryValue::from),
            SearchField::Price => self.price.clone().map(QueryValue::from),
            SearchField::SortBy => self.sort_by.clone().map(QueryValue::from),
            SearchField::MaxResults => Some(QueryValue::from(self.max_results)),
            SearchField::ResultsOffset => Some(QueryValue::from(self.results_offset)),
            SearchField::OpenAt => self.open_at.map(QueryValue::from),
            SearchField::OpenNow => Some(QueryValue::Bool(self.open_now)),
            SearchField::Attributes => self.attributes.clone().map(QueryValue::from),
        }
    }
}

/// # Errors
///
/// [`ValidationError::LatitudeOutOfRange`] outside `[-90, 90]` or for NaN.
pub fn validate_latitude(latitude: f64) -> Result<(), ValidationError> {
    if (-90.0..=90.0).contains(&latitude) {
        Ok(())
    } else {
        Err(ValidationError::LatitudeOutOfRange(latitude))
    }
}

/// # Errors
///
/// [`ValidationError::LongitudeOutOfRange`] outside `[-180, 180]` or for NaN.
pub fn validate_longitude(longitude: f64) -> Result<(), ValidationError> {
    if (-180.0..=180.0).contains(&longitude) {
        Ok(())
    } else {
        Err(ValidationError::LongitudeOutOfRange(longitude))
    }
}

/// Validates an explicit coordinate pair.
///
/// # Errors
///
/// Returns the first out-of-range component.
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), ValidationError> {
    validate_latitude(latitude)?;
    validate_longitude(longitude)
}
