//! Typed endpoint methods for `FusionClient`.

use tokio_util::sync::CancellationToken;

use crate::distance::annotate_distances;
use crate::error::{FusionError, ValidationError};
use crate::query::{escape_component, QueryParams, QueryValue};
use crate::request::{validate_coordinates, SearchRequest};
use crate::tracked::ChangeTracked;
use crate::types::{AutocompleteResponse, Business, Coordinates, ReviewsResponse, SearchResponse};

use super::FusionClient;

impl FusionClient {
    /// Searches businesses using every parameter set on `request`.
    ///
    /// Only the fields assigned on `request` are sent. When the request has
    /// coordinates, each returned business gets `distance_away` from them.
    ///
    /// # Errors
    ///
    /// - [`FusionError::Validation`] before any network call if the request
    ///   has no location anchor or out-of-range coordinates.
    /// - Any transport, status, or decode error from the call itself.
    pub async fn search(
        &self,
        request: &SearchRequest,
        cancel: &CancellationToken,
    ) -> Result<SearchResponse, FusionError> {
        request.validate()?;

        let params = request.changed_fields();
        let mut response: SearchResponse = self
            .get_json("/businesses/search", &params, cancel)
            .await?;

        annotate_distances(
            &mut response.businesses,
            request.origin(),
            self.distance_unit(),
        );
        tracing::debug!(
            returned = response.businesses.len(),
            total = response.total,
            "business search complete"
        );
        Ok(response)
    }

    /// Searches businesses matching `term` around a point.
    ///
    /// An empty `term` searches everything near the point.
    ///
    /// # Errors
    ///
    /// [`FusionError::Validation`] for out-of-range coordinates, otherwise
    /// see [`FusionClient::search`].
    pub async fn search_by_text(
        &self,
        term: &str,
        latitude: f64,
        longitude: f64,
        cancel: &CancellationToken,
    ) -> Result<SearchResponse, FusionError> {
        validate_coordinates(latitude, longitude)?;

        let mut request = SearchRequest::new();
        if !term.is_empty() {
            request.set_term(term);
        }
        request.set_latitude(latitude).set_longitude(longitude);
        self.search(&request, cancel).await
    }

    /// Searches businesses that offer delivery to a point.
    ///
    /// # Errors
    ///
    /// [`FusionError::Validation`] for out-of-range coordinates, otherwise
    /// any transport, status, or decode error.
    pub async fn search_with_delivery(
        &self,
        term: &str,
        latitude: f64,
        longitude: f64,
        cancel: &CancellationToken,
    ) -> Result<SearchResponse, FusionError> {
        validate_coordinates(latitude, longitude)?;

        let mut params = QueryParams::new();
        if !term.is_empty() {
            params.insert("term".to_owned(), QueryValue::from(term));
        }
        params.insert("latitude".to_owned(), QueryValue::Float(latitude));
        params.insert("longitude".to_owned(), QueryValue::Float(longitude));

        let mut response: SearchResponse = self
            .get_json("/transactions/delivery/search", &params, cancel)
            .await?;
        annotate_distances(
            &mut response.businesses,
            Some(Coordinates::new(latitude, longitude)),
            self.distance_unit(),
        );
        Ok(response)
    }

    /// Suggests businesses, categories, and terms for partially typed text.
    ///
    /// # Errors
    ///
    /// [`FusionError::Validation`] for out-of-range coordinates, otherwise
    /// any transport, status, or decode error.
    pub async fn autocomplete(
        &self,
        text: &str,
        latitude: f64,
        longitude: f64,
        locale: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<AutocompleteResponse, FusionError> {
        validate_coordinates(latitude, longitude)?;

        let mut params = QueryParams::new();
        params.insert("text".to_owned(), QueryValue::from(text));
        params.insert("latitude".to_owned(), QueryValue::Float(latitude));
        params.insert("longitude".to_owned(), QueryValue::Float(longitude));
        if let Some(locale) = locale.filter(|l| !l.is_empty()) {
            params.insert("locale".to_owned(), QueryValue::from(locale));
        }

        let mut response: AutocompleteResponse =
            self.get_json("/autocomplete", &params, cancel).await?;
        annotate_distances(
            &mut response.businesses,
            Some(Coordinates::new(latitude, longitude)),
            self.distance_unit(),
        );
        Ok(response)
    }

    /// Fetches full details for one business.
    ///
    /// A missing business comes back as `Ok` with `error` set, mirroring
    /// the API's `BUSINESS_NOT_FOUND` envelope.
    ///
    /// # Errors
    ///
    /// [`FusionError::Validation`] for an empty id, otherwise any transport,
    /// status, or decode error.
    pub async fn get_business(
        &self,
        business_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Business, FusionError> {
        if business_id.trim().is_empty() {
            return Err(ValidationError::EmptyBusinessId.into());
        }
        let path = format!("/businesses/{}", escape_component(business_id));
        self.get_json(&path, &QueryParams::new(), cancel).await
    }

    /// Fetches user reviews for one business.
    ///
    /// # Errors
    ///
    /// [`FusionError::Validation`] for an empty id, otherwise any transport,
    /// status, or decode error.
    pub async fn get_reviews(
        &self,
        business_id: &str,
        locale: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<ReviewsResponse, FusionError> {
        if business_id.trim().is_empty() {
            return Err(ValidationError::EmptyBusinessId.into());
        }
        let mut params = QueryParams::new();
        if let Some(locale) = locale.filter(|l| !l.is_empty()) {
            params.insert("locale".to_owned(), QueryValue::from(locale));
        }
        let path = format!("/businesses/{}/reviews", escape_component(business_id));
        self.get_json(&path, &params, cancel).await
    }
}
