//! Wire shapes for the backend API and the geocoding service.
//!
//! ## Provider shapes observed from the backend
//!
//! The general listing has returned two incompatible shapes over time:
//!
//! - **Nested rows**: one row per (provider, service) with the account under
//!   `user` and a single `service` object. A provider offering three services
//!   appears three times with the same `id`.
//! - **Flat records**: account fields at the top level and a `services` array.
//!
//! Coordinates appear as `latitude`/`longitude` (sometimes `lat`/`lng`) and
//! may be missing, `null`, or out of range. `id` has been both a number and a
//! numeric string. None of this leaks past [`crate::normalize`].

use nearhand_core::Coordinate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ApiError;

pub const DEFAULT_SEARCH_RADIUS: f64 = 10.0;
pub const DEFAULT_SEARCH_LIMIT: u32 = 20;

/// Query for the server-side nearby/advanced search endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbySearchRequest {
    pub category: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius: f64,
    pub limit: u32,
    pub offset: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pricing_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_rating: Option<f64>,
}

impl NearbySearchRequest {
    /// Request with the endpoint's default radius, limit and offset.
    #[must_use]
    pub fn new(category: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            category: category.into(),
            latitude,
            longitude,
            radius: DEFAULT_SEARCH_RADIUS,
            limit: DEFAULT_SEARCH_LIMIT,
            offset: 0,
            level: None,
            subject: None,
            price_min: None,
            price_max: None,
            pricing_type: None,
            min_rating: None,
        }
    }

    #[must_use]
    pub fn at(category: impl Into<String>, center: Coordinate) -> Self {
        Self::new(category, center.latitude(), center.longitude())
    }

    /// Local precondition check run before any request is sent.
    ///
    /// # Errors
    ///
    /// - [`ApiError::MissingCategory`] if `category` is blank.
    /// - [`ApiError::InvalidCoordinate`] if latitude or longitude is out of range.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.category.trim().is_empty() {
            return Err(ApiError::MissingCategory);
        }
        Coordinate::new(self.latitude, self.longitude)?;
        Ok(())
    }

    /// Query-string pairs in the endpoint's parameter names.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("category", self.category.clone()),
            ("latitude", self.latitude.to_string()),
            ("longitude", self.longitude.to_string()),
            ("radius", self.radius.to_string()),
            ("limit", self.limit.to_string()),
            ("offset", self.offset.to_string()),
        ];
        let optional = [
            ("level", self.level.clone()),
            ("subject", self.subject.clone()),
            ("priceMin", self.price_min.map(|v| v.to_string())),
            ("priceMax", self.price_max.map(|v| v.to_string())),
            ("pricingType", self.pricing_type.clone()),
            ("minRating", self.min_rating.map(|v| v.to_string())),
        ];
        pairs.extend(
            optional
                .into_iter()
                .filter_map(|(k, v)| v.map(|v| (k, v))),
        );
        pairs
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbySearchResponse {
    #[serde(default)]
    pub providers: Vec<WireProvider>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub search_radius: Option<f64>,
    #[serde(default)]
    pub metadata: Option<SearchMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMetadata {
    #[serde(default)]
    pub center_latitude: Option<f64>,
    #[serde(default)]
    pub center_longitude: Option<f64>,
    /// Reported as a number of milliseconds or a string like `"12ms"`.
    #[serde(default)]
    pub execution_time: serde_json::Value,
    #[serde(default)]
    pub has_more: bool,
}

/// The general listing: a bare array, or a page envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListingResponse {
    Bare(Vec<WireProvider>),
    Page(ListingPage),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPage {
    pub providers: Vec<WireProvider>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub total: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireProvider {
    Nested(NestedProviderRow),
    Flat(FlatProvider),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NestedProviderRow {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: i64,
    pub user: WireAccount,
    #[serde(default)]
    pub service: Option<WireService>,
    #[serde(default)]
    pub services: Vec<WireService>,
    #[serde(default)]
    pub distance: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatProvider {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: i64,
    #[serde(flatten)]
    pub account: WireAccount,
    #[serde(default)]
    pub service: Option<WireService>,
    #[serde(default)]
    pub services: Vec<WireService>,
    #[serde(default)]
    pub distance: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireAccount {
    #[serde(alias = "name")]
    pub username: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, alias = "lat")]
    pub latitude: Option<f64>,
    #[serde(default, alias = "lng", alias = "lon")]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub review_count: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireService {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub pricing_type: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Number(n) => Ok(n),
        RawId::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| serde::de::Error::custom(format!("non-numeric provider id '{s}'"))),
    }
}

/// One candidate from a Nominatim-style `/search` response. Coordinates come
/// back as decimal strings.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodePlace {
    pub lat: String,
    pub lon: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Nominatim-style `/reverse` response. Unresolvable points come back as
/// `{"error": "..."}` with status 200.
#[derive(Debug, Clone, Deserialize)]
pub struct ReversePlace {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}
