use serde::{Deserialize, Serialize};

use crate::location::Coordinate;

/// One service a provider offers.
///
/// `category` is an open set ("Tutoring", "Home Repairs", ...) and is always
/// compared case-insensitively, never as a closed enum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSummary {
    pub category: String,
    pub name: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub pricing_type: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
}

/// A searchable provider as seen by the filtering core.
///
/// Backend shape drift is absorbed before values of this type are built; see
/// the normalization layer in `nearhand-search`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRecord {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub location: Option<String>,
    /// Present only when the provider's location could be geocoded.
    #[serde(default)]
    pub coordinate: Option<Coordinate>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub review_count: Option<u32>,
    /// Primary (first listed) service.
    #[serde(default)]
    pub service: Option<ServiceSummary>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_services: Vec<ServiceSummary>,
    /// Distance from the search center, when the server computed one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

impl ProviderRecord {
    /// All services, primary first.
    pub fn services(&self) -> impl Iterator<Item = &ServiceSummary> {
        self.service.iter().chain(self.additional_services.iter())
    }

    /// Rating used for ordering: an unrated provider sorts as `0`.
    #[must_use]
    pub fn sort_rating(&self) -> f64 {
        self.rating.unwrap_or(0.0)
    }
}
