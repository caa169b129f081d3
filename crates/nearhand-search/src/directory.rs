//! The backend seam: where providers come from.
//!
//! [`crate::client::ApiClient`] is the HTTP implementation. Tests and
//! embedders can supply their own.

use async_trait::async_trait;
use nearhand_core::{Coordinate, ProviderRecord};

use crate::error::ApiError;
use crate::types::NearbySearchRequest;

/// One page of server-side nearby search results, normalized.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NearbyPage {
    pub providers: Vec<ProviderRecord>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
    pub search_radius: Option<f64>,
    pub has_more: bool,
    /// Center the server actually searched around, when echoed back.
    pub center: Option<Coordinate>,
}

#[async_trait]
pub trait ProviderDirectory: Send + Sync {
    /// Server-side search by category and distance from a center point.
    ///
    /// Implementations must reject an invalid request locally, before any
    /// network traffic, with [`ApiError::MissingCategory`] or
    /// [`ApiError::InvalidCoordinate`].
    async fn nearby_search(&self, request: &NearbySearchRequest) -> Result<NearbyPage, ApiError>;

    /// The full provider listing, grouped to one record per provider.
    async fn list_providers(&self) -> Result<Vec<ProviderRecord>, ApiError>;
}
