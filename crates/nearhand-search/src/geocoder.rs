//! [`Geocoder`] over a Nominatim-compatible HTTP service.

use std::time::Duration;

use async_trait::async_trait;
use nearhand_core::{AppConfig, Coordinate};
use reqwest::{Client, Url};

use crate::error::ApiError;
use crate::geo::{GeocodeHit, Geocoder};
use crate::retry::retry_with_backoff;
use crate::types::{GeocodePlace, ReversePlace};

/// Forward and reverse geocoding against a Nominatim `jsonv2` endpoint.
pub struct NominatimGeocoder {
    client: Client,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl NominatimGeocoder {
    /// Builds a geocoder from configuration, or `None` when geocoding is
    /// disabled there.
    ///
    /// # Errors
    ///
    /// Same as [`NominatimGeocoder::with_base_url`].
    pub fn from_config(config: &AppConfig) -> Result<Option<Self>, ApiError> {
        config
            .geocoder_base_url
            .as_deref()
            .map(|url| {
                Self::with_base_url(url, config.http_timeout_secs, &config.user_agent).map(|g| {
                    g.with_retries(config.max_retries, config.retry_backoff_base_ms)
                })
            })
            .transpose()
    }

    /// # Errors
    ///
    /// Returns [`ApiError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`ApiError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        base_url: &str,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, ApiError> {
        // Nominatim rejects requests without an identifying User-Agent.
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| ApiError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            max_retries: 0,
            backoff_base_ms: 0,
        })
    }

    /// Retries transient failures (see [`crate::retry`]); off by default.
    #[must_use]
    pub fn with_retries(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, ApiError> {
        let mut url = self.base_url.join(path).map_err(|e| ApiError::InvalidBaseUrl {
            url: self.base_url.to_string(),
            reason: e.to_string(),
        })?;
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let body = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.get_text(&url)
        })
        .await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Deserialize {
            context: url.path().to_owned(),
            source: e,
        })
    }

    async fn get_text(&self, url: &Url) -> Result<String, ApiError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.text().await?)
    }
}

fn place_to_hit(place: GeocodePlace) -> Option<GeocodeHit> {
    let lat = place.lat.trim().parse::<f64>().ok()?;
    let lon = place.lon.trim().parse::<f64>().ok()?;
    let coordinate = Coordinate::new(lat, lon).ok()?;
    let display_label = place
        .display_name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| coordinate.near_label());
    Some(GeocodeHit {
        coordinate,
        display_label,
    })
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn forward(&self, query: &str) -> Result<Option<GeocodeHit>, ApiError> {
        let url = self.endpoint(
            "search",
            &[("q", query), ("format", "jsonv2"), ("limit", "1")],
        )?;
        let places: Vec<GeocodePlace> = self.get_json(url).await?;
        // First-ranked usable candidate; garbage coordinates are skipped.
        Ok(places.into_iter().find_map(place_to_hit))
    }

    async fn reverse(&self, coordinate: Coordinate) -> Result<Option<String>, ApiError> {
        let lat = coordinate.latitude().to_string();
        let lon = coordinate.longitude().to_string();
        let url = self.endpoint(
            "reverse",
            &[("lat", &lat), ("lon", &lon), ("format", "jsonv2")],
        )?;
        let place: ReversePlace = self.get_json(url).await?;
        if let Some(err) = place.error {
            tracing::debug!(error = %err, "reverse geocoder returned no place");
            return Ok(None);
        }
        Ok(place.display_name.filter(|n| !n.trim().is_empty()))
    }
}
