//! HTTP client for the provider backend.
//!
//! Two endpoints: `GET providers/search/advanced` (server-side nearby search)
//! and `GET providers` (general listing, optionally paged). Transient failures
//! are retried via [`crate::retry`]; request preconditions are checked before
//! anything is sent.

use std::time::Duration;

use async_trait::async_trait;
use nearhand_core::{AppConfig, ProviderRecord};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

use crate::directory::{NearbyPage, ProviderDirectory};
use crate::error::ApiError;
use crate::normalize::{group_listing_rows, metadata_center, normalize_provider};
use crate::retry::retry_with_backoff;
use crate::types::{ListingResponse, NearbySearchRequest, NearbySearchResponse, WireProvider};

/// Safety cap on listing pages. A backend that keeps answering `hasMore`
/// would otherwise page forever.
const MAX_PAGES: usize = 100;
const LISTING_PAGE_SIZE: u32 = 100;

/// HTTP client for the provider backend: nearby search and the paged
/// general listing.
pub struct ApiClient {
    client: Client,
    base_url: Url,
    api_token: Option<String>,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl ApiClient {
    /// Builds a client from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`ApiError::InvalidBaseUrl`] if the configured base URL is invalid.
    pub fn from_config(config: &AppConfig) -> Result<Self, ApiError> {
        Self::with_base_url(
            &config.api_base_url,
            config.api_token.as_deref(),
            config.http_timeout_secs,
            &config.user_agent,
            config.max_retries,
            config.retry_backoff_base_ms,
        )
    }

    /// Creates a client with an explicit base URL (wiremock in tests).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`ApiError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        base_url: &str,
        api_token: Option<&str>,
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        // Exactly one trailing slash, so `join("providers")` appends a segment
        // instead of replacing the last one.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| ApiError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            api_token: api_token.map(str::to_owned).filter(|t| !t.is_empty()),
            max_retries,
            backoff_base_ms,
        })
    }

    /// Server-side nearby search.
    ///
    /// # Errors
    ///
    /// - [`ApiError::MissingCategory`] / [`ApiError::InvalidCoordinate`] when
    ///   the request fails local validation. No request is sent.
    /// - [`ApiError::UnexpectedStatus`] on a non-2xx response after retries.
    /// - [`ApiError::Http`] on network failure after retries.
    /// - [`ApiError::Deserialize`] if the body does not match the expected shape.
    pub async fn search_nearby(
        &self,
        request: &NearbySearchRequest,
    ) -> Result<NearbyPage, ApiError> {
        request.validate()?;

        let pairs = request.query_pairs();
        let url = self.build_url("providers/search/advanced", &pairs)?;
        tracing::debug!(
            category = %request.category,
            latitude = request.latitude,
            longitude = request.longitude,
            radius = request.radius,
            "nearby search"
        );

        let response: NearbySearchResponse = self.get_json(&url).await?;
        let has_more = response.metadata.as_ref().is_some_and(|m| m.has_more);
        let center = response.metadata.as_ref().and_then(metadata_center);
        let providers: Vec<ProviderRecord> = response
            .providers
            .into_iter()
            .map(normalize_provider)
            .collect();

        tracing::debug!(count = providers.len(), total = response.total, "nearby search returned");

        Ok(NearbyPage {
            providers,
            total: response.total,
            limit: response.limit,
            offset: response.offset,
            search_radius: response.search_radius,
            has_more,
            center,
        })
    }

    /// Fetches the full provider listing, following `hasMore` pages, and
    /// groups per-service rows into one record per provider.
    ///
    /// # Errors
    ///
    /// - [`ApiError::PaginationLimit`] if the backend keeps paging past
    ///   [`MAX_PAGES`].
    /// - [`ApiError::UnexpectedStatus`] / [`ApiError::Http`] /
    ///   [`ApiError::Deserialize`] as for [`ApiClient::search_nearby`].
    pub async fn fetch_all_providers(&self) -> Result<Vec<ProviderRecord>, ApiError> {
        let mut rows: Vec<WireProvider> = Vec::new();
        let mut offset = 0u32;
        let mut page_count = 0usize;

        loop {
            page_count += 1;
            if page_count > MAX_PAGES {
                return Err(ApiError::PaginationLimit {
                    url: self.base_url.join("providers").map_or_else(
                        |_| self.base_url.to_string(),
                        |u| u.to_string(),
                    ),
                    max_pages: MAX_PAGES,
                });
            }

            let url = self.build_url(
                "providers",
                &[
                    ("limit", LISTING_PAGE_SIZE.to_string()),
                    ("offset", offset.to_string()),
                ],
            )?;

            match self.get_json::<ListingResponse>(&url).await? {
                ListingResponse::Bare(page) => {
                    rows.extend(page);
                    break;
                }
                ListingResponse::Page(page) => {
                    let fetched = page.providers.len();
                    rows.extend(page.providers);
                    if !page.has_more || fetched == 0 {
                        break;
                    }
                    offset = offset.saturating_add(u32::try_from(fetched).unwrap_or(u32::MAX));
                }
            }
        }

        let providers = group_listing_rows(rows);
        tracing::debug!(count = providers.len(), pages = page_count, "provider listing fetched");
        Ok(providers)
    }

    fn build_url(&self, path: &str, params: &[(&str, String)]) -> Result<Url, ApiError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| ApiError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    /// GET with retries; non-2xx becomes [`ApiError::UnexpectedStatus`].
    async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, ApiError> {
        let body = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.get_text(url)
        })
        .await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Deserialize {
            context: url.path().to_owned(),
            source: e,
        })
    }

    async fn get_text(&self, url: &Url) -> Result<String, ApiError> {
        let mut request = self.client.get(url.clone());
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
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

#[async_trait]
impl ProviderDirectory for ApiClient {
    async fn nearby_search(&self, request: &NearbySearchRequest) -> Result<NearbyPage, ApiError> {
        self.search_nearby(request).await
    }

    async fn list_providers(&self) -> Result<Vec<ProviderRecord>, ApiError> {
        self.fetch_all_providers().await
    }
}
