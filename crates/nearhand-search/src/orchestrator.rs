//! Runs one search submission end to end and owns the visible result.
//!
//! ```text
//! Idle -> Resolving -> Dispatched(Server | ClientFilter) -> Settled | Failed
//! ```
//!
//! Each submission takes a generation number when it starts. Searches may
//! overlap; when one finishes it only touches visible state if no newer
//! submission has started since. Superseded requests are not cancelled, their
//! outcome is simply dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use nearhand_core::{
    AppConfig, CategoryKind, Coordinate, LocationQuery, ProviderRecord, SearchCriteria,
};
use serde::Serialize;

use crate::cache::{CacheSnapshot, ProviderCache};
use crate::directory::ProviderDirectory;
use crate::error::SearchError;
use crate::geo::GeoResolver;
use crate::pipeline::FilterPipeline;
use crate::types::{NearbySearchRequest, DEFAULT_SEARCH_LIMIT, DEFAULT_SEARCH_RADIUS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchPath {
    /// Backend nearby search; the server filters by distance.
    Server,
    /// Cached listing run through [`FilterPipeline`].
    ClientFilter,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchWarning {
    /// The listing could not be refreshed; results come from the previous snapshot.
    StaleCache { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub providers: Vec<ProviderRecord>,
    pub path: SearchPath,
    /// Server-reported total on the server path, unless a name filter
    /// narrowed the page; otherwise `providers.len()`.
    pub total: u64,
    pub has_more: bool,
    pub search_radius: Option<f64>,
    pub generation: u64,
    /// The location actually searched, after geocoding.
    pub location: LocationQuery,
    pub warning: Option<SearchWarning>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchPhase {
    Idle,
    Resolving,
    Dispatched(SearchPath),
    Settled(SearchResult),
    Failed(SearchError),
}

/// What happened to one submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Applied(SearchResult),
    /// A newer search started before this one finished; nothing was applied.
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    pub radius: f64,
    pub limit: u32,
    pub offset: u32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            radius: DEFAULT_SEARCH_RADIUS,
            limit: DEFAULT_SEARCH_LIMIT,
            offset: 0,
        }
    }
}

impl SearchOptions {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            radius: config.search_radius,
            limit: config.search_limit,
            offset: 0,
        }
    }
}

#[derive(Debug)]
struct VisibleState {
    phase: SearchPhase,
    result: Option<SearchResult>,
}

/// Runs searches against the backend or the provider cache and owns the
/// visible result.
pub struct SearchOrchestrator {
    resolver: GeoResolver,
    directory: Arc<dyn ProviderDirectory>,
    cache: Arc<ProviderCache>,
    pipeline: FilterPipeline,
    options: SearchOptions,
    latest_generation: AtomicU64,
    state: Mutex<VisibleState>,
}

impl std::fmt::Debug for SearchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchOrchestrator")
            .field("resolver", &self.resolver)
            .field("cache", &self.cache)
            .field("pipeline", &self.pipeline)
            .field("options", &self.options)
            .field(
                "latest_generation",
                &self.latest_generation.load(Ordering::SeqCst),
            )
            .finish_non_exhaustive()
    }
}

impl SearchOrchestrator {
    #[must_use]
    pub fn new(
        resolver: GeoResolver,
        directory: Arc<dyn ProviderDirectory>,
        cache: Arc<ProviderCache>,
        pipeline: FilterPipeline,
    ) -> Self {
        Self {
            resolver,
            directory,
            cache,
            pipeline,
            options: SearchOptions::default(),
            latest_generation: AtomicU64::new(0),
            state: Mutex::new(VisibleState {
                phase: SearchPhase::Idle,
                result: None,
            }),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: SearchOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn resolver(&self) -> &GeoResolver {
        &self.resolver
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<ProviderCache> {
        &self.cache
    }

    /// Phase of the most recently submitted search.
    #[must_use]
    pub fn phase(&self) -> SearchPhase {
        self.lock_state().phase.clone()
    }

    /// The last applied result. A later failure does not clear it.
    #[must_use]
    pub fn visible_result(&self) -> Option<SearchResult> {
        self.lock_state().result.clone()
    }

    #[must_use]
    pub fn latest_generation(&self) -> u64 {
        self.latest_generation.load(Ordering::SeqCst)
    }

    /// Runs one search.
    ///
    /// Returns [`SearchOutcome::Superseded`] (and leaves visible state alone)
    /// when a newer search was submitted while this one was in flight, even
    /// if this one failed.
    ///
    /// # Errors
    ///
    /// Returns the [`SearchError`] of a failed search that is still the
    /// latest. A blank category or out-of-range coordinate on the server
    /// path fails before the directory is called. Geocoding failures are returned without any search request
    /// having been sent; server-search failures are never replaced by a
    /// client-side result.
    pub async fn submit(&self, criteria: SearchCriteria) -> Result<SearchOutcome, SearchError> {
        let generation = self.latest_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.set_phase(generation, SearchPhase::Resolving);

        let outcome = self.run(generation, criteria).await;
        self.settle(generation, outcome)
    }

    /// Degraded general listing: refreshes the cache and returns every
    /// provider in listing order, without touching search state.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::CacheRefreshError`] if the listing fetch fails.
    pub async fn browse_all(&self) -> Result<Vec<ProviderRecord>, SearchError> {
        Ok(self.cache.refresh().await?.providers.clone())
    }

    async fn run(
        &self,
        generation: u64,
        criteria: SearchCriteria,
    ) -> Result<SearchResult, SearchError> {
        let criteria = self.resolve_location(criteria).await?;

        match (criteria.location.coordinate(), criteria.category.as_deref()) {
            (Some(center), Some(category)) => {
                let request = self.build_request(center, category, &criteria);
                request.validate().map_err(|e| SearchError::server_search(&e))?;
                self.set_phase(generation, SearchPhase::Dispatched(SearchPath::Server));
                self.server_search(generation, &request, &criteria).await
            }
            _ => {
                self.set_phase(generation, SearchPhase::Dispatched(SearchPath::ClientFilter));
                self.client_search(generation, &criteria).await
            }
        }
    }

    /// Forward-geocodes a free-text location when a geocoder is available.
    /// Without one, the label stays text and is substring-matched later.
    async fn resolve_location(
        &self,
        criteria: SearchCriteria,
    ) -> Result<SearchCriteria, SearchError> {
        let LocationQuery::TextLabel(label) = &criteria.location else {
            return Ok(criteria);
        };
        if !self.resolver.can_forward_geocode() {
            return Ok(criteria);
        }
        let hit = self.resolver.forward_geocode(label).await?;
        Ok(criteria.with_location(LocationQuery::Coordinate(hit.coordinate)))
    }

    async fn server_search(
        &self,
        generation: u64,
        request: &NearbySearchRequest,
        criteria: &SearchCriteria,
    ) -> Result<SearchResult, SearchError> {
        tracing::info!(
            generation,
            category = %request.category,
            latitude = request.latitude,
            longitude = request.longitude,
            "dispatching server search"
        );

        let page = self
            .directory
            .nearby_search(request)
            .await
            .map_err(|e| {
                tracing::warn!(generation, error = %e, "server search failed");
                SearchError::server_search(&e)
            })?;

        let providers = self
            .pipeline
            .refine_server_results(page.providers, criteria);
        // The server counted before the name filter ran.
        let total = if criteria.name_filter.is_some() {
            providers.len() as u64
        } else {
            page.total
        };
        Ok(SearchResult {
            providers,
            path: SearchPath::Server,
            total,
            has_more: page.has_more,
            search_radius: page.search_radius.or(Some(request.radius)),
            generation,
            location: criteria.location.clone(),
            warning: None,
        })
    }

    fn build_request(
        &self,
        center: Coordinate,
        category: &str,
        criteria: &SearchCriteria,
    ) -> NearbySearchRequest {
        let mut request = NearbySearchRequest::at(category, center);
        request.radius = self.options.radius;
        request.limit = self.options.limit;
        request.offset = self.options.offset;
        if criteria.category_kind() == Some(CategoryKind::Education) {
            request.level.clone_from(&criteria.level);
            request.subject.clone_from(&criteria.subject);
        }
        let advanced = &criteria.advanced;
        request.price_min = advanced.price_min;
        request.price_max = advanced.price_max;
        request.pricing_type.clone_from(&advanced.pricing_type);
        request.min_rating = advanced.min_rating;
        request
    }

    async fn client_search(
        &self,
        generation: u64,
        criteria: &SearchCriteria,
    ) -> Result<SearchResult, SearchError> {
        let mut warning = None;
        let mut refresh_attempted = false;
        let mut snapshot = self.cache.get();

        if snapshot.needs_refresh() {
            refresh_attempted = true;
            snapshot = self.refresh_or_keep(&snapshot, &mut warning).await?;
        }

        let mut providers = self.pipeline.apply(&snapshot.providers, criteria);

        if providers.is_empty() && !refresh_attempted {
            tracing::debug!(generation, "empty client result, refreshing provider cache once");
            snapshot = self.refresh_or_keep(&snapshot, &mut warning).await?;
            providers = self.pipeline.apply(&snapshot.providers, criteria);
        }

        tracing::info!(
            generation,
            count = providers.len(),
            cached = snapshot.providers.len(),
            "client filter search settled"
        );

        Ok(SearchResult {
            total: providers.len() as u64,
            providers,
            path: SearchPath::ClientFilter,
            has_more: false,
            search_radius: None,
            generation,
            location: criteria.location.clone(),
            warning,
        })
    }

    /// Refreshes the cache. On failure, falls back to `current` with a
    /// warning when it holds data, and fails the search when it does not.
    async fn refresh_or_keep(
        &self,
        current: &Arc<CacheSnapshot>,
        warning: &mut Option<SearchWarning>,
    ) -> Result<Arc<CacheSnapshot>, SearchError> {
        match self.cache.refresh().await {
            Ok(fresh) => Ok(fresh),
            Err(e) if !current.is_empty() => {
                *warning = Some(SearchWarning::StaleCache {
                    reason: e.to_string(),
                });
                Ok(Arc::clone(current))
            }
            Err(e) => Err(e),
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, VisibleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_phase(&self, generation: u64, phase: SearchPhase) {
        let mut state = self.lock_state();
        if generation == self.latest_generation() {
            state.phase = phase;
        }
    }

    fn settle(
        &self,
        generation: u64,
        outcome: Result<SearchResult, SearchError>,
    ) -> Result<SearchOutcome, SearchError> {
        let mut state = self.lock_state();
        let latest = self.latest_generation();
        if generation != latest {
            tracing::debug!(
                generation,
                latest,
                ok = outcome.is_ok(),
                "dropping superseded search outcome"
            );
            return Ok(SearchOutcome::Superseded);
        }

        match outcome {
            Ok(result) => {
                state.phase = SearchPhase::Settled(result.clone());
                state.result = Some(result.clone());
                Ok(SearchOutcome::Applied(result))
            }
            Err(e) => {
                tracing::info!(generation, error = %e, "search failed");
                state.phase = SearchPhase::Failed(e.clone());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
