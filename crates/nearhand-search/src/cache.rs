//! Client-held provider snapshot for the client-filter search path.
//!
//! Readers get an `Arc` to an immutable [`CacheSnapshot`]; `refresh` builds a
//! whole new snapshot and swaps the pointer. Nothing ever mutates a snapshot
//! in place, so a reader never sees a partially refreshed list.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use nearhand_core::ProviderRecord;

use crate::directory::ProviderDirectory;
use crate::error::SearchError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheSnapshot {
    pub providers: Vec<ProviderRecord>,
    /// `None` until the first successful refresh.
    pub refreshed_at: Option<DateTime<Utc>>,
    pub stale: bool,
}

impl CacheSnapshot {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// `true` when a search should refresh before reading.
    #[must_use]
    pub fn needs_refresh(&self) -> bool {
        self.stale || self.providers.is_empty()
    }
}

/// Snapshot of the general provider listing, refreshed from a
/// [`ProviderDirectory`].
pub struct ProviderCache {
    directory: Arc<dyn ProviderDirectory>,
    snapshot: RwLock<Arc<CacheSnapshot>>,
}

impl std::fmt::Debug for ProviderCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.get();
        f.debug_struct("ProviderCache")
            .field("providers", &snapshot.providers.len())
            .field("refreshed_at", &snapshot.refreshed_at)
            .field("stale", &snapshot.stale)
            .finish_non_exhaustive()
    }
}

impl ProviderCache {
    #[must_use]
    pub fn new(directory: Arc<dyn ProviderDirectory>) -> Self {
        Self {
            directory,
            snapshot: RwLock::new(Arc::new(CacheSnapshot::default())),
        }
    }

    /// The current snapshot. Never blocks on a refresh in progress.
    #[must_use]
    pub fn get(&self) -> Arc<CacheSnapshot> {
        Arc::clone(&self.snapshot.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Fetches the full listing and replaces the snapshot wholesale.
    ///
    /// On failure the previous snapshot stays in place (still readable via
    /// [`ProviderCache::get`]) and the error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::CacheRefreshError`] if the listing fetch fails.
    pub async fn refresh(&self) -> Result<Arc<CacheSnapshot>, SearchError> {
        match self.directory.list_providers().await {
            Ok(providers) => {
                let next = Arc::new(CacheSnapshot {
                    providers,
                    refreshed_at: Some(Utc::now()),
                    stale: false,
                });
                self.swap(Arc::clone(&next));
                tracing::info!(count = next.providers.len(), "provider cache refreshed");
                Ok(next)
            }
            Err(e) => {
                let kept = self.get().providers.len();
                tracing::warn!(error = %e, kept, "provider cache refresh failed, keeping previous snapshot");
                Err(SearchError::cache_refresh(&e))
            }
        }
    }

    /// Flags the current snapshot so the next client-filter search refreshes first.
    pub fn mark_stale(&self) {
        let current = self.get();
        if current.stale {
            return;
        }
        self.swap(Arc::new(CacheSnapshot {
            stale: true,
            ..(*current).clone()
        }));
    }

    fn swap(&self, next: Arc<CacheSnapshot>) {
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = next;
    }
}
