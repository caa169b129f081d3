pub mod cache;
pub mod client;
pub mod directory;
pub mod error;
pub mod geo;
pub mod geocoder;
pub mod normalize;
pub mod orchestrator;
pub mod pipeline;
pub mod proximity;
pub(crate) mod retry;
pub mod types;

pub use cache::{CacheSnapshot, ProviderCache};
pub use client::ApiClient;
pub use directory::{NearbyPage, ProviderDirectory};
pub use error::{ApiError, GeolocationError, SearchError};
pub use geo::{FixedPosition, GeoResolver, GeocodeHit, Geocoder, PositionSource, ResolvedPosition};
pub use geocoder::NominatimGeocoder;
pub use orchestrator::{
    SearchOptions, SearchOrchestrator, SearchOutcome, SearchPath, SearchPhase, SearchResult,
    SearchWarning,
};
pub use pipeline::{sort_by_rating, FilterPipeline};
pub use proximity::{is_near, ProximityMatcher, DEFAULT_THRESHOLD_DEGREES};
pub use types::NearbySearchRequest;
