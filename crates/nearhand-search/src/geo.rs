//! Turning what the user typed (or where the device is) into a location.
//!
//! The device position and the geocoding service are external capabilities
//! behind [`PositionSource`] and [`Geocoder`]. Either may be absent: a
//! resolver with no position source reports [`SearchError::GeolocationUnavailable`],
//! and one with no geocoder cannot forward-geocode free text.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nearhand_core::{Coordinate, LocationQuery};

use crate::error::{ApiError, GeolocationError, SearchError};

/// Default bound on waiting for the device position.
pub const DEFAULT_GEOLOCATION_TIMEOUT: Duration = Duration::from_secs(10);

/// The device's current-position capability.
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn current_position(&self) -> Result<Coordinate, GeolocationError>;
}

/// External forward/reverse geocoding service.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// First-ranked match for `query`, or `None` when the service has no candidates.
    async fn forward(&self, query: &str) -> Result<Option<GeocodeHit>, ApiError>;

    /// Best-effort place label for `coordinate`.
    async fn reverse(&self, coordinate: Coordinate) -> Result<Option<String>, ApiError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeHit {
    pub coordinate: Coordinate,
    pub display_label: String,
}

/// The device position plus a label suitable for the search box.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPosition {
    pub coordinate: Coordinate,
    pub label: String,
}

/// A position source that always reports the same point (e.g. from
/// `--lat/--lon` on the command line).
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub Coordinate);

#[async_trait]
impl PositionSource for FixedPosition {
    async fn current_position(&self) -> Result<Coordinate, GeolocationError> {
        Ok(self.0)
    }
}

#[derive(Clone)]
pub struct GeoResolver {
    position_source: Option<Arc<dyn PositionSource>>,
    geocoder: Option<Arc<dyn Geocoder>>,
    geolocation_timeout: Duration,
}

impl Default for GeoResolver {
    fn default() -> Self {
        Self {
            position_source: None,
            geocoder: None,
            geolocation_timeout: DEFAULT_GEOLOCATION_TIMEOUT,
        }
    }
}

impl std::fmt::Debug for GeoResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoResolver")
            .field("position_source", &self.position_source.is_some())
            .field("geocoder", &self.geocoder.is_some())
            .field("geolocation_timeout", &self.geolocation_timeout)
            .finish()
    }
}

impl GeoResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_position_source(mut self, source: Arc<dyn PositionSource>) -> Self {
        self.position_source = Some(source);
        self
    }

    #[must_use]
    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    #[must_use]
    pub fn with_geolocation_timeout(mut self, timeout: Duration) -> Self {
        self.geolocation_timeout = timeout;
        self
    }

    #[must_use]
    pub fn can_forward_geocode(&self) -> bool {
        self.geocoder.is_some()
    }

    /// Parses the raw search-box string. Pure; see [`LocationQuery::parse`].
    #[must_use]
    pub fn resolve(raw: &str) -> LocationQuery {
        LocationQuery::parse(raw)
    }

    /// Reads the device position, then tries to label it via reverse
    /// geocoding. A failed or empty label lookup falls back to
    /// [`Coordinate::near_label`]; only the position read itself can fail.
    ///
    /// # Errors
    ///
    /// - [`SearchError::GeolocationUnavailable`] when no position source is configured.
    /// - [`SearchError::PermissionDenied`] / [`SearchError::PositionUnavailable`]
    ///   as reported by the source.
    /// - [`SearchError::Timeout`] when the source does not answer in time.
    pub async fn resolve_current_position(&self) -> Result<ResolvedPosition, SearchError> {
        let Some(source) = &self.position_source else {
            return Err(SearchError::GeolocationUnavailable);
        };

        let coordinate =
            match tokio::time::timeout(self.geolocation_timeout, source.current_position()).await {
                Ok(result) => result?,
                Err(_) => {
                    tracing::warn!(
                        timeout_secs = self.geolocation_timeout.as_secs(),
                        "geolocation timed out"
                    );
                    return Err(GeolocationError::Timeout {
                        after_secs: self.geolocation_timeout.as_secs(),
                    }
                    .into());
                }
            };

        let label = match &self.geocoder {
            Some(geocoder) => match geocoder.reverse(coordinate).await {
                Ok(Some(label)) if !label.trim().is_empty() => label,
                Ok(_) => coordinate.near_label(),
                Err(e) => {
                    tracing::debug!(error = %e, "reverse geocoding failed, using coordinates as label");
                    coordinate.near_label()
                }
            },
            None => coordinate.near_label(),
        };

        Ok(ResolvedPosition { coordinate, label })
    }

    /// Resolves a place name to a coordinate.
    ///
    /// # Errors
    ///
    /// - [`SearchError::LocationNotFound`] when the service has no candidates,
    ///   or when no geocoder is configured.
    /// - [`SearchError::GeocodingServiceError`] on transport or service failure.
    pub async fn forward_geocode(&self, query: &str) -> Result<GeocodeHit, SearchError> {
        let query = query.trim();
        let not_found = || SearchError::LocationNotFound {
            query: query.to_owned(),
        };

        if query.is_empty() {
            return Err(not_found());
        }
        let Some(geocoder) = &self.geocoder else {
            return Err(not_found());
        };

        match geocoder.forward(query).await {
            Ok(Some(hit)) => {
                tracing::debug!(query, label = %hit.display_label, "location geocoded");
                Ok(hit)
            }
            Ok(None) => Err(not_found()),
            Err(e) => {
                tracing::warn!(query, error = %e, "forward geocoding failed");
                Err(SearchError::GeocodingServiceError {
                    message: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    struct FailingSource(GeolocationError);

    #[async_trait]
    impl PositionSource for FailingSource {
        async fn current_position(&self) -> Result<Coordinate, GeolocationError> {
            Err(self.0)
        }
    }

    struct HangingSource;

    #[async_trait]
    impl PositionSource for HangingSource {
        async fn current_position(&self) -> Result<Coordinate, GeolocationError> {
            std::future::pending().await
        }
    }

    enum Reply {
        Hit(f64, f64, &'static str),
        Empty,
        Fail,
    }

    struct StubGeocoder {
        forward: Reply,
        reverse: Reply,
        calls: AtomicU32,
    }

    impl StubGeocoder {
        fn new(forward: Reply, reverse: Reply) -> Arc<Self> {
            Arc::new(Self {
                forward,
                reverse,
                calls: AtomicU32::new(0),
            })
        }
    }

    fn service_down() -> ApiError {
        ApiError::UnexpectedStatus {
            status: 503,
            url: "http://geocoder/".to_owned(),
        }
    }

    #[async_trait]
    impl Geocoder for StubGeocoder {
        async fn forward(&self, _query: &str) -> Result<Option<GeocodeHit>, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.forward {
                Reply::Hit(lat, lon, label) => Ok(Some(GeocodeHit {
                    coordinate: Coordinate::new(lat, lon).unwrap(),
                    display_label: label.to_owned(),
                })),
                Reply::Empty => Ok(None),
                Reply::Fail => Err(service_down()),
            }
        }

        async fn reverse(&self, _coordinate: Coordinate) -> Result<Option<String>, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reverse {
                Reply::Hit(_, _, label) => Ok(Some(label.to_owned())),
                Reply::Empty => Ok(None),
                Reply::Fail => Err(service_down()),
            }
        }
    }

    fn springfield() -> Coordinate {
        Coordinate::new(39.7817, -89.6501).unwrap()
    }

    #[test]
    fn resolve_is_the_pure_parser() {
        assert_eq!(GeoResolver::resolve(""), LocationQuery::Unspecified);
        assert_eq!(GeoResolver::resolve("ONLINE"), LocationQuery::Online);
        assert_eq!(
            GeoResolver::resolve("Near Lat: 39.7817, Lon: -89.6501"),
            LocationQuery::Coordinate(springfield())
        );
    }

    #[tokio::test]
    async fn no_position_source_is_unavailable() {
        let err = GeoResolver::new().resolve_current_position().await.unwrap_err();
        assert_eq!(err, SearchError::GeolocationUnavailable);
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn platform_errors_map_through() {
        for (platform, expected) in [
            (GeolocationError::PermissionDenied, SearchError::PermissionDenied),
            (GeolocationError::PositionUnavailable, SearchError::PositionUnavailable),
            (GeolocationError::Unavailable, SearchError::GeolocationUnavailable),
        ] {
            let resolver = GeoResolver::new().with_position_source(Arc::new(FailingSource(platform)));
            assert_eq!(resolver.resolve_current_position().await.unwrap_err(), expected);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_position_source_times_out() {
        let resolver = GeoResolver::new()
            .with_position_source(Arc::new(HangingSource))
            .with_geolocation_timeout(Duration::from_secs(10));
        let err = resolver.resolve_current_position().await.unwrap_err();
        assert_eq!(err, SearchError::Timeout);
    }

    #[tokio::test]
    async fn reverse_label_is_used_when_available() {
        let resolver = GeoResolver::new()
            .with_position_source(Arc::new(FixedPosition(springfield())))
            .with_geocoder(StubGeocoder::new(Reply::Empty, Reply::Hit(0.0, 0.0, "Springfield, IL")));
        let resolved = resolver.resolve_current_position().await.unwrap();
        assert_eq!(resolved.coordinate, springfield());
        assert_eq!(resolved.label, "Springfield, IL");
    }

    #[tokio::test]
    async fn reverse_failure_falls_back_to_coordinate_label() {
        let resolver = GeoResolver::new()
            .with_position_source(Arc::new(FixedPosition(springfield())))
            .with_geocoder(StubGeocoder::new(Reply::Empty, Reply::Fail));
        let resolved = resolver.resolve_current_position().await.unwrap();
        assert_eq!(resolved.label, "Near Lat: 39.78, Lon: -89.65");
    }

    #[tokio::test]
    async fn no_geocoder_labels_with_coordinates() {
        let resolver =
            GeoResolver::new().with_position_source(Arc::new(FixedPosition(springfield())));
        let resolved = resolver.resolve_current_position().await.unwrap();
        assert_eq!(resolved.label, springfield().near_label());
    }

    #[tokio::test]
    async fn forward_geocode_hit() {
        let resolver = GeoResolver::new().with_geocoder(StubGeocoder::new(
            Reply::Hit(39.78, -89.65, "Springfield, Illinois"),
            Reply::Empty,
        ));
        let hit = resolver.forward_geocode("springfield").await.unwrap();
        assert_eq!(hit.display_label, "Springfield, Illinois");
    }

    #[tokio::test]
    async fn forward_geocode_not_found() {
        let resolver =
            GeoResolver::new().with_geocoder(StubGeocoder::new(Reply::Empty, Reply::Empty));
        let err = resolver.forward_geocode("Nowhereville123").await.unwrap_err();
        assert_eq!(
            err,
            SearchError::LocationNotFound {
                query: "Nowhereville123".to_owned()
            }
        );
    }

    #[tokio::test]
    async fn forward_geocode_service_failure() {
        let resolver =
            GeoResolver::new().with_geocoder(StubGeocoder::new(Reply::Fail, Reply::Empty));
        let err = resolver.forward_geocode("springfield").await.unwrap_err();
        assert!(matches!(err, SearchError::GeocodingServiceError { .. }));
        assert!(!err.is_recoverable());
    }

    #[tokio::test]
    async fn blank_query_never_reaches_the_service() {
        let geocoder = StubGeocoder::new(Reply::Hit(1.0, 1.0, "x"), Reply::Empty);
        let resolver = GeoResolver::new().with_geocoder(geocoder.clone());
        assert!(resolver.forward_geocode("   ").await.is_err());
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 0);
    }
}
