use nearhand_core::CoordinateError;
use thiserror::Error;

/// Failures reported by the device position capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeolocationError {
    #[error("geolocation is not available on this platform")]
    Unavailable,

    #[error("permission to read the device position was denied")]
    PermissionDenied,

    #[error("the device position could not be determined")]
    PositionUnavailable,

    #[error("timed out after {after_secs}s waiting for the device position")]
    Timeout { after_secs: u64 },
}

/// Errors returned by the HTTP clients (backend API and geocoding service).
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// Rejected locally; nothing was sent.
    #[error(transparent)]
    InvalidCoordinate(#[from] CoordinateError),

    /// Rejected locally; nothing was sent.
    #[error("a category is required for a nearby search")]
    MissingCategory,

    #[error("pagination limit reached for {url}: exceeded {max_pages} pages")]
    PaginationLimit { url: String, max_pages: usize },
}

impl ApiError {
    /// HTTP status of the failed response, when there was one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http(e) => e.status().map(|s| s.as_u16()),
            ApiError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Terminal failure of one search, or of a geolocation/geocoding step the
/// caller drives directly. Every variant renders as a distinct message that
/// can be shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    #[error("{0}")]
    InvalidCoordinate(#[from] CoordinateError),

    #[error("choose a service category to search near a location")]
    MissingCategory,

    #[error("your device can't share its location here; type a location instead")]
    GeolocationUnavailable,

    #[error("location permission was denied; type a location instead")]
    PermissionDenied,

    #[error("your current position couldn't be determined; type a location instead")]
    PositionUnavailable,

    #[error("finding your position took too long; type a location instead")]
    Timeout,

    #[error("couldn't find a place called \"{query}\"; check the spelling or try a nearby city")]
    LocationNotFound { query: String },

    #[error("the location lookup service is not responding: {message}")]
    GeocodingServiceError { message: String },

    #[error("provider search failed: {message}")]
    ServerSearchError {
        status: Option<u16>,
        message: String,
    },

    #[error("couldn't load the provider list: {message}")]
    CacheRefreshError { message: String },
}

impl SearchError {
    /// `true` when editing the search input (or typing a location by hand)
    /// can get the user past this error.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            SearchError::GeocodingServiceError { .. }
                | SearchError::ServerSearchError { .. }
                | SearchError::CacheRefreshError { .. }
        )
    }

    pub(crate) fn server_search(err: &ApiError) -> Self {
        match err {
            ApiError::InvalidCoordinate(c) => SearchError::InvalidCoordinate(*c),
            ApiError::MissingCategory => SearchError::MissingCategory,
            other => SearchError::ServerSearchError {
                status: other.status(),
                message: other.to_string(),
            },
        }
    }

    pub(crate) fn cache_refresh(err: &ApiError) -> Self {
        SearchError::CacheRefreshError {
            message: err.to_string(),
        }
    }
}

impl From<GeolocationError> for SearchError {
    fn from(err: GeolocationError) -> Self {
        match err {
            GeolocationError::Unavailable => SearchError::GeolocationUnavailable,
            GeolocationError::PermissionDenied => SearchError::PermissionDenied,
            GeolocationError::PositionUnavailable => SearchError::PositionUnavailable,
            GeolocationError::Timeout { .. } => SearchError::Timeout,
        }
    }
}
