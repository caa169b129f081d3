//! Domain types and configuration shared by the nearhand crates.

pub mod app_config;
pub mod config;
pub mod criteria;
pub mod location;
pub mod provider;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use criteria::{AdvancedFilters, CategoryKind, RatingSort, SearchCriteria};
pub use location::{Coordinate, CoordinateError, LocationQuery};
pub use provider::{ProviderRecord, ServiceSummary};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
