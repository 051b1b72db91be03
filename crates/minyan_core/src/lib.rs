//! Core domain logic for the minyan broadcast finder.
//! This crate is the single source of truth for broadcast invariants and the
//! nearby-search algorithm.

pub mod api;
pub mod config;
pub mod db;
pub mod geo;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use api::broadcast_api::{ApiResponse, BroadcastApi, NearbyParams};
pub use api::tools::{dispatch_tool, tool_declarations, ToolDeclaration, ToolOutcome};
pub use config::{ConfigError, CoreConfig};
pub use geo::distance::{distance_miles, EARTH_RADIUS_MILES};
pub use geo::nearby::{find_nearby, NearbyError, NearbyHit, NearbyQuery};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::broadcast::{
    Broadcast, BroadcastId, BroadcastPatch, GeoPoint, MinyanType, NewBroadcast,
};
pub use model::timestamp::parse_timestamp;
pub use model::validate::{
    validate_coordinates, validate_radius, validate_time, validate_type, validate_window,
    ValidationError,
};
pub use repo::broadcast_repo::{
    BroadcastFilter, BroadcastRepository, LatitudeBand, RepoError, RepoResult,
    SqliteBroadcastRepository,
};
pub use service::broadcast_service::{BroadcastError, BroadcastService, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
