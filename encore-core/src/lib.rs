//! Encore Core - Act Types and Staleness Policy
//!
//! Pure data structures and pure functions. Every other crate depends on this.
//! Nothing in here performs I/O: stores, gateways and background workers live
//! in the crates above.

pub mod entities;
pub mod error;
pub mod health;
pub mod staleness;
pub mod status;
pub mod time;

pub use entities::{ActId, ActRecord, ActStamp, ActStatus, Event, Geo, Location, TOUR_LISTING_RELATION};
pub use error::{
    ConfigError, EncoreError, EncoreResult, ServiceCode, ServiceError, StorageError,
    UpstreamError, ValidationError,
};
pub use health::{CacheHealth, HealthCheck, HealthStatus};
pub use staleness::{is_stale, is_stale_at, STALE_AFTER};
pub use status::{determine_status, determine_status_on, parse_event_date, ON_TOUR_WINDOW_DAYS, TOUR_PLANNED_WINDOW_DAYS};
pub use time::{berlin_timestamp, berlin_timestamp_at, parse_berlin_timestamp, TIMESTAMP_FORMAT};
