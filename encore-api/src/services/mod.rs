//! Service Layer
//!
//! The enrichment pipeline and the read-through cache service built on it.
//! Routes and background jobs call into these; neither knows about HTTP.

mod act_service;
mod enrichment;

pub use act_service::*;
pub use enrichment::*;
