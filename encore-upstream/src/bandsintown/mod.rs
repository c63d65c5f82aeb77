//! Bandsintown tour event gateway
//!
//! Listing pages embed their events as schema.org LD+JSON. The client pulls
//! those blocks out of the HTML and maps every `*Event` entry to an [`Event`].
//!
//! [`Event`]: encore_core::Event

pub mod client;
pub mod extract;
pub mod transform;

pub use client::{events_from_html, BandsintownClient, BandsintownConfig};
pub use extract::{extract_event_nodes, extract_ld_json};
pub use transform::to_event;
