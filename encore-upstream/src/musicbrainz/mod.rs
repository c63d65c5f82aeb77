//! MusicBrainz metadata gateway
//!
//! Looks acts up by MBID with their URL relations included.

pub mod client;
pub mod transform;
pub mod types;

pub use client::{MusicBrainzClient, MusicBrainzConfig};
pub use transform::{relation_key, to_act_record};
