//! Encore Storage - Act Cache Store
//!
//! Defines the [`ActStore`] abstraction the cache service reads through, plus
//! two implementations:
//!
//! - [`LmdbActStore`]: persistent, memory-mapped, used in production
//! - [`InMemoryActStore`]: process-local, used in development and tests
//!
//! [`with_timeout`] bounds any store future so a hung backend cannot block a
//! request indefinitely.

pub mod guard;
pub mod lmdb;
pub mod memory;
pub mod store;

pub use guard::with_timeout;
pub use lmdb::{LmdbActStore, LmdbStoreError};
pub use memory::InMemoryActStore;
pub use store::{sentinel_record, ActStore, HEALTH_SENTINEL_ID};
