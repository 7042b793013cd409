//! The refresh engine: drives parser -> store -> enricher for every active
//! source in a region, with per-source isolation, plus the async job surface
//! and the read-side projections the API serves.

mod engine;
pub mod views;

pub use engine::{EnrichmentCheck, RefreshEngine, MAX_CONCURRENT_SOURCES, SOURCE_DEADLINE};
