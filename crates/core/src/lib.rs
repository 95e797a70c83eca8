//! Tokyo Map Core
//!
//! Foundational data types and pure algorithms for the Tokyo map agent
//! workspace. This crate performs no I/O and has no dependency on the
//! model provider, the geodata backends or the HTTP layer.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `geo` - Coordinates and great-circle distance
//! - `record` - `PointRecord`, ordered `Layers` and union deduplication
//! - `candidate` - Distance ranking of records into candidate buckets
//! - `itinerary` - Round-robin day scheduling from candidate buckets

pub mod candidate;
pub mod error;
pub mod geo;
pub mod itinerary;
pub mod record;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Geometry ───────────────────────────────────────────────────────────
pub use geo::{haversine_km, GeoPoint};

// ── Records & Layers ───────────────────────────────────────────────────
pub use record::{layer_stats, merge_union, DedupKey, Layers, PointRecord, UNION_LAYER};

// ── Candidates ─────────────────────────────────────────────────────────
pub use candidate::{bucket_take, rank_by_distance};

// ── Itinerary ──────────────────────────────────────────────────────────
pub use itinerary::{build_itinerary, BuiltItinerary, ItineraryDay, ItineraryItem, Pace};
