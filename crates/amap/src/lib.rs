//! AMap (Gaode) web-service adapter.
//!
//! Wraps the two REST endpoints the task units need: `/v3/geocode/geo` for
//! turning an address into coordinates and `/v3/place/around` for nearby POI
//! search.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Query-string construction, status checking and the
//! cleanup of AMap's loosely typed JSON live here. Callers receive plain
//! Rust types.

mod client;
mod errors;
mod types;

pub use client::{AmapClient, AmapConfig, PlaceAroundQuery, DEFAULT_BASE_URL};
pub use errors::AmapError;
pub use types::{BizExt, Poi, Restaurant};
