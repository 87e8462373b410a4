//! notewall catalog - music track search against a third-party catalog API.
//!
//! Uses the OAuth client-credentials flow. The bearer token is cached in
//! memory until shortly before it expires; token requests are retried with
//! exponential backoff on transient failures.

pub mod client;
pub mod error;
pub mod track;

pub use client::{backoff_delay, CatalogClient, CatalogConfig};
pub use error::CatalogError;
pub use track::{extract_track_id, TrackResult};
