//! # Shop Metrics Aggregator
//!
//! Turns raw, loosely-shaped Etsy payloads into the typed records in
//! `core-types`.
//!
//! ## Architectural Principles
//!
//! - **Pure logic:** no I/O and no knowledge of where payloads came from (live
//!   API, fixture, cache). Depends only on `core-types`.
//! - **Forgiving on absence, strict on shape:** a missing or `null` field
//!   becomes zero / empty; a field of the wrong type is an
//!   `AnalyticsError::MalformedPayload`, never silently coerced.
//!
//! ## Public API
//!
//! - `MetricsAggregator`: shop totals, listing rankings, trend series, funnel
//!   rates and period-over-period deltas.
//! - `AnalyticsError`: the errors this crate can return.

// Declare the modules that constitute this crate.
pub mod engine;
pub mod error;
mod fields;

// Re-export the key components to create a clean, public-facing API.
pub use engine::{MetricsAggregator, TOP_N};
pub use error::AnalyticsError;
