//! Core of the waterfall proxy: per-vendor station adapters, the band header
//! cache, deadline-bounded waterfall fetching with synthetic fallback, and the
//! timer-driven sessions that push normalized lines to observers.
//!
//! Every station failure is a typed [`prelude::FetchError`]; sessions fold it
//! into generator output so a stream never stops because a station did.

pub mod adapters;
pub mod fetch;
pub mod generator;
pub mod header;
pub mod math;
pub mod prelude;
pub mod service;
pub mod session;
pub mod station;
pub mod status;
pub mod telemetry;

#[cfg(test)]
mod testing;

pub use prelude::{FetchError, FrequencyWindow, LineOrigin, ServiceError, WaterfallLine};
pub use service::WaterfallService;
