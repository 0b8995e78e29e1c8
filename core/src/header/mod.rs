//! Band metadata advertised by a station and the cache that keeps it fresh.

pub mod cache;
pub mod scan;

use crate::prelude::{FetchError, FetchResult};
use serde::{Deserialize, Serialize};

pub use cache::{Clock, HeaderCache, SystemClock, DEFAULT_HEADER_TTL};
#[cfg(test)]
pub use cache::FakeClock;
pub use scan::Assignments;

/// One contiguous band of a station's waterfall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Band {
    pub name: String,
    pub start_hz: f64,
    pub end_hz: f64,
    pub start_pixel: u32,
    pub end_pixel: u32,
}

/// Parsed waterfall configuration of one station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterfallHeader {
    pub bands: Vec<Band>,
    pub total_width_pixels: u32,
}

impl WaterfallHeader {
    /// Lays `(name, start_hz, end_hz)` ranges side by side across
    /// `total_width_pixels`, each band taking a share proportional to its
    /// bandwidth. Input order is preserved.
    pub fn from_ranges(
        ranges: Vec<(String, f64, f64)>,
        total_width_pixels: u32,
    ) -> FetchResult<Self> {
        if ranges.is_empty() {
            return Err(FetchError::ParseFailure("no bands advertised".into()));
        }
        if total_width_pixels == 0 {
            return Err(FetchError::ParseFailure("zero waterfall width".into()));
        }
        if let Some((name, _, _)) = ranges
            .iter()
            .find(|(_, start, end)| !(start.is_finite() && end.is_finite() && start < end))
        {
            return Err(FetchError::ParseFailure(format!(
                "band {} has an empty or inverted range",
                name
            )));
        }

        let total_bandwidth: f64 = ranges.iter().map(|(_, start, end)| end - start).sum();
        let width = total_width_pixels as f64;
        let mut consumed = 0.0;
        let bands = ranges
            .into_iter()
            .map(|(name, start_hz, end_hz)| {
                let start_pixel = (width * consumed / total_bandwidth).round() as u32;
                consumed += end_hz - start_hz;
                let end_pixel = (width * consumed / total_bandwidth).round() as u32;
                Band {
                    name,
                    start_hz,
                    end_hz,
                    start_pixel,
                    end_pixel,
                }
            })
            .collect();

        Ok(Self {
            bands,
            total_width_pixels,
        })
    }
}
