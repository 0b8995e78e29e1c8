use super::{endpoint, AdapterType, StationAdapter};
use crate::header::{Assignments, WaterfallHeader};
use crate::prelude::{FetchError, FetchResult, FrequencyWindow};
use reqwest::Url;

/// Generic web receiver family. Accepts any http(s) station, so it must be
/// registered after every specialised adapter.
///
/// The band configuration is served as script text:
///
/// ```text
/// var wfwidth = 1024;
/// bandname[0] = '80m'; bandlow[0] = 3500.0; bandhigh[0] = 3800.0;
/// bandname[1] = '40m'; bandlow[1] = 7000.0; bandhigh[1] = 7200.0;
/// ```
///
/// Band edges are in kHz. Waterfall rows are raw bytes, one per bin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StandardAdapter;

const HEADER_PATH: &str = "tmp/bandinfo.js";
const DATA_PATH: &str = "~~waterfalldata";
const WIDTH_KEY: &str = "wfwidth";
const NAME_KEY: &str = "bandname";
const LOW_KEY: &str = "bandlow";
const HIGH_KEY: &str = "bandhigh";

impl StationAdapter for StandardAdapter {
    fn adapter_type(&self) -> AdapterType {
        AdapterType::Standard
    }

    fn can_handle(&self, url: &Url) -> bool {
        matches!(url.scheme(), "http" | "https") && url.host_str().is_some()
    }

    fn header_url(&self, base: &str) -> String {
        endpoint(base, HEADER_PATH)
    }

    fn data_url(&self, base: &str, window: FrequencyWindow, bins: usize) -> String {
        format!(
            "{}?min={:.0}&max={:.0}&bins={}",
            endpoint(base, DATA_PATH),
            window.min_hz,
            window.max_hz,
            bins
        )
    }

    fn audio_url(&self, base: &str, freq_hz: f64, mode: &str) -> String {
        format!(
            "{}?tune={:.2}{}",
            endpoint(base, ""),
            freq_hz / 1_000.0,
            mode.to_ascii_lowercase()
        )
    }

    fn parse_header(&self, body: &str) -> FetchResult<WaterfallHeader> {
        let assignments = Assignments::scan(body);
        let width = assignments
            .number(WIDTH_KEY)
            .filter(|w| *w >= 1.0 && *w <= u32::MAX as f64)
            .ok_or_else(|| FetchError::ParseFailure(format!("missing {}", WIDTH_KEY)))?;

        let mut ranges = Vec::new();
        for (index, fields) in assignments.slots() {
            let low = fields.get(LOW_KEY).and_then(|v| v.parse::<f64>().ok());
            let high = fields.get(HIGH_KEY).and_then(|v| v.parse::<f64>().ok());
            let (Some(low_khz), Some(high_khz)) = (low, high) else {
                continue;
            };
            let name = fields
                .get(NAME_KEY)
                .cloned()
                .unwrap_or_else(|| format!("band{}", index));
            ranges.push((name, low_khz * 1_000.0, high_khz * 1_000.0));
        }

        WaterfallHeader::from_ranges(ranges, width as u32)
    }
}
