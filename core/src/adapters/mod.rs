//! Per-vendor protocol adapters and the ordered registry that picks one for a
//! station URL.

pub mod kiwi;
pub mod standard;

use crate::header::WaterfallHeader;
use crate::math::{decode_magnitudes, DecodeProfile};
use crate::prelude::{FetchResult, FrequencyWindow};
use reqwest::Url;
use serde::{Deserialize, Serialize};

pub use kiwi::KiwiAdapter;
pub use standard::StandardAdapter;

/// Station software family reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterType {
    Standard,
    Kiwi,
    Unknown,
}

/// URL construction and decoding contract for one station software family.
pub trait StationAdapter {
    fn adapter_type(&self) -> AdapterType;

    fn can_handle(&self, url: &Url) -> bool;

    fn header_url(&self, base: &str) -> String;

    fn data_url(&self, base: &str, window: FrequencyWindow, bins: usize) -> String;

    fn audio_url(&self, base: &str, freq_hz: f64, mode: &str) -> String;

    fn parse_header(&self, body: &str) -> FetchResult<WaterfallHeader>;

    fn decode_profile(&self) -> DecodeProfile {
        DecodeProfile::DEFAULT
    }

    fn decode(&self, bytes: &[u8]) -> Vec<f32> {
        decode_magnitudes(bytes, self.decode_profile())
    }
}

/// The closed set of supported families.
#[derive(Debug, Clone, PartialEq)]
pub enum Adapter {
    Standard(StandardAdapter),
    Kiwi(KiwiAdapter),
}

impl Adapter {
    fn inner(&self) -> &dyn StationAdapter {
        match self {
            Adapter::Standard(adapter) => adapter,
            Adapter::Kiwi(adapter) => adapter,
        }
    }
}

impl StationAdapter for Adapter {
    fn adapter_type(&self) -> AdapterType {
        self.inner().adapter_type()
    }

    fn can_handle(&self, url: &Url) -> bool {
        self.inner().can_handle(url)
    }

    fn header_url(&self, base: &str) -> String {
        self.inner().header_url(base)
    }

    fn data_url(&self, base: &str, window: FrequencyWindow, bins: usize) -> String {
        self.inner().data_url(base, window, bins)
    }

    fn audio_url(&self, base: &str, freq_hz: f64, mode: &str) -> String {
        self.inner().audio_url(base, freq_hz, mode)
    }

    fn parse_header(&self, body: &str) -> FetchResult<WaterfallHeader> {
        self.inner().parse_header(body)
    }

    fn decode_profile(&self) -> DecodeProfile {
        self.inner().decode_profile()
    }
}

/// Ordered adapter list; the first adapter whose predicate accepts a URL wins,
/// so specialised families must be registered before generic ones.
#[derive(Debug, Clone)]
pub struct AdapterRegistry {
    adapters: Vec<Adapter>,
}

impl AdapterRegistry {
    pub fn empty() -> Self {
        Self {
            adapters: Vec::new(),
        }
    }

    pub fn register(mut self, adapter: Adapter) -> Self {
        self.adapters.push(adapter);
        self
    }

    /// `None` is not an error: callers degrade to [`AdapterType::Unknown`].
    pub fn select(&self, station_url: &str) -> Option<&Adapter> {
        let url = Url::parse(station_url).ok()?;
        self.adapters.iter().find(|adapter| adapter.can_handle(&url))
    }

    pub fn adapter_type(&self, station_url: &str) -> AdapterType {
        self.select(station_url)
            .map(StationAdapter::adapter_type)
            .unwrap_or(AdapterType::Unknown)
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::empty()
            .register(Adapter::Kiwi(KiwiAdapter))
            .register(Adapter::Standard(StandardAdapter))
    }
}

pub(crate) fn endpoint(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
