use serde::{Deserialize, Serialize};

/// Where a waterfall line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineOrigin {
    Station,
    Simulated,
}

/// One normalized row of spectrum intensities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterfallLine {
    pub timestamp_millis: i64,
    pub freq_start_hz: f64,
    pub freq_step_hz: f64,
    pub samples: Vec<f32>,
    pub origin: LineOrigin,
}

impl WaterfallLine {
    /// Builds a line stamped with the current wall-clock time. Samples are
    /// clamped to `[0, 1]` whatever produced them.
    pub fn stamped(
        window: FrequencyWindow,
        mut samples: Vec<f32>,
        origin: LineOrigin,
    ) -> Self {
        for sample in samples.iter_mut() {
            *sample = if sample.is_finite() {
                sample.clamp(0.0, 1.0)
            } else {
                0.0
            };
        }
        let bins = samples.len();
        Self {
            timestamp_millis: chrono::Utc::now().timestamp_millis(),
            freq_start_hz: window.min_hz,
            freq_step_hz: window.step_hz(bins),
            samples,
            origin,
        }
    }

    pub fn bins(&self) -> usize {
        self.samples.len()
    }
}

/// Frequency window requested by an observer, in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrequencyWindow {
    pub min_hz: f64,
    pub max_hz: f64,
}

impl FrequencyWindow {
    /// Returns `None` unless both edges are finite, non-negative and `min < max`.
    pub fn new(min_hz: f64, max_hz: f64) -> Option<Self> {
        let valid = min_hz.is_finite() && max_hz.is_finite() && min_hz >= 0.0 && min_hz < max_hz;
        valid.then_some(Self { min_hz, max_hz })
    }

    pub fn width_hz(&self) -> f64 {
        self.max_hz - self.min_hz
    }

    pub fn step_hz(&self, bins: usize) -> f64 {
        if bins == 0 {
            0.0
        } else {
            self.width_hz() / bins as f64
        }
    }
}

/// Typed outcome of every station I/O and decoding failure.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("station unreachable: {0}")]
    Unreachable(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("header parse failure: {0}")]
    ParseFailure(String),
    #[error("no adapter handles {0}")]
    AdapterNotFound(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            FetchError::Unreachable(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::InvalidResponse(format!("status {}", status))
        } else if err.is_body() || err.is_decode() {
            FetchError::InvalidResponse(err.to_string())
        } else {
            FetchError::Unreachable(err.to_string())
        }
    }
}

pub type FetchResult<T> = Result<T, FetchError>;

/// Errors surfaced to callers of the service facade.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error("station not found: {0}")]
    StationNotFound(String),
    #[error("invalid frequency window {min_hz}..{max_hz}")]
    InvalidWindow { min_hz: f64, max_hz: f64 },
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
