use serde::{Deserialize, Serialize};
use wfcore::prelude::WaterfallLine;

/// Window used when an info request does not name one: the HF range.
pub const DEFAULT_WINDOW_HZ: (f64, f64) = (0.0, 30_000_000.0);

#[derive(Debug, Clone, Deserialize)]
pub struct StreamQuery {
    pub min: f64,
    pub max: f64,
    #[serde(default = "default_real")]
    pub real: bool,
}

fn default_real() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InfoQuery {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl InfoQuery {
    pub fn bounds(&self) -> (f64, f64) {
        (
            self.min.unwrap_or(DEFAULT_WINDOW_HZ.0),
            self.max.unwrap_or(DEFAULT_WINDOW_HZ.1),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioQuery {
    pub freq: f64,
    #[serde(default = "default_mode")]
    pub mode: String,
}

fn default_mode() -> String {
    "am".into()
}

/// Push frame carrying one line to a WebSocket observer.
#[derive(Debug, Serialize)]
pub struct WaterfallEvent<'a> {
    pub event: &'static str,
    pub data: &'a WaterfallLine,
}

impl<'a> WaterfallEvent<'a> {
    pub fn waterfall(line: &'a WaterfallLine) -> Self {
        Self {
            event: "waterfall",
            data: line,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
