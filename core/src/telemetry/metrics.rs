use serde::Serialize;
use std::sync::Mutex;

/// Shared counters for emitted, substituted and dropped waterfall lines.
pub struct MetricsRecorder {
    inner: Mutex<Metrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub station_lines: usize,
    pub simulated_lines: usize,
    pub dropped_lines: usize,
    pub sessions_opened: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Metrics::default()),
        }
    }

    pub fn record_station_line(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.station_lines += 1;
        }
    }

    pub fn record_simulated_line(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.simulated_lines += 1;
        }
    }

    pub fn record_dropped_line(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.dropped_lines += 1;
        }
    }

    pub fn record_session_opened(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.sessions_opened += 1;
        }
    }

    pub fn snapshot(&self) -> Metrics {
        if let Ok(metrics) = self.inner.lock() {
            *metrics
        } else {
            Metrics::default()
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
