use crate::prelude::FetchError;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct StatusConfig {
    pub timeout: Duration,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
        }
    }
}

/// Outcome of one reachability probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationStatus {
    pub online: bool,
    pub latency_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StationStatus {
    fn online(latency: Duration) -> Self {
        Self {
            online: true,
            latency_ms: Some(latency.as_millis() as u64),
            error: None,
        }
    }

    fn offline(error: String) -> Self {
        Self {
            online: false,
            latency_ms: None,
            error: Some(error),
        }
    }
}

/// Bounded HEAD probe against a station's base URL.
///
/// A 405 also counts as online: some station software rejects HEAD while
/// serving pages normally. That heuristic can report a broken server that
/// only answers 405 as reachable.
pub struct StatusChecker {
    client: Client,
    config: StatusConfig,
}

impl StatusChecker {
    pub fn new(client: Client, config: StatusConfig) -> Self {
        Self { client, config }
    }

    pub async fn check(&self, station_url: &str) -> StationStatus {
        let started = Instant::now();
        let response = self
            .client
            .head(station_url)
            .timeout(self.config.timeout)
            .send()
            .await;

        match response {
            Ok(response)
                if response.status().is_success()
                    || response.status() == StatusCode::METHOD_NOT_ALLOWED =>
            {
                StationStatus::online(started.elapsed())
            }
            Ok(response) => {
                StationStatus::offline(format!("unexpected status {}", response.status()))
            }
            Err(err) => StationStatus::offline(FetchError::from(err).to_string()),
        }
    }
}
