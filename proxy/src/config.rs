use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use wfcore::adapters::AdapterRegistry;
use wfcore::fetch::{FetcherConfig, WaterfallFetcher};
use wfcore::generator::GeneratorConfig;
use wfcore::header::HeaderCache;
use wfcore::session::SessionConfig;
use wfcore::station::{InMemoryDirectory, Station};
use wfcore::status::StatusConfig;
use wfcore::telemetry::MetricsRecorder;
use wfcore::WaterfallService;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub bind: SocketAddr,
    pub header_ttl_secs: u64,
    pub header_timeout_ms: u64,
    pub data_timeout_ms: u64,
    pub status_timeout_ms: u64,
    pub bins: usize,
    pub tick_ms: u64,
    pub channel_capacity: usize,
    /// Fallback spectrum used whenever a station cannot supply a line.
    pub generator: GeneratorConfig,
    pub stations: Vec<Station>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 9000)),
            header_ttl_secs: 300,
            header_timeout_ms: 5_000,
            data_timeout_ms: 3_000,
            status_timeout_ms: 5_000,
            bins: 512,
            tick_ms: 33,
            channel_capacity: 1,
            generator: GeneratorConfig::default(),
            stations: Vec::new(),
        }
    }
}

impl ProxyConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading proxy config {}", path_ref.display()))?;
        let config: ProxyConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing proxy config {}", path_ref.display()))?;
        Ok(config)
    }

    /// Applies command-line values given explicitly; absent ones keep the
    /// loaded (or default) settings.
    pub fn with_overrides(
        mut self,
        bind: Option<SocketAddr>,
        bins: Option<usize>,
        tick_ms: Option<u64>,
    ) -> Self {
        if let Some(bind) = bind {
            self.bind = bind;
        }
        if let Some(bins) = bins {
            self.bins = bins;
        }
        if let Some(tick_ms) = tick_ms {
            self.tick_ms = tick_ms;
        }
        self
    }

    pub fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig {
            header_timeout: Duration::from_millis(self.header_timeout_ms),
            data_timeout: Duration::from_millis(self.data_timeout_ms),
            ..Default::default()
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            tick: Duration::from_millis(self.tick_ms.max(1)),
            bins: self.bins,
            channel_capacity: self.channel_capacity.max(1),
            generator: self.generator.clone(),
        }
    }

    pub fn status_config(&self) -> StatusConfig {
        StatusConfig {
            timeout: Duration::from_millis(self.status_timeout_ms),
        }
    }

    pub fn build_service(&self, metrics: Arc<MetricsRecorder>) -> anyhow::Result<WaterfallService> {
        let cache = Arc::new(HeaderCache::with_ttl(Duration::from_secs(
            self.header_ttl_secs,
        )));
        let fetcher = WaterfallFetcher::new(
            Arc::new(AdapterRegistry::default()),
            cache,
            self.fetcher_config(),
        )
        .context("building station HTTP client")?;
        let directory = InMemoryDirectory::new(self.stations.clone());

        Ok(WaterfallService::new(
            Arc::new(directory),
            Arc::new(fetcher),
            self.status_config(),
            self.session_config(),
            metrics,
        ))
    }
}
