use crate::adapters::{AdapterRegistry, StationAdapter};
use crate::header::{HeaderCache, WaterfallHeader};
use crate::math::resample_bins;
use crate::prelude::{FetchError, FetchResult, FrequencyWindow, LineOrigin, WaterfallLine};
use crate::telemetry::LogManager;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// Payloads shorter than this are treated as error pages, not waterfall rows.
pub const MIN_PAYLOAD_BYTES: usize = 10;

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub header_timeout: Duration,
    pub data_timeout: Duration,
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            header_timeout: Duration::from_secs(5),
            data_timeout: Duration::from_secs(3),
            user_agent: format!("waterfall-proxy/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Anything that can attempt to produce one real waterfall line.
#[async_trait]
pub trait LineProvider: Send + Sync {
    async fn fetch_line(
        &self,
        station_url: &str,
        window: FrequencyWindow,
        bins: usize,
    ) -> FetchResult<WaterfallLine>;
}

/// Deadline-bounded header and data retrieval from stations. Never retries;
/// every failure comes back as a [`FetchError`] for the caller to fold.
pub struct WaterfallFetcher {
    client: Client,
    registry: Arc<AdapterRegistry>,
    cache: Arc<HeaderCache>,
    config: FetcherConfig,
    logger: LogManager,
}

impl WaterfallFetcher {
    pub fn new(
        registry: Arc<AdapterRegistry>,
        cache: Arc<HeaderCache>,
        config: FetcherConfig,
    ) -> reqwest::Result<Self> {
        let client = Client::builder().user_agent(&config.user_agent).build()?;
        Ok(Self::with_client(client, registry, cache, config))
    }

    pub fn with_client(
        client: Client,
        registry: Arc<AdapterRegistry>,
        cache: Arc<HeaderCache>,
        config: FetcherConfig,
    ) -> Self {
        Self {
            client,
            registry,
            cache,
            config,
            logger: LogManager::new("fetcher"),
        }
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Cached header when fresh, otherwise one bounded GET of the adapter's
    /// header endpoint. Failures are never cached.
    pub async fn fetch_header(&self, station_url: &str) -> FetchResult<Arc<WaterfallHeader>> {
        if let Some(header) = self.cache.get(station_url) {
            return Ok(header);
        }

        let adapter = self
            .registry
            .select(station_url)
            .ok_or_else(|| FetchError::AdapterNotFound(station_url.to_string()))?;
        let url = adapter.header_url(station_url);
        self.logger.detail(&format!("fetching header {}", url));

        let body = self.get(&url, self.config.header_timeout).await?;
        let text = String::from_utf8_lossy(&body);
        let header = adapter.parse_header(&text).map_err(|err| {
            self.logger
                .degraded(&format!("header from {} rejected: {}", url, err));
            err
        })?;

        self.logger.record(&format!(
            "cached {} bands for {}",
            header.bands.len(),
            station_url
        ));
        Ok(self.cache.put(station_url, header))
    }

    /// One bounded GET of the adapter's data endpoint, decoded and fitted to
    /// `bins` samples.
    pub async fn fetch_line(
        &self,
        station_url: &str,
        window: FrequencyWindow,
        bins: usize,
    ) -> FetchResult<WaterfallLine> {
        let adapter = self
            .registry
            .select(station_url)
            .ok_or_else(|| FetchError::AdapterNotFound(station_url.to_string()))?;
        let url = adapter.data_url(station_url, window, bins);

        let body = self.get(&url, self.config.data_timeout).await?;
        if body.len() < MIN_PAYLOAD_BYTES {
            return Err(FetchError::InvalidResponse(format!(
                "{} bytes from {}",
                body.len(),
                url
            )));
        }

        let magnitudes = adapter.decode(&body);
        let samples = resample_bins(&magnitudes, bins);
        Ok(WaterfallLine::stamped(window, samples, LineOrigin::Station))
    }

    async fn get(&self, url: &str, deadline: Duration) -> FetchResult<Vec<u8>> {
        let response = self.client.get(url).timeout(deadline).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::InvalidResponse(format!(
                "{} returned {}",
                url, status
            )));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl LineProvider for WaterfallFetcher {
    async fn fetch_line(
        &self,
        station_url: &str,
        window: FrequencyWindow,
        bins: usize,
    ) -> FetchResult<WaterfallLine> {
        WaterfallFetcher::fetch_line(self, station_url, window, bins).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{FakeClock, DEFAULT_HEADER_TTL};
    use crate::testing::{closed_station, spawn_station};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use warp::Filter;

    const BANDINFO: &str = "var wfwidth=1024;\n\
        bandname[0]='40m'; bandlow[0]=7000; bandhigh[0]=7200;\n";

    fn fetcher_with_clock(config: FetcherConfig) -> (WaterfallFetcher, Arc<FakeClock>) {
        let clock = Arc::new(FakeClock::new());
        let cache = Arc::new(HeaderCache::new(DEFAULT_HEADER_TTL, clock.clone()));
        let fetcher =
            WaterfallFetcher::new(Arc::new(AdapterRegistry::default()), cache, config).unwrap();
        (fetcher, clock)
    }

    fn window() -> FrequencyWindow {
        FrequencyWindow::new(7_000_000.0, 7_200_000.0).unwrap()
    }

    fn counted_bandinfo(body: &'static str, hits: Arc<AtomicUsize>) -> String {
        spawn_station!(warp::path!("tmp" / "bandinfo.js").map(move || {
            hits.fetch_add(1, Ordering::SeqCst);
            body
        }))
    }

    #[tokio::test]
    async fn second_header_fetch_within_ttl_hits_cache() {
        let hits = Arc::new(AtomicUsize::new(0));
        let station = counted_bandinfo(BANDINFO, hits.clone());
        let (fetcher, _) = fetcher_with_clock(FetcherConfig::default());

        let first = fetcher.fetch_header(&station).await.unwrap();
        let second = fetcher.fetch_header(&station).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.bands[0].end_hz, 7_200_000.0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stale_header_is_refetched() {
        let hits = Arc::new(AtomicUsize::new(0));
        let station = counted_bandinfo(BANDINFO, hits.clone());
        let (fetcher, clock) = fetcher_with_clock(FetcherConfig::default());

        fetcher.fetch_header(&station).await.unwrap();
        clock.advance(DEFAULT_HEADER_TTL);
        fetcher.fetch_header(&station).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unparsable_header_is_not_cached() {
        let hits = Arc::new(AtomicUsize::new(0));
        let station = counted_bandinfo("<html>maintenance</html>", hits.clone());
        let (fetcher, _) = fetcher_with_clock(FetcherConfig::default());

        for _ in 0..2 {
            let err = fetcher.fetch_header(&station).await.unwrap_err();
            assert!(matches!(err, FetchError::ParseFailure(_)));
        }
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn fetch_line_decodes_station_bytes() {
        let station = spawn_station!(warp::path!("~~waterfalldata").map(|| vec![128u8; 512]));
        let (fetcher, _) = fetcher_with_clock(FetcherConfig::default());

        let line = fetcher.fetch_line(&station, window(), 512).await.unwrap();
        assert_eq!(line.samples.len(), 512);
        assert!(line.samples.iter().all(|v| *v == 1.0));
        assert_eq!(line.freq_start_hz, 7_000_000.0);
        assert_eq!(line.freq_step_hz, 200_000.0 / 512.0);
        assert_eq!(line.origin, LineOrigin::Station);
    }

    #[tokio::test]
    async fn short_payload_is_invalid_response() {
        let station = spawn_station!(warp::path!("~~waterfalldata").map(|| vec![128u8; 9]));
        let (fetcher, _) = fetcher_with_clock(FetcherConfig::default());

        let err = fetcher.fetch_line(&station, window(), 512).await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn payload_length_is_fitted_to_bins() {
        let station = spawn_station!(warp::path!("~~waterfalldata").map(|| vec![0u8; 256]));
        let (fetcher, _) = fetcher_with_clock(FetcherConfig::default());

        let line = fetcher.fetch_line(&station, window(), 512).await.unwrap();
        assert_eq!(line.samples.len(), 512);
        assert!(line.samples.iter().all(|v| *v > 0.0 && *v < 0.001));
    }

    #[tokio::test]
    async fn non_success_status_is_invalid_response() {
        let station = spawn_station!(warp::any().map(|| {
            warp::reply::with_status(vec![128u8; 64], warp::http::StatusCode::BAD_GATEWAY)
        }));
        let (fetcher, _) = fetcher_with_clock(FetcherConfig::default());

        let err = fetcher.fetch_line(&station, window(), 512).await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidResponse(_)));
        let err = fetcher.fetch_header(&station).await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn slow_station_misses_deadline() {
        let station = spawn_station!(warp::any().then(|| async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            vec![128u8; 64]
        }));
        let (fetcher, _) = fetcher_with_clock(FetcherConfig {
            data_timeout: Duration::from_millis(50),
            ..Default::default()
        });

        let err = fetcher.fetch_line(&station, window(), 512).await.unwrap_err();
        assert!(matches!(err, FetchError::Unreachable(_)), "{:?}", err);
    }

    #[tokio::test]
    async fn closed_port_is_unreachable() {
        let (fetcher, _) = fetcher_with_clock(FetcherConfig::default());
        let err = fetcher
            .fetch_line(&closed_station(), window(), 512)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Unreachable(_)));
    }

    #[tokio::test]
    async fn unsupported_scheme_has_no_adapter() {
        let (fetcher, _) = fetcher_with_clock(FetcherConfig::default());
        let err = fetcher
            .fetch_header("ftp://files.example.org")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::AdapterNotFound(_)));
    }
}
