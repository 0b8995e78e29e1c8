//! Entry points exposed to the transport layer: session opening, stream and
//! audio info, band metadata and status probes.

use crate::adapters::{AdapterType, StationAdapter};
use crate::fetch::{LineProvider, WaterfallFetcher};
use crate::header::WaterfallHeader;
use crate::prelude::{FrequencyWindow, ServiceError, ServiceResult, WaterfallLine};
use crate::session::{SessionConfig, SessionHandle, StreamSession};
use crate::station::{Station, StationDirectory};
use crate::status::{StationStatus, StatusChecker, StatusConfig};
use crate::telemetry::{LogManager, MetricsRecorder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamInfo {
    pub waterfall_source_url: String,
    pub proxy_url: String,
    pub adapter_type: AdapterType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    #[serde(flatten)]
    pub status: StationStatus,
    pub checked_at: DateTime<Utc>,
}

/// Where a listener can hear the station directly. Audio is not relayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioInfo {
    pub vendor_url: String,
    pub adapter_type: AdapterType,
    pub proxied: bool,
}

pub type OpenedSession = (SessionHandle, mpsc::Receiver<WaterfallLine>);

pub struct WaterfallService {
    directory: Arc<dyn StationDirectory>,
    fetcher: Arc<WaterfallFetcher>,
    status: StatusChecker,
    session_config: SessionConfig,
    metrics: Arc<MetricsRecorder>,
    logger: LogManager,
}

impl WaterfallService {
    pub fn new(
        directory: Arc<dyn StationDirectory>,
        fetcher: Arc<WaterfallFetcher>,
        status_config: StatusConfig,
        session_config: SessionConfig,
        metrics: Arc<MetricsRecorder>,
    ) -> Self {
        let status = StatusChecker::new(fetcher.client().clone(), status_config);
        Self {
            directory,
            fetcher,
            status,
            session_config,
            metrics,
            logger: LogManager::new("service"),
        }
    }

    pub fn metrics(&self) -> &Arc<MetricsRecorder> {
        &self.metrics
    }

    pub async fn station(&self, station_id: &str) -> ServiceResult<Station> {
        self.directory
            .station(station_id)
            .await
            .ok_or_else(|| ServiceError::StationNotFound(station_id.to_string()))
    }

    /// Validates the window and resolves the station before anything starts
    /// ticking; neither failure leaves a session behind.
    pub async fn open_session(
        &self,
        station_id: &str,
        min_hz: f64,
        max_hz: f64,
        use_real: bool,
    ) -> ServiceResult<OpenedSession> {
        let window = window(min_hz, max_hz)?;
        let station = self.station(station_id).await?;
        let provider: Arc<dyn LineProvider> = self.fetcher.clone();

        let session = StreamSession::new(
            station.url,
            window,
            use_real,
            self.session_config.clone(),
            provider,
            self.metrics.clone(),
        );
        Ok(session.open())
    }

    pub async fn stream_info(
        &self,
        station_id: &str,
        window: FrequencyWindow,
    ) -> ServiceResult<StreamInfo> {
        let station = self.station(station_id).await?;
        let proxy_url = format!(
            "/stations/{}/waterfall?min={:.0}&max={:.0}",
            station.id, window.min_hz, window.max_hz
        );
        let info = match self.fetcher.registry().select(&station.url) {
            Some(adapter) => StreamInfo {
                waterfall_source_url: adapter.data_url(
                    &station.url,
                    window,
                    self.session_config.bins,
                ),
                proxy_url,
                adapter_type: adapter.adapter_type(),
            },
            None => StreamInfo {
                waterfall_source_url: station.url,
                proxy_url,
                adapter_type: AdapterType::Unknown,
            },
        };
        Ok(info)
    }

    pub async fn bands(&self, station_id: &str) -> ServiceResult<Arc<WaterfallHeader>> {
        let station = self.station(station_id).await?;
        Ok(self.fetcher.fetch_header(&station.url).await?)
    }

    pub async fn status(&self, station_id: &str) -> ServiceResult<StatusReport> {
        let station = self.station(station_id).await?;
        let status = self.status.check(&station.url).await;
        if !status.online {
            self.logger.degraded(&format!(
                "{} offline: {}",
                station.id,
                status.error.as_deref().unwrap_or("unknown")
            ));
        }
        Ok(StatusReport {
            status,
            checked_at: Utc::now(),
        })
    }

    pub async fn audio_info(
        &self,
        station_id: &str,
        freq_hz: f64,
        mode: &str,
    ) -> ServiceResult<AudioInfo> {
        let station = self.station(station_id).await?;
        let info = match self.fetcher.registry().select(&station.url) {
            Some(adapter) => AudioInfo {
                vendor_url: adapter.audio_url(&station.url, freq_hz, mode),
                adapter_type: adapter.adapter_type(),
                proxied: false,
            },
            None => AudioInfo {
                vendor_url: station.url,
                adapter_type: AdapterType::Unknown,
                proxied: false,
            },
        };
        Ok(info)
    }
}

pub fn window(min_hz: f64, max_hz: f64) -> ServiceResult<FrequencyWindow> {
    FrequencyWindow::new(min_hz, max_hz).ok_or(ServiceError::InvalidWindow { min_hz, max_hz })
}
