use crate::fetch::LineProvider;
use crate::generator::{GeneratorConfig, SimulatedLineGenerator};
use crate::math::StatsHelper;
use crate::prelude::{FrequencyWindow, WaterfallLine};
use crate::telemetry::{LogManager, MetricsRecorder};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

/// Roughly 30 lines per second.
pub const DEFAULT_TICK: Duration = Duration::from_millis(33);

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub tick: Duration,
    pub bins: usize,
    /// Lines that may wait for the transport; further ticks are dropped.
    pub channel_capacity: usize,
    /// Shape of the fallback spectrum; each session seeds its own generator.
    pub generator: GeneratorConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick: DEFAULT_TICK,
            bins: 512,
            channel_capacity: 1,
            generator: GeneratorConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Streaming,
    Closed,
}

/// One observer's timer-driven stream of waterfall lines.
///
/// Each tick produces exactly one line: station data when `use_real` is set
/// and the fetch succeeds, generator output otherwise. Lines that the
/// consumer has no room for are dropped, never queued.
pub struct StreamSession {
    station_url: String,
    window: FrequencyWindow,
    use_real: bool,
    config: SessionConfig,
    provider: Arc<dyn LineProvider>,
    generator: SimulatedLineGenerator,
    metrics: Arc<MetricsRecorder>,
    state: Arc<watch::Sender<SessionState>>,
    logger: LogManager,
    degraded: bool,
}

impl StreamSession {
    pub fn new(
        station_url: impl Into<String>,
        window: FrequencyWindow,
        use_real: bool,
        config: SessionConfig,
        provider: Arc<dyn LineProvider>,
        metrics: Arc<MetricsRecorder>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        let generator = SimulatedLineGenerator::new(config.generator.clone());
        Self {
            station_url: station_url.into(),
            window,
            use_real,
            config,
            provider,
            generator,
            metrics,
            state: Arc::new(state),
            logger: LogManager::new("session"),
            degraded: false,
        }
    }

    pub fn with_generator(mut self, generator: SimulatedLineGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Starts ticking on the current tokio runtime.
    pub fn open(self) -> (SessionHandle, mpsc::Receiver<WaterfallLine>) {
        let (lines_tx, lines_rx) = mpsc::channel(self.config.channel_capacity.max(1));
        self.state.send_replace(SessionState::Streaming);
        self.metrics.record_session_opened();
        self.logger.record(&format!(
            "streaming {} {:.0}-{:.0} Hz every {:?} (real: {})",
            self.station_url,
            self.window.min_hz,
            self.window.max_hz,
            self.config.tick,
            self.use_real
        ));

        let state = self.state.clone();
        let task = tokio::spawn(self.run(lines_tx));
        (SessionHandle { state, task }, lines_rx)
    }

    /// Produces the line for one tick. Fetch failures are folded into
    /// generator output here and never leave this function.
    pub async fn next_line(&mut self) -> WaterfallLine {
        let attempt = if self.use_real {
            Some(
                self.provider
                    .fetch_line(&self.station_url, self.window, self.config.bins)
                    .await,
            )
        } else {
            None
        };

        match attempt {
            Some(Ok(line)) => {
                if self.degraded {
                    self.logger
                        .record(&format!("station data restored for {}", self.station_url));
                    self.degraded = false;
                }
                self.metrics.record_station_line();
                line
            }
            Some(Err(err)) => {
                if !self.degraded {
                    self.logger.degraded(&format!(
                        "simulating {} after fetch failure: {}",
                        self.station_url, err
                    ));
                    self.degraded = true;
                }
                self.simulated_line()
            }
            None => self.simulated_line(),
        }
    }

    fn simulated_line(&mut self) -> WaterfallLine {
        self.metrics.record_simulated_line();
        self.generator
            .generate(self.window.min_hz, self.window.max_hz, self.config.bins)
    }

    fn is_closed(&self) -> bool {
        *self.state.borrow() == SessionState::Closed
    }

    async fn run(mut self, lines: mpsc::Sender<WaterfallLine>) {
        let mut close_requests = self.state.subscribe();
        let mut ticker = time::interval(self.config.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = close_requests.changed() => {}
            }
            if self.is_closed() {
                break;
            }

            let line = self.next_line().await;
            // A close that arrived mid-fetch discards the result.
            if self.is_closed() {
                break;
            }

            self.logger.detail(&format!(
                "line mean {:.3} peak {:.3}",
                StatsHelper::mean(&line.samples),
                StatsHelper::peak(&line.samples)
            ));
            match lines.try_send(line) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => self.metrics.record_dropped_line(),
                Err(TrySendError::Closed(_)) => break,
            }
        }

        self.state.send_replace(SessionState::Closed);
        self.logger
            .record(&format!("session for {} closed", self.station_url));
    }
}

/// Control side of an open session.
#[derive(Debug)]
pub struct SessionHandle {
    state: Arc<watch::Sender<SessionState>>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Stops the timer. Idempotent; an in-flight fetch finishes and its line
    /// is discarded.
    pub fn close(&self) {
        self.state.send_replace(SessionState::Closed);
    }

    /// Waits for the session task to wind down.
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::{FetchError, FetchResult, LineOrigin};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::timeout;

    struct ScriptedProvider {
        calls: AtomicUsize,
        fail: bool,
    }

    impl ScriptedProvider {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LineProvider for ScriptedProvider {
        async fn fetch_line(
            &self,
            _station_url: &str,
            window: FrequencyWindow,
            bins: usize,
        ) -> FetchResult<WaterfallLine> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(FetchError::Unreachable("scripted outage".into()));
            }
            let mut line = WaterfallLine::stamped(window, vec![0.5; bins], LineOrigin::Station);
            line.timestamp_millis = call as i64;
            Ok(line)
        }
    }

    fn window() -> FrequencyWindow {
        FrequencyWindow::new(14_000_000.0, 14_350_000.0).unwrap()
    }

    fn session(
        provider: Arc<ScriptedProvider>,
        use_real: bool,
        capacity: usize,
    ) -> (StreamSession, Arc<MetricsRecorder>) {
        let metrics = Arc::new(MetricsRecorder::new());
        let config = SessionConfig {
            tick: Duration::from_millis(1),
            bins: 64,
            channel_capacity: capacity,
            ..Default::default()
        };
        let session = StreamSession::new(
            "http://station.example",
            window(),
            use_real,
            config,
            provider,
            metrics.clone(),
        )
        .with_generator(SimulatedLineGenerator::with_seed(5));
        (session, metrics)
    }

    async fn receive(rx: &mut mpsc::Receiver<WaterfallLine>) -> WaterfallLine {
        timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("line within deadline")
            .expect("session still open")
    }

    #[tokio::test]
    async fn synthetic_session_never_calls_provider() {
        let provider = ScriptedProvider::new(false);
        let (session, _) = session(provider.clone(), false, 8);
        let (handle, mut rx) = session.open();

        for _ in 0..5 {
            let line = receive(&mut rx).await;
            assert_eq!(line.origin, LineOrigin::Simulated);
            assert_eq!(line.samples.len(), 64);
        }
        handle.close();
        handle.join().await;
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn failing_fetches_fall_back_and_keep_ticking() {
        let provider = ScriptedProvider::new(true);
        let (session, metrics) = session(provider.clone(), true, 8);
        let (handle, mut rx) = session.open();

        for _ in 0..10 {
            let line = receive(&mut rx).await;
            assert_eq!(line.origin, LineOrigin::Simulated);
            assert_eq!(line.freq_step_hz, window().width_hz() / 64.0);
        }
        assert_eq!(handle.state(), SessionState::Streaming);
        assert!(provider.calls() >= 10);
        assert!(metrics.snapshot().simulated_lines >= 10);
        assert_eq!(metrics.snapshot().station_lines, 0);
        handle.close();
        handle.join().await;
    }

    #[tokio::test]
    async fn station_lines_arrive_in_tick_order() {
        let provider = ScriptedProvider::new(false);
        let (session, _) = session(provider, true, 64);
        let (handle, mut rx) = session.open();

        let mut previous = -1;
        for _ in 0..20 {
            let line = receive(&mut rx).await;
            assert_eq!(line.origin, LineOrigin::Station);
            assert!(line.timestamp_millis > previous);
            previous = line.timestamp_millis;
        }
        handle.close();
        handle.join().await;
    }

    #[tokio::test]
    async fn close_stops_the_stream() {
        let (session, _) = session(ScriptedProvider::new(false), false, 4);
        assert_eq!(session.state(), SessionState::Idle);
        let (handle, mut rx) = session.open();
        receive(&mut rx).await;

        handle.close();
        handle.close();
        assert_eq!(handle.state(), SessionState::Closed);
        handle.join().await;
        let drained = timeout(Duration::from_secs(5), async {
            while rx.recv().await.is_some() {}
        })
        .await;
        assert!(drained.is_ok());
    }

    #[tokio::test]
    async fn dropped_receiver_closes_session() {
        let (session, _) = session(ScriptedProvider::new(false), false, 1);
        let (handle, rx) = session.open();
        drop(rx);
        let state = handle.state.clone();
        timeout(Duration::from_secs(5), handle.join())
            .await
            .expect("session ends once the consumer is gone");
        assert_eq!(*state.borrow(), SessionState::Closed);
    }

    #[tokio::test]
    async fn full_channel_drops_instead_of_queueing() {
        let (session, metrics) = session(ScriptedProvider::new(false), false, 1);
        let (handle, mut rx) = session.open();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(metrics.snapshot().dropped_lines > 0);
        receive(&mut rx).await;
        receive(&mut rx).await;
        handle.close();
        handle.join().await;
    }

    #[tokio::test]
    async fn next_line_folds_failure_into_generator_output() {
        let provider = ScriptedProvider::new(true);
        let (mut session, metrics) = session(provider.clone(), true, 1);

        let line = session.next_line().await;
        assert_eq!(line.origin, LineOrigin::Simulated);
        assert_eq!(line.samples.len(), 64);
        assert_eq!(provider.calls(), 1);
        assert_eq!(metrics.snapshot().simulated_lines, 1);
    }

    #[tokio::test]
    async fn generator_shape_comes_from_session_config() {
        let config = SessionConfig {
            bins: 32,
            generator: GeneratorConfig {
                noise_floor: (0.0, 0.0),
                jitter: 0.0,
                clusters: Vec::new(),
                digital_strength: (0.0, 0.0),
                cw_probability: 0.0,
                transient_probability: 0.0,
                seed: Some(9),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut session = StreamSession::new(
            "http://station.example",
            window(),
            false,
            config,
            ScriptedProvider::new(false),
            Arc::new(MetricsRecorder::new()),
        );

        let line = session.next_line().await;
        assert_eq!(line.samples.len(), 32);
        assert!(line.samples.iter().all(|v| *v == 0.0));
    }

    #[tokio::test]
    async fn session_handle_is_debuggable() {
        let (session, _) = session(ScriptedProvider::new(false), false, 1);
        let (handle, _rx) = session.open();
        assert!(format!("{:?}", handle).contains("SessionHandle"));
        handle.close();
        handle.join().await;
    }
}
