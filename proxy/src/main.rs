use anyhow::Context;
use clap::Parser;
use config::ProxyConfig;
use http_bridge::bridge::HttpBridge;
use log::info;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use wfcore::math::StatsHelper;
use wfcore::telemetry::MetricsRecorder;
use wfcore::WaterfallService;

mod config;
mod http_bridge;

#[derive(Parser)]
#[command(author, version, about = "Normalizing waterfall proxy for remote receivers")]
struct Args {
    /// Load proxy settings and the station list from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    /// Listen address; overrides the config file (default 127.0.0.1:9000)
    #[arg(long)]
    bind: Option<SocketAddr>,
    /// Samples per line; overrides the config file (default 512)
    #[arg(long)]
    bins: Option<usize>,
    /// Session tick in milliseconds; overrides the config file (default 33)
    #[arg(long)]
    tick_ms: Option<u64>,
    /// Probe one station and print its status report
    #[arg(long)]
    probe: Option<String>,
    /// Print a few lines from one station without serving
    #[arg(long)]
    sample: Option<String>,
    #[arg(long, default_value_t = 5)]
    sample_lines: usize,
    #[arg(long, default_value_t = 0.0)]
    min_hz: f64,
    #[arg(long, default_value_t = 30_000_000.0)]
    max_hz: f64,
    /// Never contact stations for waterfall rows
    #[arg(long, default_value_t = false)]
    synthetic: bool,
    /// Keep the HTTP/WebSocket bridge running until Ctrl+C
    #[arg(long, default_value_t = false)]
    serve: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let proxy_config = match args.config.as_ref() {
        Some(path) => ProxyConfig::load(path)?,
        None => ProxyConfig::default(),
    }
    .with_overrides(args.bind, args.bins, args.tick_ms);
    info!("{} stations configured", proxy_config.stations.len());

    let metrics = Arc::new(MetricsRecorder::new());
    let service = Arc::new(proxy_config.build_service(metrics.clone())?);

    if let Some(station_id) = args.probe.as_deref() {
        let report = service
            .status(station_id)
            .await
            .with_context(|| format!("probing {}", station_id))?;
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if let Some(station_id) = args.sample.as_deref() {
        print_sample(&service, station_id, &args).await?;
    }

    if args.serve {
        let bridge = HttpBridge::new(service.clone());
        let (addr, server) = bridge.bind(proxy_config.bind)?;
        info!("HTTP bridge listening on {} (Ctrl+C to stop)", addr);
        tokio::select! {
            _ = server => {}
            result = signal::ctrl_c() => result.context("awaiting Ctrl+C to exit")?,
        }
        let snapshot = metrics.snapshot();
        info!(
            "served {} sessions: {} station lines, {} simulated, {} dropped",
            snapshot.sessions_opened,
            snapshot.station_lines,
            snapshot.simulated_lines,
            snapshot.dropped_lines
        );
    }

    Ok(())
}

async fn print_sample(
    service: &WaterfallService,
    station_id: &str,
    args: &Args,
) -> anyhow::Result<()> {
    let (handle, mut lines) = service
        .open_session(station_id, args.min_hz, args.max_hz, !args.synthetic)
        .await
        .with_context(|| format!("opening session for {}", station_id))?;

    for _ in 0..args.sample_lines {
        let Some(line) = lines.recv().await else {
            break;
        };
        println!(
            "t={} start={:.0}Hz step={:.1}Hz bins={} origin={:?} mean={:.3} peak={:.3}",
            line.timestamp_millis,
            line.freq_start_hz,
            line.freq_step_hz,
            line.bins(),
            line.origin,
            StatsHelper::mean(&line.samples),
            StatsHelper::peak(&line.samples)
        );
    }

    handle.close();
    handle.join().await;
    Ok(())
}
