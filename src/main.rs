//! linkmon - failover-aware reachability monitor
//!
//! Probes a primary target at a fixed cadence and renders a live colorized
//! report. When the primary stops answering, the session fails over to a
//! stable fallback target and keeps checking the primary in the background,
//! failing back as soon as it recovers.
//!
//! Usage:
//!   linkmon                         # defaults: 1.1.1.1 with 8.8.8.8 fallback
//!   linkmon 192.168.1.1             # monitor a specific host
//!   linkmon --config linkmon.toml   # load settings from a file
//!   linkmon 10.0.0.1 --interval-ms 500 --critical-ms 80 --mute
//!
//! Environment:
//!   LINKMON_CONFIG       - config file path
//!   LINKMON_FALLBACK     - fallback target
//!   LINKMON_INTERVAL_MS  - probe cadence / timeout in ms
//!   LINKMON_CRITICAL_MS  - critical latency threshold in ms
//!   LINKMON_LOG_LEVEL    - diagnostic log filter (stderr)

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use linkmon::config::MonitorConfig;
use linkmon::console::Console;
use linkmon::monitor::{probe_until_ready, FailoverMonitor};
use linkmon::ping::PingProber;
use linkmon::probe::Prober;

#[derive(Parser, Debug)]
#[command(name = "linkmon")]
#[command(about = "Failover-aware reachability monitor with live console reporting")]
struct Args {
    /// Primary target to monitor (overrides the config file)
    target: Option<String>,

    /// Path to TOML configuration file
    #[arg(short, long, env = "LINKMON_CONFIG")]
    config: Option<PathBuf>,

    /// Fallback target probed after failover
    #[arg(long, env = "LINKMON_FALLBACK")]
    fallback: Option<String>,

    /// Probe cadence and per-probe timeout in milliseconds
    #[arg(long, env = "LINKMON_INTERVAL_MS")]
    interval_ms: Option<u64>,

    /// Round-trip time flagged as critical, in milliseconds
    #[arg(long, env = "LINKMON_CRITICAL_MS")]
    critical_ms: Option<u64>,

    /// Moving-average window length, in probes
    #[arg(long)]
    history_size: Option<usize>,

    /// Echo payload size in bytes
    #[arg(long)]
    payload_bytes: Option<u16>,

    /// Disable the terminal bell
    #[arg(long)]
    mute: bool,

    /// Log filter for stderr diagnostics (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", env = "LINKMON_LOG_LEVEL")]
    log_level: String,
}

impl Args {
    /// Layer CLI/env overrides on top of the file config.
    fn apply(&self, config: &mut MonitorConfig) {
        if let Some(target) = &self.target {
            config.primary_target = target.clone();
        }
        if let Some(fallback) = &self.fallback {
            config.fallback_target = fallback.clone();
        }
        if let Some(interval_ms) = self.interval_ms {
            config.interval_ms = interval_ms;
        }
        if let Some(critical_ms) = self.critical_ms {
            config.critical_ms = critical_ms;
        }
        if let Some(history_size) = self.history_size {
            config.history_size = history_size;
        }
        if let Some(payload_bytes) = self.payload_bytes {
            config.payload_bytes = payload_bytes;
        }
        if self.mute {
            config.mute = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Diagnostics on stderr; stdout belongs to the live console.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &args.config {
        Some(path) => {
            info!(path = %path.display(), "loading config file");
            MonitorConfig::load(path).await?
        }
        None => MonitorConfig::default(),
    };
    args.apply(&mut config);
    config.validate()?;

    info!(
        primary = %config.primary_target,
        fallback = %config.fallback_target,
        interval_ms = config.interval_ms,
        critical_ms = config.critical_ms,
        history_size = config.history_size,
        "starting linkmon"
    );

    let prober: Arc<dyn Prober> = Arc::new(PingProber::new());

    // Startup gate: do not enter the tick loop until somebody answers.
    let initial = tokio::select! {
        initial = probe_until_ready(&prober, &config) => initial,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted before any target answered");
            return Ok(());
        }
    };

    let (event_tx, mut event_rx) = mpsc::channel(64);
    let (shutdown_tx, _) = broadcast::channel(1);

    let monitor = FailoverMonitor::new(config.clone(), prober, initial);
    let monitor_task = tokio::spawn(monitor.run(event_tx, shutdown_tx.subscribe()));

    let mute = config.mute;
    let console_task = tokio::spawn(async move {
        let mut console = Console::new(mute);
        while let Some(event) = event_rx.recv().await {
            if let Err(e) = console.render(&event) {
                warn!(error = %e, "console write failed, stopping renderer");
                break;
            }
        }
        console
    });

    tokio::signal::ctrl_c().await?;
    info!("received Ctrl+C, shutting down");
    let _ = shutdown_tx.send(());

    // Monitor returns the final numbers; the console drains before summary.
    let final_stats = monitor_task.await?;
    let mut console = console_task.await?;
    console.render_summary(&final_stats)?;

    Ok(())
}
