//! Failover-aware probing state machine.
//!
//! Probes one target per tick. Any loss while on the primary switches the
//! session to the fallback; only a successful background recovery check
//! switches it back. The probed target is always derived from the failover
//! flag, so target and state cannot drift apart.
//!
//! [`FailoverMonitor::tick`] runs one cycle and returns its events in
//! emission order, which keeps the whole state machine testable without a
//! terminal or a network. [`FailoverMonitor::run`] drives ticks at the
//! configured cadence until shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use crate::classify::classify;
use crate::config::MonitorConfig;
use crate::events::MonitorEvent;
use crate::probe::{ProbeFailure, ProbeReply, Prober};
use crate::recovery::{RecoveryCheck, RecoveryPoll};
use crate::stats::{RollingStats, StatsSnapshot};

/// Aggregate report cadence, in probes.
const STATS_EVERY: u64 = 10;
/// Primary attempts before the startup gate settles for the fallback.
const STARTUP_PRIMARY_ATTEMPTS: u32 = 3;
const STARTUP_PRIMARY_SPACING: Duration = Duration::from_secs(1);
const STARTUP_FALLBACK_SPACING: Duration = Duration::from_secs(2);

/// Which target the startup gate settled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialTarget {
    Primary,
    Fallback,
}

/// The monitoring session state machine.
pub struct FailoverMonitor {
    config: MonitorConfig,
    prober: Arc<dyn Prober>,
    on_fallback: bool,
    consecutive_losses: u64,
    quiet_mode: bool,
    recovery: Option<RecoveryCheck>,
    stats: RollingStats,
}

impl FailoverMonitor {
    pub fn new(config: MonitorConfig, prober: Arc<dyn Prober>, initial: InitialTarget) -> Self {
        let stats = RollingStats::new(config.history_size);
        Self {
            config,
            prober,
            on_fallback: initial == InitialTarget::Fallback,
            consecutive_losses: 0,
            quiet_mode: false,
            recovery: None,
            stats,
        }
    }

    /// Target the next probe goes to, derived from the failover flag.
    pub fn current_target(&self) -> &str {
        if self.on_fallback {
            &self.config.fallback_target
        } else {
            &self.config.primary_target
        }
    }

    pub fn on_fallback(&self) -> bool {
        self.on_fallback
    }

    pub fn consecutive_losses(&self) -> u64 {
        self.consecutive_losses
    }

    pub fn stats_snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Run one probe cycle and return its events in emission order.
    pub async fn tick(&mut self) -> Vec<MonitorEvent> {
        let mut events = Vec::new();

        self.drive_recovery(&mut events);

        let target = self.current_target().to_string();
        let reply = self
            .prober
            .probe(&target, self.config.interval(), self.config.payload_bytes)
            .await;
        match reply {
            ProbeReply::Reply { latency_ms, ttl } => {
                self.on_success(target, latency_ms, ttl, &mut events)
            }
            ProbeReply::Failed(failure) => self.on_loss(target, &failure, &mut events),
        }

        // Report every STATS_EVERY probes, but stay silent during a loss
        // streak. A suppressed report is skipped, never emitted late.
        if self.stats.total() % STATS_EVERY == 0 && self.consecutive_losses == 0 {
            events.push(MonitorEvent::Stats(self.stats.snapshot()));
        }

        events
    }

    /// Poll the in-flight recovery check and keep one outstanding while the
    /// session is on the fallback.
    ///
    /// The handle is taken out of its slot before polling: a completed check
    /// is spent and must never be polled again, so only a pending one goes
    /// back.
    fn drive_recovery(&mut self, events: &mut Vec<MonitorEvent>) {
        if !self.on_fallback {
            return;
        }
        if let Some(mut check) = self.recovery.take() {
            match check.poll() {
                RecoveryPoll::Pending => {
                    self.recovery = Some(check);
                }
                RecoveryPoll::Completed(true) => {
                    self.on_fallback = false;
                    self.stats.clear_window();
                    info!(
                        target = %self.config.primary_target,
                        "primary answered recovery check, switching back"
                    );
                    events.push(MonitorEvent::Failback {
                        to: self.config.primary_target.clone(),
                    });
                    return;
                }
                RecoveryPoll::Completed(false) => {
                    debug!(
                        target = %self.config.primary_target,
                        "recovery check found primary still down"
                    );
                }
            }
        }
        if self.recovery.is_none() {
            self.recovery = Some(RecoveryCheck::spawn(
                Arc::clone(&self.prober),
                self.config.primary_target.clone(),
                self.config.interval(),
                self.config.payload_bytes,
            ));
        }
    }

    fn on_success(
        &mut self,
        target: String,
        latency_ms: u64,
        ttl: u32,
        events: &mut Vec<MonitorEvent>,
    ) {
        if self.quiet_mode {
            info!(%target, after_losses = self.consecutive_losses, "connection restored");
            events.push(MonitorEvent::Recovered {
                target: target.clone(),
                after_losses: self.consecutive_losses,
            });
        }
        self.consecutive_losses = 0;
        self.quiet_mode = false;
        self.stats.record_success(latency_ms);

        let critical = latency_ms >= self.config.critical_ms;
        if critical {
            warn!(%target, latency_ms, critical_ms = self.config.critical_ms, "reply above critical latency");
        }
        events.push(MonitorEvent::Success {
            target,
            latency_ms,
            ttl,
            critical,
        });
    }

    fn on_loss(&mut self, target: String, failure: &ProbeFailure, events: &mut Vec<MonitorEvent>) {
        let (kind, message) = classify(failure);
        self.consecutive_losses += 1;
        self.stats.record_loss();

        if !self.on_fallback {
            self.on_fallback = true;
            self.stats.clear_window();
            warn!(
                from = %self.config.primary_target,
                to = %self.config.fallback_target,
                %message,
                "primary lost, switching to fallback"
            );
            events.push(MonitorEvent::Failover {
                from: self.config.primary_target.clone(),
                to: self.config.fallback_target.clone(),
            });
        }

        if !self.quiet_mode && self.consecutive_losses >= self.config.quiet_threshold {
            self.quiet_mode = true;
            info!(
                streak = self.consecutive_losses,
                "sustained losses, collapsing to quiet reporting"
            );
        }

        if self.quiet_mode {
            events.push(MonitorEvent::QuietUpdate {
                consecutive_losses: self.consecutive_losses,
            });
        } else {
            debug!(%target, ?kind, %message, "probe lost");
            events.push(MonitorEvent::Failure {
                target,
                kind,
                message,
            });
        }
    }

    /// Drive ticks at the configured cadence until shutdown, emitting events
    /// over `events`. Returns the final statistics snapshot.
    ///
    /// The cadence counts from tick start to tick start: a tick that took
    /// longer than the interval is followed immediately by the next one.
    pub async fn run(
        mut self,
        events: mpsc::Sender<MonitorEvent>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> StatsSnapshot {
        let interval = self.config.interval();
        loop {
            let started = Instant::now();
            let batch = tokio::select! {
                batch = self.tick() => batch,
                _ = shutdown.recv() => break,
            };
            for event in batch {
                if events.send(event).await.is_err() {
                    warn!("event consumer dropped, stopping monitor");
                    return self.stats.snapshot();
                }
            }
            let idle = interval.saturating_sub(started.elapsed());
            tokio::select! {
                _ = time::sleep(idle) => {}
                _ = shutdown.recv() => break,
            }
        }
        info!("monitor loop stopped");
        self.stats.snapshot()
    }
}

/// Startup gate: confirm some target answers before entering the tick loop.
///
/// Tries the primary a few times, then retries the fallback until it
/// answers. Gate probes never count toward session statistics.
pub async fn probe_until_ready(prober: &Arc<dyn Prober>, config: &MonitorConfig) -> InitialTarget {
    for attempt in 1..=STARTUP_PRIMARY_ATTEMPTS {
        if let ProbeReply::Reply { latency_ms, .. } = prober
            .probe(
                &config.primary_target,
                config.interval(),
                config.payload_bytes,
            )
            .await
        {
            info!(target = %config.primary_target, attempt, latency_ms, "primary target reachable");
            return InitialTarget::Primary;
        }
        debug!(target = %config.primary_target, attempt, "primary not answering");
        if attempt < STARTUP_PRIMARY_ATTEMPTS {
            time::sleep(STARTUP_PRIMARY_SPACING).await;
        }
    }

    warn!(
        primary = %config.primary_target,
        fallback = %config.fallback_target,
        "primary unreachable at startup, waiting for the fallback"
    );
    let mut attempt: u64 = 0;
    loop {
        attempt += 1;
        if let ProbeReply::Reply { latency_ms, .. } = prober
            .probe(
                &config.fallback_target,
                config.interval(),
                config.payload_bytes,
            )
            .await
        {
            info!(target = %config.fallback_target, attempt, latency_ms, "starting on the fallback target");
            return InitialTarget::Fallback;
        }
        debug!(target = %config.fallback_target, attempt, "fallback not answering, retrying");
        time::sleep(STARTUP_FALLBACK_SPACING).await;
    }
}
