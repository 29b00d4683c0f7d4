//! Monitor event stream.
//!
//! Everything the monitor has to say flows through this one enum, in
//! emission order, over an mpsc channel. Consumers render; the monitor
//! never touches the terminal itself.

use crate::classify::FailureKind;
use crate::stats::StatsSnapshot;

/// One entry in the ordered event stream.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    /// Probe answered. `critical` marks replies at or above the critical
    /// latency threshold.
    Success {
        target: String,
        latency_ms: u64,
        ttl: u32,
        critical: bool,
    },
    /// Probe lost, with its classification. Emitted below the quiet threshold.
    Failure {
        target: String,
        kind: FailureKind,
        message: String,
    },
    /// Probe lost while in quiet mode; carries the running streak length.
    QuietUpdate { consecutive_losses: u64 },
    /// Periodic aggregate report.
    Stats(StatsSnapshot),
    /// Lost the primary; now probing the fallback.
    Failover { from: String, to: String },
    /// Background check confirmed the primary; probing it again.
    Failback { to: String },
    /// First reply after a quiet-mode loss streak.
    Recovered { target: String, after_losses: u64 },
}
