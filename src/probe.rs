//! Probe transport contract.
//!
//! A [`Prober`] performs one echo probe against a named target and always
//! comes back with a [`ProbeReply`]. Transport problems are data, not
//! errors, so the monitor's decision logic never sees an `Err`.

use std::time::Duration;

use async_trait::async_trait;

/// Raw transport status strings, as understood by the failure classifier.
///
/// The vocabulary is open: a transport may report statuses outside this
/// list, which the classifier folds into its unlisted-error path.
pub mod status {
    pub const TIMED_OUT: &str = "TimedOut";
    pub const DEST_HOST_UNREACHABLE: &str = "DestinationHostUnreachable";
    pub const DEST_NET_UNREACHABLE: &str = "DestinationNetworkUnreachable";
    pub const BAD_ROUTE: &str = "BadRoute";
    pub const TTL_EXPIRED: &str = "TtlExpired";
    pub const HARDWARE_ERROR: &str = "HardwareError";
    pub const PACKET_TOO_BIG: &str = "PacketTooBig";
}

/// Outcome of a single probe attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeReply {
    /// The target answered. `ttl` is 0 when the transport could not report one.
    Reply { latency_ms: u64, ttl: u32 },
    /// No answer; carries whatever the transport knows about why.
    Failed(ProbeFailure),
}

/// Raw failure details from the transport, before classification.
///
/// Either a named status string, an exception message, or (rarely) neither.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeFailure {
    pub status: Option<String>,
    pub exception: Option<String>,
}

impl ProbeFailure {
    /// Failure identified by a transport status string.
    pub fn from_status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            exception: None,
        }
    }

    /// Failure with only an exception message, no status available.
    pub fn from_exception(message: impl Into<String>) -> Self {
        Self {
            status: None,
            exception: Some(message.into()),
        }
    }
}

/// One-shot echo probe against a named target.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Probe `target` once with `payload_bytes` of payload.
    ///
    /// Resolves within `timeout` wall-clock time. Transport-level problems
    /// (timeouts, unreachable hosts, spawn failures, resolution failures)
    /// are reported inside the reply, never as a panic or error.
    async fn probe(&self, target: &str, timeout: Duration, payload_bytes: u16) -> ProbeReply;
}
