//! Probe failure classification.
//!
//! Folds raw transport failure details into a small set of semantic kinds
//! plus an operator-facing message. Total: every possible input maps to a
//! defined pair, including statuses nobody has heard of.

use crate::probe::{status, ProbeFailure};

/// Semantic category of a lost probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No reply within the deadline.
    TimedOut,
    /// An intermediate hop reported the host unreachable.
    HostUnreachable,
    /// Some other network-level delivery problem.
    NetworkError,
    /// Nothing usable to classify on.
    Unknown,
}

/// Classify a raw failure into `(kind, message)`.
///
/// Status takes priority over exception; an unrecognized status is still
/// surfaced verbatim rather than swallowed.
pub fn classify(failure: &ProbeFailure) -> (FailureKind, String) {
    if let Some(raw) = failure.status.as_deref() {
        return match raw {
            status::TIMED_OUT => (FailureKind::TimedOut, "Request timed out".to_string()),
            status::DEST_HOST_UNREACHABLE => (
                FailureKind::HostUnreachable,
                "Destination host unreachable".to_string(),
            ),
            status::DEST_NET_UNREACHABLE => (
                FailureKind::NetworkError,
                "Destination network unreachable".to_string(),
            ),
            status::BAD_ROUTE => (FailureKind::NetworkError, "Bad network route".to_string()),
            status::TTL_EXPIRED => (
                FailureKind::NetworkError,
                "TTL expired in transit".to_string(),
            ),
            status::HARDWARE_ERROR => (
                FailureKind::NetworkError,
                "Network hardware error".to_string(),
            ),
            status::PACKET_TOO_BIG => {
                (FailureKind::NetworkError, "Packet too big".to_string())
            }
            other => (FailureKind::Unknown, format!("Unlisted error: {other}")),
        };
    }
    if failure.exception.is_some() {
        return (
            FailureKind::NetworkError,
            "Network error (Exception)".to_string(),
        );
    }
    (FailureKind::Unknown, "Indeterminate error".to_string())
}
