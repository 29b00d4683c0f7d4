//! System `ping` transport.
//!
//! Shells out to the platform `ping` binary for a single echo request and
//! scrapes the round-trip time and TTL out of its output. Using the system
//! binary avoids needing raw-socket privileges.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time;
use tracing::trace;

use crate::probe::{status, ProbeFailure, ProbeReply, Prober};

/// [`Prober`] implementation backed by the system `ping` binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct PingProber;

impl PingProber {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Prober for PingProber {
    async fn probe(&self, target: &str, timeout: Duration, payload_bytes: u16) -> ProbeReply {
        let mut cmd = Command::new("ping");
        cmd.args(ping_args(target, timeout, payload_bytes))
            .stdin(Stdio::null())
            .kill_on_drop(true);
        trace!(%target, ?timeout, payload_bytes, "spawning ping");

        // Outer timeout is the hard wall-clock cap; ping's own -W deadline
        // usually fires first.
        let output = match time::timeout(timeout, cmd.output()).await {
            Err(_) => return ProbeReply::Failed(ProbeFailure::from_status(status::TIMED_OUT)),
            Ok(Err(e)) => {
                return ProbeReply::Failed(ProbeFailure::from_exception(format!(
                    "failed to run ping: {e}"
                )))
            }
            Ok(Ok(output)) => output,
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if output.status.success() {
            match parse_reply(&stdout) {
                Some((latency_ms, ttl)) => ProbeReply::Reply { latency_ms, ttl },
                None => ProbeReply::Failed(ProbeFailure::from_exception(format!(
                    "unrecognized ping output for {target}"
                ))),
            }
        } else {
            ProbeReply::Failed(failure_from_output(
                output.status.code(),
                &stdout,
                &stderr,
            ))
        }
    }
}

/// Argument list for one echo request. `-W` takes seconds on Linux and
/// milliseconds on macOS.
fn ping_args(target: &str, timeout: Duration, payload_bytes: u16) -> Vec<String> {
    let mut args = vec![
        "-c".to_string(),
        "1".to_string(),
        "-s".to_string(),
        payload_bytes.to_string(),
    ];
    #[cfg(target_os = "macos")]
    args.extend([
        "-W".to_string(),
        timeout.as_millis().max(1).to_string(),
    ]);
    #[cfg(not(target_os = "macos"))]
    args.extend(["-W".to_string(), timeout.as_secs().max(1).to_string()]);
    args.push(target.to_string());
    args
}

/// Extract `(latency_ms, ttl)` from successful ping output.
fn parse_reply(output: &str) -> Option<(u64, u32)> {
    let latency_ms = parse_rtt_ms(output)?;
    // TTL is informational; 0 when the line doesn't carry one.
    let ttl = parse_ttl(output).unwrap_or(0);
    Some((latency_ms, ttl))
}

/// Parse the `time=1.23 ms` fragment into whole milliseconds, rounded.
fn parse_rtt_ms(output: &str) -> Option<u64> {
    let start = output.find("time=")?;
    let rest = &output[start + 5..];
    let end = rest.find("ms")?;
    let value: f64 = rest[..end].trim().parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(value.round() as u64)
}

/// Parse the `ttl=57` fragment, case-insensitively.
fn parse_ttl(output: &str) -> Option<u32> {
    let lower = output.to_ascii_lowercase();
    let start = lower.find("ttl=")?;
    let rest = &lower[start + 4..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}

/// Map non-zero ping exits to a raw failure.
///
/// Marker lines in the output take priority; a plain exit 1 with no marker
/// is ping's "no reply before the deadline".
fn failure_from_output(code: Option<i32>, stdout: &str, stderr: &str) -> ProbeFailure {
    let haystack = format!("{stdout}\n{stderr}").to_ascii_lowercase();

    if haystack.contains("destination host unreachable") {
        return ProbeFailure::from_status(status::DEST_HOST_UNREACHABLE);
    }
    if haystack.contains("destination net unreachable")
        || haystack.contains("network is unreachable")
        || haystack.contains("network unreachable")
    {
        return ProbeFailure::from_status(status::DEST_NET_UNREACHABLE);
    }
    if haystack.contains("time to live exceeded") || haystack.contains("ttl expired") {
        return ProbeFailure::from_status(status::TTL_EXPIRED);
    }
    if haystack.contains("packet too big")
        || haystack.contains("message too long")
        || haystack.contains("frag needed")
    {
        return ProbeFailure::from_status(status::PACKET_TOO_BIG);
    }
    if haystack.contains("unknown host")
        || haystack.contains("name or service not known")
        || haystack.contains("failure in name resolution")
        || haystack.contains("cannot resolve")
    {
        let detail = first_line(stderr).unwrap_or("name resolution failed");
        return ProbeFailure::from_exception(detail);
    }

    if code == Some(1) {
        return ProbeFailure::from_status(status::TIMED_OUT);
    }
    if let Some(line) = first_line(stderr) {
        // Unrecognized ping error; hand the raw line to the classifier.
        return ProbeFailure::from_status(line);
    }
    ProbeFailure::default()
}

fn first_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).find(|l| !l.is_empty())
}
