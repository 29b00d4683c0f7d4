//! Monitor configuration.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Largest payload the transport will accept, in bytes.
pub const MAX_PAYLOAD_BYTES: u16 = 65500;

/// Monitor settings, loadable from a TOML file with CLI overrides on top.
/// Missing keys fall back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Host the session is about.
    pub primary_target: String,
    /// Highly-stable host probed instead after the primary is lost.
    pub fallback_target: String,
    /// Probe cadence; doubles as the per-probe timeout.
    pub interval_ms: u64,
    /// Replies at or above this round-trip time are flagged critical.
    pub critical_ms: u64,
    /// Number of recent successful latencies in the moving-average window.
    pub history_size: usize,
    /// Echo payload size in bytes.
    pub payload_bytes: u16,
    /// Disable the terminal bell on failures.
    pub mute: bool,
    /// Consecutive losses before per-probe reporting collapses to a single
    /// updating line.
    pub quiet_threshold: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            primary_target: "1.1.1.1".to_string(),
            fallback_target: "8.8.8.8".to_string(),
            interval_ms: 1000,   // 1s
            critical_ms: 150,    // 150ms
            history_size: 10,
            payload_bytes: 32,
            mute: false,
            quiet_threshold: 10,
        }
    }
}

impl MonitorConfig {
    /// Load from a TOML file.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Probe cadence and per-probe timeout.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Reject settings the monitor cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.primary_target.trim().is_empty() {
            bail!("primary_target must not be empty");
        }
        if self.fallback_target.trim().is_empty() {
            bail!("fallback_target must not be empty");
        }
        if self.interval_ms == 0 {
            bail!("interval_ms must be greater than zero");
        }
        if self.critical_ms == 0 {
            bail!("critical_ms must be greater than zero");
        }
        if self.history_size == 0 {
            bail!("history_size must be greater than zero");
        }
        if self.quiet_threshold == 0 {
            bail!("quiet_threshold must be greater than zero");
        }
        if self.payload_bytes > MAX_PAYLOAD_BYTES {
            bail!(
                "payload_bytes must be at most {} (got {})",
                MAX_PAYLOAD_BYTES,
                self.payload_bytes
            );
        }
        Ok(())
    }
}
