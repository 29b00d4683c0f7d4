//! Rolling probe statistics.
//!
//! Lifetime sent/lost counters plus a bounded window of recent successful
//! latencies for the moving average. The window is cleared on every target
//! switch so the average never mixes routes; the counters survive switches.

use std::collections::VecDeque;

/// Point-in-time aggregate view of a monitoring session.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    /// Probes issued, successes and losses both.
    pub total: u64,
    /// Probes with no reply.
    pub lost: u64,
    /// Moving average over the latency window, rounded to 2 decimals.
    /// `None` while the window is empty.
    pub average_ms: Option<f64>,
    /// Lifetime loss percentage, rounded to 2 decimals. 0 before any probe.
    pub loss_rate_percent: f64,
}

/// Mutable statistics accumulator owned by the monitor.
#[derive(Debug)]
pub struct RollingStats {
    window: VecDeque<u64>,
    history_size: usize,
    // Running sum of the window; u128 so pathological latencies can't wrap.
    window_sum: u128,
    total: u64,
    lost: u64,
}

impl RollingStats {
    pub fn new(history_size: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(history_size),
            history_size,
            window_sum: 0,
            total: 0,
            lost: 0,
        }
    }

    /// Record a successful probe's latency.
    pub fn record_success(&mut self, latency_ms: u64) {
        self.total += 1;
        self.window.push_back(latency_ms);
        self.window_sum += u128::from(latency_ms);
        while self.window.len() > self.history_size {
            if let Some(evicted) = self.window.pop_front() {
                self.window_sum -= u128::from(evicted);
            }
        }
    }

    /// Record a lost probe.
    pub fn record_loss(&mut self) {
        self.total += 1;
        self.lost += 1;
    }

    /// Drop the latency window, keeping lifetime counters.
    pub fn clear_window(&mut self) {
        self.window.clear();
        self.window_sum = 0;
    }

    /// Lifetime probe count.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let average_ms = if self.window.is_empty() {
            None
        } else {
            Some(round2(self.window_sum as f64 / self.window.len() as f64))
        };
        let loss_rate_percent = if self.total == 0 {
            0.0
        } else {
            round2(self.lost as f64 * 100.0 / self.total as f64)
        };
        StatsSnapshot {
            total: self.total,
            lost: self.lost,
            average_ms,
            loss_rate_percent,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
