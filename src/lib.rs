//! linkmon library
//!
//! Failover-aware reachability monitor: probes a primary target, switches
//! to a stable fallback when the primary stops answering, and switches back
//! once a background check sees the primary recover. The state machine in
//! [`monitor`] is pure of I/O concerns apart from the [`probe::Prober`]
//! seam, which is what the binary and the tests plug into.

pub mod classify;
pub mod config;
pub mod console;
pub mod events;
pub mod monitor;
pub mod ping;
pub mod probe;
pub mod recovery;
pub mod stats;

pub use config::MonitorConfig;
pub use events::MonitorEvent;
pub use monitor::{FailoverMonitor, InitialTarget};
