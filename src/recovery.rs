//! Background primary-recovery probing.
//!
//! While the monitor sits on the fallback target, it keeps exactly one
//! [`RecoveryCheck`] in flight against the primary. The check lives on its
//! own task and reports through a oneshot channel, so polling from the tick
//! loop never blocks and no lock is involved.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::probe::{ProbeReply, Prober};

/// Echo attempts per check; the primary counts as recovered on the first reply.
const RECOVERY_ATTEMPTS: u32 = 2;

/// Result of polling an in-flight recovery check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryPoll {
    /// Still probing; poll again next tick.
    Pending,
    /// Finished; `true` means the primary answered.
    Completed(bool),
}

/// Handle to one background probe of the primary target.
///
/// Single-use: once [`poll`](Self::poll) has returned
/// [`RecoveryPoll::Completed`], the handle must be discarded. Dropping it
/// aborts the underlying task.
#[derive(Debug)]
pub struct RecoveryCheck {
    result_rx: oneshot::Receiver<bool>,
    task: Option<JoinHandle<()>>,
    consumed: bool,
}

impl RecoveryCheck {
    /// Spawn a check against `target`.
    pub fn spawn(
        prober: Arc<dyn Prober>,
        target: String,
        timeout: Duration,
        payload_bytes: u16,
    ) -> Self {
        let (result_tx, result_rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            let mut reachable = false;
            for attempt in 1..=RECOVERY_ATTEMPTS {
                match prober.probe(&target, timeout, payload_bytes).await {
                    ProbeReply::Reply { latency_ms, .. } => {
                        debug!(%target, attempt, latency_ms, "recovery probe answered");
                        reachable = true;
                        break;
                    }
                    ProbeReply::Failed(_) => {
                        debug!(%target, attempt, "recovery probe unanswered");
                    }
                }
            }
            // Receiver may already be gone if the monitor shut down.
            let _ = result_tx.send(reachable);
        });
        Self {
            result_rx,
            task: Some(task),
            consumed: false,
        }
    }

    /// Non-blocking poll.
    ///
    /// # Panics
    ///
    /// Panics if called again after returning [`RecoveryPoll::Completed`];
    /// the result channel is read-once and the handle is spent.
    pub fn poll(&mut self) -> RecoveryPoll {
        assert!(
            !self.consumed,
            "recovery check polled after completion"
        );
        match self.result_rx.try_recv() {
            Ok(reachable) => {
                self.consumed = true;
                RecoveryPoll::Completed(reachable)
            }
            Err(oneshot::error::TryRecvError::Empty) => RecoveryPoll::Pending,
            Err(oneshot::error::TryRecvError::Closed) => {
                // Task died without reporting; treat as not recovered.
                self.consumed = true;
                RecoveryPoll::Completed(false)
            }
        }
    }

    #[cfg(test)]
    fn from_receiver(result_rx: oneshot::Receiver<bool>) -> Self {
        Self {
            result_rx,
            task: None,
            consumed: false,
        }
    }
}

impl Drop for RecoveryCheck {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_poll_pending_until_result_sent() {
        let (tx, rx) = oneshot::channel();
        let mut check = RecoveryCheck::from_receiver(rx);
        assert_eq!(check.poll(), RecoveryPoll::Pending);
        assert_eq!(check.poll(), RecoveryPoll::Pending, "pending may be polled repeatedly");
        tx.send(true).unwrap();
        assert_eq!(check.poll(), RecoveryPoll::Completed(true));
    }

    #[tokio::test]
    #[should_panic(expected = "polled after completion")]
    async fn test_poll_after_completion_panics() {
        let (tx, rx) = oneshot::channel();
        let mut check = RecoveryCheck::from_receiver(rx);
        tx.send(false).unwrap();
        assert_eq!(check.poll(), RecoveryPoll::Completed(false));
        check.poll();
    }

    #[tokio::test]
    async fn test_dropped_sender_reads_as_not_recovered() {
        let (tx, rx) = oneshot::channel::<bool>();
        let mut check = RecoveryCheck::from_receiver(rx);
        drop(tx);
        assert_eq!(check.poll(), RecoveryPoll::Completed(false));
    }

    struct CountingProber {
        calls: AtomicU32,
        replies_from_call: u32,
    }

    #[async_trait]
    impl Prober for CountingProber {
        async fn probe(&self, _target: &str, _timeout: Duration, _payload: u16) -> ProbeReply {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call >= self.replies_from_call {
                ProbeReply::Reply { latency_ms: 5, ttl: 60 }
            } else {
                ProbeReply::Failed(crate::probe::ProbeFailure::from_status(
                    crate::probe::status::TIMED_OUT,
                ))
            }
        }
    }

    #[tokio::test]
    async fn test_spawn_stops_after_first_reply() {
        let prober = Arc::new(CountingProber {
            calls: AtomicU32::new(0),
            replies_from_call: 1,
        });
        let mut check = RecoveryCheck::spawn(
            prober.clone() as Arc<dyn Prober>,
            "10.0.0.1".to_string(),
            Duration::from_millis(100),
            32,
        );
        let result = loop {
            match check.poll() {
                RecoveryPoll::Pending => tokio::time::sleep(Duration::from_millis(2)).await,
                RecoveryPoll::Completed(reachable) => break reachable,
            }
        };
        assert!(result, "first attempt replied, check should report recovered");
        assert_eq!(
            prober.calls.load(Ordering::SeqCst),
            1,
            "no second attempt after a reply"
        );
    }

    #[tokio::test]
    async fn test_spawn_reports_unreachable_after_all_attempts() {
        let prober = Arc::new(CountingProber {
            calls: AtomicU32::new(0),
            replies_from_call: u32::MAX,
        });
        let mut check = RecoveryCheck::spawn(
            prober.clone() as Arc<dyn Prober>,
            "10.0.0.1".to_string(),
            Duration::from_millis(100),
            32,
        );
        let result = loop {
            match check.poll() {
                RecoveryPoll::Pending => tokio::time::sleep(Duration::from_millis(2)).await,
                RecoveryPoll::Completed(reachable) => break reachable,
            }
        };
        assert!(!result);
        assert_eq!(prober.calls.load(Ordering::SeqCst), RECOVERY_ATTEMPTS);
    }
}
