//! Best-effort drain of in-flight merge tasks.

use futures_util::future::join_all;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::watch;

use crate::engine::merge::MergeState;

/// Result of a drain attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum FlushOutcome {
    /// Every task in the snapshot settled.
    Flushed,
    /// The timeout elapsed first; `pending` tasks were abandoned.
    TimedOut { pending: usize },
}

/// Wait until every watched task reaches a terminal state or `timeout` elapses.
///
/// A closed channel counts as settled: its task is gone.
pub(crate) async fn drain(tasks: Vec<watch::Receiver<MergeState>>, timeout: Duration) -> FlushOutcome {
    if tasks.is_empty() {
        return FlushOutcome::Flushed;
    }

    let waits = tasks.iter().cloned().map(|mut rx| async move {
        let _ = rx.wait_for(MergeState::is_terminal).await;
    });

    match tokio::time::timeout(timeout, join_all(waits)).await {
        Ok(_) => FlushOutcome::Flushed,
        Err(_) => {
            let pending = tasks
                .iter()
                .filter(|rx| !rx.borrow().is_terminal() && rx.has_changed().is_ok())
                .count();
            tracing::warn!(pending, timeout_ms = timeout.as_millis() as u64, "Drain timed out");
            if pending == 0 {
                FlushOutcome::Flushed
            } else {
                FlushOutcome::TimedOut { pending }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_snapshot_flushes_immediately() {
        assert_eq!(drain(Vec::new(), Duration::from_millis(1)).await, FlushOutcome::Flushed);
    }

    #[tokio::test]
    async fn test_waits_for_terminal_state() {
        let (tx, rx) = watch::channel(MergeState::AwaitingBoth);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            tx.send_replace(MergeState::Done);
            // Keep the sender alive past the transition.
            tokio::time::sleep(Duration::from_millis(20)).await;
        });

        assert_eq!(drain(vec![rx], Duration::from_secs(5)).await, FlushOutcome::Flushed);
    }

    #[tokio::test]
    async fn test_closed_channel_counts_as_settled() {
        let (tx, rx) = watch::channel(MergeState::AwaitingSpan);
        drop(tx);
        assert_eq!(drain(vec![rx], Duration::from_secs(5)).await, FlushOutcome::Flushed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_on_stuck_task() {
        let (_tx, rx) = watch::channel(MergeState::AwaitingExchange);
        let (_tx2, done) = watch::channel(MergeState::Done);

        let outcome = drain(vec![rx, done], Duration::from_millis(100)).await;
        assert_eq!(outcome, FlushOutcome::TimedOut { pending: 1 });
    }
}
