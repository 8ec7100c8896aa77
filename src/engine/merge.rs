//! Per-correlation merge task.
//!
//! # State Machine
//! ```text
//! AwaitingBoth ──exchange──▶ AwaitingSpan ──span──────▶ Merging ─▶ Done | Failed
//!      │        ──span─────▶ AwaitingExchange ─exchange─▶ Merging
//!      └──────── ttl-expired / slot vanished ─────────────────────▶ Expired
//! ```
//! The two halves may arrive in either order; whichever lands first waits
//! for the other. Every terminal transition runs the finalizer, which
//! removes both store entries, the hostname index entry and the registry
//! entry before publishing the terminal state.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tokio::time::Instant;

use crate::correlation::CorrelationId;
use crate::engine::republish::{republish, MergeSource};
use crate::engine::{EngineShared, ExchangeResult};
use crate::observability::metrics;
use crate::span::{Span, SpanId};

/// Lifecycle of one correlation id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeState {
    AwaitingBoth,
    AwaitingExchange,
    AwaitingSpan,
    Merging,
    /// Replacement span exported (enriched, or bare if the exchange vanished).
    Done,
    /// Exchange failed; replacement span exported with ERROR status.
    Failed,
    /// The span never arrived in time; nothing exported by the engine.
    Expired,
}

impl MergeState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MergeState::Done | MergeState::Failed | MergeState::Expired)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MergeState::AwaitingBoth => "awaiting_both",
            MergeState::AwaitingExchange => "awaiting_exchange",
            MergeState::AwaitingSpan => "awaiting_span",
            MergeState::Merging => "merging",
            MergeState::Done => "done",
            MergeState::Failed => "failed",
            MergeState::Expired => "expired",
        }
    }
}

/// Cleans up after a merge task, however it ends.
///
/// Built when the task is created rather than when it is first polled, so a
/// task dropped before running (runtime shutdown) still releases its entries.
pub(crate) struct Finalizer {
    id: CorrelationId,
    span_id: SpanId,
    shared: Arc<EngineShared>,
    state: watch::Sender<MergeState>,
    terminal: MergeState,
    registered_at: Instant,
}

impl Finalizer {
    pub(crate) fn new(
        id: CorrelationId,
        span_id: SpanId,
        shared: Arc<EngineShared>,
        state: watch::Sender<MergeState>,
    ) -> Self {
        Self {
            id,
            span_id,
            shared,
            state,
            // A task that unwinds or is dropped mid-flight counts as failed.
            terminal: MergeState::Failed,
            registered_at: Instant::now(),
        }
    }

    fn transition(&self, next: MergeState) {
        self.state.send_if_modified(|current| {
            let changed = *current != next;
            *current = next;
            changed
        });
    }

    fn settle(mut self, terminal: MergeState) {
        self.terminal = terminal;
    }
}

impl Drop for Finalizer {
    fn drop(&mut self) {
        self.shared.exchanges.delete(&self.id);
        self.shared.spans.delete(&self.span_id);
        self.shared.hostnames.remove(&self.id);
        self.shared.tasks.remove(&self.id);
        metrics::record_live_tasks(self.shared.tasks.len());
        metrics::record_merge(self.terminal.as_str(), self.registered_at.elapsed());

        tracing::debug!(
            correlation_id = %self.id,
            span_id = %self.span_id,
            state = self.terminal.as_str(),
            "Merge task settled"
        );
        // Published last so a drain that observes the terminal state also
        // observes the cleanup.
        self.state.send_replace(self.terminal);
    }
}

/// Awaits one exchange and one span, then republishes.
pub(crate) struct MergeTask {
    pub(crate) exchange_rx: oneshot::Receiver<ExchangeResult>,
    pub(crate) span_rx: oneshot::Receiver<Span>,
    pub(crate) deadline: Instant,
    pub(crate) finalizer: Finalizer,
}

impl MergeTask {
    pub(crate) async fn run(self) {
        let MergeTask {
            mut exchange_rx,
            mut span_rx,
            deadline,
            finalizer,
        } = self;

        let expiry = tokio::time::sleep_until(deadline);
        tokio::pin!(expiry);

        // Outer `Option`: has this half settled? Inner: did it carry a value
        // (`None` means its slot was dropped, e.g. by the sweeper).
        let mut exchange: Option<Option<ExchangeResult>> = None;
        let mut span: Option<Option<Span>> = None;

        loop {
            let next = match (&exchange, &span) {
                (_, Some(None)) => break,
                (Some(_), Some(Some(_))) => break,
                (None, None) => MergeState::AwaitingBoth,
                (Some(_), None) => MergeState::AwaitingSpan,
                (None, Some(Some(_))) => MergeState::AwaitingExchange,
            };
            finalizer.transition(next);

            tokio::select! {
                result = &mut exchange_rx, if exchange.is_none() => exchange = Some(result.ok()),
                result = &mut span_rx, if span.is_none() => span = Some(result.ok()),
                _ = &mut expiry => {
                    tracing::debug!(correlation_id = %finalizer.id, "Merge deadline elapsed");
                    break;
                }
            }
        }

        let Some(Some(span)) = span else {
            finalizer.settle(MergeState::Expired);
            return;
        };

        finalizer.transition(MergeState::Merging);
        let (replacement, terminal) = match exchange.flatten() {
            Some(Ok(record)) => (republish(&span, MergeSource::Exchange(&record)), MergeState::Done),
            Some(Err(failure)) => {
                tracing::debug!(correlation_id = %finalizer.id, error = %failure, "Exchange failed");
                (republish(&span, MergeSource::Failure(&failure)), MergeState::Failed)
            }
            None => {
                tracing::debug!(correlation_id = %finalizer.id, "Exchange unavailable, republishing span as-is");
                (republish(&span, MergeSource::Unavailable), MergeState::Done)
            }
        };

        finalizer.shared.exporter.export(replacement);
        finalizer.settle(terminal);
    }
}
