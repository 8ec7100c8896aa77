//! Correlation engine.
//!
//! # Data Flow
//! ```text
//! request hook (on_span_start)
//!     → live-task registry + exchange slot + span slot
//!     → merge.rs task spawned
//!
//! interceptor events              span end (on_span_end)
//!     → exchange slot resolved        → original suppressed, span slot resolved
//!                 ↘                 ↙
//!                  merge.rs (awaits both, any order)
//!                     → republish.rs (replacement span)
//!                     → SpanExporter
//!
//! force_flush / shutdown
//!     → drain.rs (bounded wait on the live registry)
//! ```
//!
//! # Design Decisions
//! - One engine instance owns all state; nothing is process-global
//! - Registration is rejected, never queued, when an id is already pending
//! - Expiry is silent: a call whose state vanished is simply not enriched

pub mod drain;
pub mod error;
pub mod hooks;
pub mod merge;
pub mod republish;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::config::EngineConfig;
use crate::correlation::{CorrelationId, HostnameIndex, TtlMap};
use crate::interceptor::headers::find;
use crate::interceptor::{ExchangeFailure, ExchangeRecord, InboundResponse, OutboundRequest, RawHeaders};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::span::{Span, SpanExporter, SpanId};

pub use drain::FlushOutcome;
pub use error::CorrelationError;
pub use hooks::{SpanDisposition, SpanHooks};
pub use merge::MergeState;

pub(crate) type ExchangeResult = Result<ExchangeRecord, ExchangeFailure>;

/// Pending exchange completion.
pub(crate) struct ExchangeSlot {
    request_body: Option<String>,
    resolver: Option<oneshot::Sender<ExchangeResult>>,
}

/// Pending span completion.
pub(crate) struct SpanSlot {
    resolver: Option<oneshot::Sender<Span>>,
}

/// Live-task registry entry.
pub(crate) struct TaskEntry {
    span_id: SpanId,
    state: watch::Receiver<MergeState>,
}

/// State shared between the engine and its merge tasks.
pub(crate) struct EngineShared {
    pub(crate) exchanges: TtlMap<CorrelationId, ExchangeSlot>,
    pub(crate) spans: TtlMap<SpanId, SpanSlot>,
    pub(crate) hostnames: HostnameIndex,
    pub(crate) tasks: DashMap<CorrelationId, TaskEntry>,
    pub(crate) exporter: Arc<dyn SpanExporter>,
}

/// Point-in-time view of the engine, for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    pub pending_exchanges: usize,
    pub pending_spans: usize,
    pub live_tasks: usize,
    pub states: BTreeMap<&'static str, usize>,
    pub hostnames: BTreeMap<String, usize>,
    pub shut_down: bool,
}

/// Joins outbound exchanges to their client spans and republishes enriched spans.
pub struct CorrelationEngine {
    shared: Arc<EngineShared>,
    runtime: Handle,
    shutdown: Shutdown,
    sweeper: Mutex<Option<JoinHandle<()>>>,
    retention: Duration,
    sweep_interval: Duration,
    flush_timeout: Duration,
    header: String,
}

impl CorrelationEngine {
    /// Create an engine exporting replacement spans to `exporter`.
    ///
    /// Must be called from within a tokio runtime; merge tasks and the
    /// expiry sweeper are spawned onto it.
    pub fn new(config: &EngineConfig, exporter: Arc<dyn SpanExporter>) -> Result<Self, CorrelationError> {
        let runtime = Handle::try_current().map_err(|_| CorrelationError::NoRuntime)?;

        let shared = Arc::new(EngineShared {
            exchanges: TtlMap::new(),
            spans: TtlMap::new(),
            hostnames: HostnameIndex::new(),
            tasks: DashMap::new(),
            exporter,
        });

        let shutdown = Shutdown::new();
        let sweeper = runtime.spawn(run_sweeper(
            shared.clone(),
            config.sweep_interval(),
            shutdown.subscribe(),
        ));

        tracing::info!(
            retention_secs = config.retention_secs,
            header = %config.correlation_header,
            "Correlation engine started"
        );

        Ok(Self {
            shared,
            runtime,
            shutdown,
            sweeper: Mutex::new(Some(sweeper)),
            retention: config.retention(),
            sweep_interval: config.sweep_interval(),
            flush_timeout: config.flush_timeout(),
            header: config.correlation_header.clone(),
        })
    }

    /// Name of the header the request hook reads the correlation id from.
    pub fn correlation_header(&self) -> &str {
        &self.header
    }

    /// Request hook: register a call before it is dispatched.
    ///
    /// Creates both placeholders for the `(correlation id, span id)` pair and
    /// schedules the merge task. After `shutdown()` this is a no-op and the
    /// span will pass through unmodified.
    pub fn on_span_start(&self, span: &Span, headers: RawHeaders) -> Result<(), CorrelationError> {
        if self.shutdown.is_triggered() {
            tracing::debug!(span_id = %span.span_id, "Engine shut down, skipping registration");
            return Ok(());
        }

        let headers = headers.normalize();
        let id = match find(&headers, &self.header).filter(|v| !v.is_empty()) {
            Some(value) => CorrelationId::from(value),
            None => {
                metrics::record_registration("missing_id");
                tracing::error!(span_id = %span.span_id, header = %self.header, "Request hook found no correlation id");
                return Err(CorrelationError::MissingCorrelationId {
                    header: self.header.clone(),
                });
            }
        };

        self.register(id, span.span_id)
    }

    fn register(&self, id: CorrelationId, span_id: SpanId) -> Result<(), CorrelationError> {
        let (state_tx, state_rx) = watch::channel(MergeState::AwaitingBoth);

        match self.shared.tasks.entry(id.clone()) {
            Entry::Occupied(_) => {
                metrics::record_registration("duplicate");
                tracing::error!(correlation_id = %id, "Duplicate registration");
                return Err(CorrelationError::DuplicateRegistration { correlation_id: id });
            }
            Entry::Vacant(vacant) => {
                vacant.insert(TaskEntry {
                    span_id,
                    state: state_rx,
                });
            }
        }

        let (exchange_tx, exchange_rx) = oneshot::channel();
        let exchange_slot = ExchangeSlot {
            request_body: None,
            resolver: Some(exchange_tx),
        };
        if self.shared.exchanges.try_put(id.clone(), exchange_slot, self.retention).is_err() {
            self.shared.tasks.remove(&id);
            metrics::record_registration("duplicate");
            return Err(CorrelationError::DuplicateRegistration { correlation_id: id });
        }

        let (span_tx, span_rx) = oneshot::channel();
        let span_slot = SpanSlot {
            resolver: Some(span_tx),
        };
        if self.shared.spans.try_put(span_id, span_slot, self.retention).is_err() {
            self.shared.exchanges.delete(&id);
            self.shared.tasks.remove(&id);
            metrics::record_registration("duplicate");
            tracing::error!(correlation_id = %id, span_id = %span_id, "Span already registered");
            return Err(CorrelationError::DuplicateSpan { span_id });
        }

        // Store eviction normally wakes the task first; the deadline is a
        // backstop for when the sweeper has stopped.
        let task = merge::MergeTask {
            exchange_rx,
            span_rx,
            deadline: Instant::now() + self.retention + self.sweep_interval,
            finalizer: merge::Finalizer::new(id.clone(), span_id, self.shared.clone(), state_tx),
        };
        self.runtime.spawn(task.run());

        metrics::record_registration("ok");
        metrics::record_live_tasks(self.shared.tasks.len());
        tracing::debug!(correlation_id = %id, span_id = %span_id, "Registered outbound call");
        Ok(())
    }

    /// Span-end event from the tracer.
    ///
    /// Non-client spans are ignored. A registered client span has its
    /// `sampled` flag cleared and is handed to its merge task; anything else
    /// passes through for normal export.
    pub fn on_span_end(&self, span: &mut Span) -> SpanDisposition {
        if !span.is_client() {
            metrics::record_span_disposition("ignored");
            return SpanDisposition::Ignored;
        }

        let resolver = match self.shared.spans.update(&span.span_id, |slot| slot.resolver.take()) {
            Some(Some(resolver)) => resolver,
            Some(None) => {
                // Already handed to its merge task by an earlier span-end.
                span.sampled = false;
                metrics::record_span_disposition("suppressed");
                tracing::debug!(span_id = %span.span_id, "Repeated span end, keeping original suppressed");
                return SpanDisposition::Suppressed;
            }
            None => {
                metrics::record_span_disposition("passthrough");
                tracing::trace!(span_id = %span.span_id, "Client span not registered, passing through");
                return SpanDisposition::PassThrough;
            }
        };

        span.sampled = false;
        if resolver.send(span.clone()).is_err() {
            // The merge task settled between lookup and hand-off.
            span.sampled = true;
            metrics::record_span_disposition("passthrough");
            return SpanDisposition::PassThrough;
        }

        metrics::record_span_disposition("suppressed");
        tracing::debug!(span_id = %span.span_id, "Original span suppressed");
        SpanDisposition::Suppressed
    }

    /// Request-sent event: capture the request body and index the hostname.
    ///
    /// The index is written under the exchange slot's lock so it cannot land
    /// after the finalizer has already cleared it.
    pub fn on_request_sent(&self, id: &CorrelationId, request: &OutboundRequest) {
        let hostname = request.hostname();
        let hostnames = &self.shared.hostnames;
        let captured = self
            .shared
            .exchanges
            .update(id, |slot| {
                slot.request_body = Some(request.body.clone());
                if let Some(hostname) = &hostname {
                    hostnames.insert(hostname, id);
                }
            })
            .is_some();

        if !captured {
            tracing::debug!(correlation_id = %id, "Request event without pending registration");
        }
    }

    /// Response-received event: resolve the pending exchange.
    pub fn on_response_received(&self, id: &CorrelationId, response: InboundResponse) {
        self.resolve_exchange(id, "response", |request_body| {
            Ok(ExchangeRecord::new(request_body, response))
        });
    }

    /// Request-failed event: reject the pending exchange.
    pub fn on_request_failed(&self, id: &CorrelationId, failure: ExchangeFailure) {
        self.resolve_exchange(id, "failure", |_| Err(failure));
    }

    fn resolve_exchange(
        &self,
        id: &CorrelationId,
        event: &'static str,
        result: impl FnOnce(String) -> ExchangeResult,
    ) {
        let taken = self
            .shared
            .exchanges
            .update(id, |slot| {
                let resolver = slot.resolver.take()?;
                Some((resolver, slot.request_body.take().unwrap_or_default()))
            })
            .flatten();

        match taken {
            Some((resolver, request_body)) => {
                if resolver.send(result(request_body)).is_err() {
                    tracing::debug!(correlation_id = %id, event, "Merge task already settled");
                }
            }
            None => {
                tracing::debug!(correlation_id = %id, event, "Exchange event without pending registration");
            }
        }
    }

    /// Wait for the tasks live right now to settle, at most `timeout`.
    pub async fn force_flush(&self, timeout: Duration) -> FlushOutcome {
        let snapshot: Vec<_> = self
            .shared
            .tasks
            .iter()
            .map(|entry| entry.value().state.clone())
            .collect();
        drain::drain(snapshot, timeout).await
    }

    /// Stop accepting registrations, drain with the configured timeout and
    /// stop the sweeper. Later calls return `Flushed` immediately.
    pub async fn shutdown(&self) -> FlushOutcome {
        if !self.shutdown.begin() {
            return FlushOutcome::Flushed;
        }

        tracing::info!(live_tasks = self.shared.tasks.len(), "Correlation engine shutting down");
        let outcome = self.force_flush(self.flush_timeout).await;

        self.shutdown.notify();
        let sweeper = self.sweeper.lock().ok().and_then(|mut guard| guard.take());
        if let Some(handle) = sweeper {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Sweeper task ended abnormally");
            }
        }

        tracing::info!(?outcome, "Correlation engine stopped");
        outcome
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_triggered()
    }

    /// Number of merge tasks in the live registry.
    pub fn live_tasks(&self) -> usize {
        self.shared.tasks.len()
    }

    pub fn task_state(&self, id: &CorrelationId) -> Option<MergeState> {
        self.shared.tasks.get(id).map(|entry| *entry.state.borrow())
    }

    /// Whether an unexpired exchange placeholder exists for `id`.
    pub fn has_pending_exchange(&self, id: &CorrelationId) -> bool {
        self.shared.exchanges.contains_key(id)
    }

    /// Whether an unexpired span placeholder exists for `span_id`.
    pub fn has_pending_span(&self, span_id: SpanId) -> bool {
        self.shared.spans.contains_key(&span_id)
    }

    /// Span id registered for `id`, if its task is live.
    pub fn registered_span(&self, id: &CorrelationId) -> Option<SpanId> {
        self.shared.tasks.get(id).map(|entry| entry.span_id)
    }

    pub fn stats(&self) -> EngineStats {
        let mut states = BTreeMap::new();
        for entry in self.shared.tasks.iter() {
            let state = *entry.value().state.borrow();
            *states.entry(state.as_str()).or_insert(0) += 1;
        }

        EngineStats {
            pending_exchanges: self.shared.exchanges.len(),
            pending_spans: self.shared.spans.len(),
            live_tasks: self.shared.tasks.len(),
            states,
            hostnames: self.shared.hostnames.snapshot(),
            shut_down: self.is_shut_down(),
        }
    }
}

impl Drop for CorrelationEngine {
    fn drop(&mut self) {
        if let Ok(mut sweeper) = self.sweeper.lock() {
            if let Some(handle) = sweeper.take() {
                handle.abort();
            }
        }
    }
}

/// Periodically evict expired store entries until shutdown.
///
/// Evicting a slot drops its resolver, which wakes the merge task waiting on it.
async fn run_sweeper(shared: Arc<EngineShared>, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
    let mut ticker = time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let evicted = shared.exchanges.sweep() + shared.spans.sweep();
                if evicted > 0 {
                    tracing::debug!(evicted, "Swept expired correlation entries");
                }
            }
            _ = shutdown.recv() => {
                tracing::debug!("Sweeper received shutdown signal, exiting loop");
                break;
            }
        }
    }
}
