//! Per-fragment polling tasks
//!
//! Every fragment gets its own task and timer. The fetch is awaited inside
//! the task, so a fragment never has more than one request outstanding, and
//! ticks that come due while a fetch is running are skipped rather than
//! queued. A slow fragment only delays itself.

use super::fragment::FragmentSpec;
use super::state::SyncState;
use crate::snapshot::{FragmentKind, FragmentValue};
use crate::transport::{Method, Transport, TransportError, TransportErrorKind};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// State shared between the orchestrator and its tasks
struct Shared {
    state: RwLock<SyncState>,
    /// Bumped after every applied poll outcome
    revision: watch::Sender<u64>,
}

struct Running {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

/// Keeps the snapshot fresh by polling each fragment on its own cadence
pub struct PollingOrchestrator<T: Transport + 'static> {
    transport: Arc<T>,
    fragments: Vec<FragmentSpec>,
    shared: Arc<Shared>,
    running: Option<Running>,
}

impl<T: Transport + 'static> PollingOrchestrator<T> {
    pub fn new(transport: Arc<T>, fragments: Vec<FragmentSpec>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            transport,
            fragments,
            shared: Arc::new(Shared {
                state: RwLock::new(SyncState::default()),
                revision,
            }),
            running: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Arm one timer per fragment. The first poll of each fires immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        if self.running.is_some() {
            tracing::warn!("Polling already running");
            return;
        }

        let cancel = CancellationToken::new();
        let tasks = self
            .fragments
            .iter()
            .cloned()
            .map(|spec| {
                tokio::spawn(poll_fragment(
                    Arc::clone(&self.transport),
                    spec,
                    Arc::clone(&self.shared),
                    cancel.clone(),
                ))
            })
            .collect();

        tracing::info!(fragments = self.fragments.len(), "Polling started");
        self.running = Some(Running { cancel, tasks });
    }

    /// Cancel every timer and in-flight fetch.
    ///
    /// When this returns, all polling tasks have exited: no further requests
    /// are issued and no late response can touch the state.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        {
            // Tasks check the token under this lock before applying a result
            let _state = self.shared.state.write().await;
            running.cancel.cancel();
        }

        for task in running.tasks {
            if let Err(e) = task.await {
                if e.is_panic() {
                    tracing::error!(error = %e, "Polling task panicked");
                }
            }
        }

        tracing::info!("Polling stopped");
    }

    /// Copy of the current snapshot and connection status
    pub async fn state(&self) -> SyncState {
        self.shared.state.read().await.clone()
    }

    /// Receiver that changes whenever a poll outcome is applied
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }
}

impl<T: Transport + 'static> Drop for PollingOrchestrator<T> {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.cancel.cancel();
        }
    }
}

async fn poll_fragment<T: Transport + 'static>(
    transport: Arc<T>,
    spec: FragmentSpec,
    shared: Arc<Shared>,
    cancel: CancellationToken,
) {
    let mut idle_since = Instant::now();
    let mut ticker = tokio::time::interval(spec.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let scheduled = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            at = ticker.tick() => at,
        };

        if scheduled < idle_since {
            tracing::trace!(fragment = %spec.kind, "Skipping tick that came due mid-fetch");
            continue;
        }

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = transport.request(Method::Get, &spec.endpoint, None) => {
                result.and_then(spec.parse)
            }
        };

        if !commit(&shared, &cancel, spec.kind, outcome).await {
            break;
        }
        idle_since = Instant::now();
    }

    tracing::debug!(fragment = %spec.kind, "Fragment poller exited");
}

/// Apply one poll outcome unless polling has been stopped.
///
/// Returns `false` when the result was discarded.
async fn commit(
    shared: &Shared,
    cancel: &CancellationToken,
    kind: FragmentKind,
    outcome: Result<FragmentValue, TransportError>,
) -> bool {
    let mut state = shared.state.write().await;
    if cancel.is_cancelled() {
        tracing::debug!(fragment = %kind, "Discarding poll result after stop");
        return false;
    }

    if let Err(e) = &outcome {
        log_poll_failure(kind, e);
    }

    let previous = state.status;
    state.apply(kind, outcome, Utc::now());
    if state.status != previous {
        tracing::info!(from = ?previous, to = ?state.status, "Connection status changed");
    }
    drop(state);

    shared.revision.send_modify(|r| *r = r.wrapping_add(1));
    true
}

fn log_poll_failure(kind: FragmentKind, error: &TransportError) {
    match error.kind {
        TransportErrorKind::Network => {
            tracing::debug!(fragment = %kind, error = %error, "Poll failed");
        }
        TransportErrorKind::Server | TransportErrorKind::Malformed => {
            tracing::warn!(
                fragment = %kind,
                kind = %error.kind,
                status = ?error.status,
                error = %error,
                "Poll failed"
            );
        }
    }
}
