//! gridwatch store: snapshot reconciliation, highlight timers and the session loop.

#![forbid(unsafe_code)]

use std::sync::Arc;

use arc_swap::ArcSwap;
use gridwatch_core::{Scope, Snapshot};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info};

pub mod config;
pub mod highlight;
pub mod reconcile;
pub mod state;

pub use config::SessionConfig;
pub use highlight::{HighlightScheduler, HIGHLIGHT_WINDOW};
pub use reconcile::{reconcile, Reconciled, RowSet};
pub use state::{Applied, ReconcileSummary, TableState};

/// Input to a running session, in transport arrival order.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    Subscribe(Scope),
    Snapshot(Snapshot),
}

pub type SessionSender = mpsc::Sender<SessionCommand>;

/// What readers see: the active scope and its rows at some epoch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LiveTable {
    pub epoch: u64,
    pub scope: Option<Scope>,
    pub rows: Arc<RowSet>,
}

/// Handle for readers to access the current table and subscribe to swaps.
#[derive(Clone)]
pub struct SessionHandle {
    live: Arc<ArcSwap<LiveTable>>,
    epoch_rx: watch::Receiver<u64>,
}

impl SessionHandle {
    pub fn current(&self) -> Arc<LiveTable> {
        self.live.load_full()
    }

    /// Active subscription, if any.
    pub fn scope(&self) -> Option<Scope> {
        self.live.load().scope.clone()
    }

    pub fn subscribe_epoch(&self) -> watch::Receiver<u64> {
        self.epoch_rx.clone()
    }
}

fn publish(state: &TableState, live: &ArcSwap<LiveTable>, epoch_tx: &watch::Sender<u64>) {
    live.store(Arc::new(LiveTable { epoch: state.epoch(), scope: state.scope().cloned(), rows: state.rows() }));
    let _ = epoch_tx.send(state.epoch());
}

/// Spawn the session loop. Commands and timer expiry are handled one at a time
/// on a single task, so row state is never mutated concurrently.
pub fn spawn_session(cfg: SessionConfig) -> (SessionSender, SessionHandle) {
    let (tx, mut rx) = mpsc::channel::<SessionCommand>(cfg.queue_cap);
    let live = Arc::new(ArcSwap::from_pointee(LiveTable::default()));
    let (epoch_tx, epoch_rx) = watch::channel(0u64);
    let live_task = Arc::clone(&live);

    tokio::spawn(async move {
        let mut state = TableState::new(HighlightScheduler::new(cfg.highlight));
        loop {
            let deadline = state.next_deadline();
            tokio::select! {
                maybe = rx.recv() => {
                    match maybe {
                        Some(SessionCommand::Subscribe(scope)) => {
                            if state.subscribe(scope) {
                                publish(&state, &live_task, &epoch_tx);
                            }
                        }
                        Some(SessionCommand::Snapshot(snap)) => {
                            if let Applied::Reconciled(_) = state.apply_snapshot(&snap, Instant::now()) {
                                publish(&state, &live_task, &epoch_tx);
                            }
                        }
                        None => {
                            debug!("session channel closed; exiting");
                            break;
                        }
                    }
                }
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    let cleared = state.expire_highlights(Instant::now());
                    if !cleared.is_empty() {
                        debug!(cleared = cleared.len(), "highlights expired");
                        publish(&state, &live_task, &epoch_tx);
                    }
                }
            }
        }
        info!("session loop stopped");
    });

    (tx, SessionHandle { live, epoch_rx })
}
