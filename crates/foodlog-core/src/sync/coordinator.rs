//! Sync coordinator
//!
//! Wires repository events and connectivity changes to the sync engine.
//! An insert while online starts a sync right away. An insert while
//! offline asks the environment for a deferred sync, and the transition
//! back online starts one.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::connectivity::Connectivity;
use super::engine::{SyncEngine, SyncOutcome};
use crate::repository::RepositoryEvent;

/// Reacts to repository events and connectivity transitions
#[derive(Clone)]
pub struct SyncCoordinator {
    engine: Arc<SyncEngine>,
    connectivity: Arc<dyn Connectivity>,
}

impl SyncCoordinator {
    /// Create a coordinator driving the given engine
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        let connectivity = engine.connectivity().clone();
        Self {
            engine,
            connectivity,
        }
    }

    /// Handle one repository event
    ///
    /// Returns the spawned sync when one was started. The insert that
    /// produced the event has already completed and is never affected by
    /// what happens here.
    pub fn handle_event(&self, event: RepositoryEvent) -> Option<JoinHandle<SyncOutcome>> {
        let RepositoryEvent::EntryInserted { id } = event;

        if self.connectivity.is_connected() {
            debug!("Entry {} inserted while online, starting sync", id);
            return Some(self.spawn_sync());
        }

        match self.connectivity.register_deferred_sync() {
            Ok(()) => debug!("Entry {} inserted while offline, deferred sync registered", id),
            Err(e) => debug!("Entry {} inserted while offline, no deferred sync: {}", id, e),
        }
        None
    }

    /// Start a sync after connectivity returned
    ///
    /// Runs whether or not a deferred sync was registered, and clears any
    /// pending registration since this sync covers it.
    pub fn on_connectivity_restored(&self) -> JoinHandle<SyncOutcome> {
        if self.connectivity.take_deferred_sync() {
            info!("Connectivity restored, running deferred sync");
        } else {
            info!("Connectivity restored, starting sync");
        }
        self.spawn_sync()
    }

    /// Process events and connectivity changes until the event channel closes
    pub async fn run(
        self,
        mut events: mpsc::UnboundedReceiver<RepositoryEvent>,
        mut online: watch::Receiver<bool>,
    ) {
        let mut was_online = *online.borrow_and_update();
        let mut watching = true;

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        self.handle_event(event);
                    }
                    None => break,
                },
                changed = online.changed(), if watching => {
                    if changed.is_err() {
                        debug!("Connectivity source dropped, no longer watching");
                        watching = false;
                        continue;
                    }

                    let now_online = *online.borrow_and_update();
                    if now_online && !was_online {
                        self.on_connectivity_restored();
                    }
                    was_online = now_online;
                }
            }
        }

        debug!("Repository events closed, coordinator stopping");
    }

    fn spawn_sync(&self) -> JoinHandle<SyncOutcome> {
        let engine = self.engine.clone();
        tokio::spawn(async move {
            let outcome = engine.sync_all().await;
            if let SyncOutcome::Completed(report) = &outcome {
                if report.failed > 0 {
                    warn!("{} entries left unsynced", report.failed);
                }
            }
            outcome
        })
    }
}
