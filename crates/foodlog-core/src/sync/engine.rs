//! Sync engine
//!
//! Pushes every locally unsynced entry to the remote authority, one at a
//! time, and marks each confirmed entry as synced in its own transaction.
//! A failed push leaves that entry unsynced and moves on to the next one.
//!
//! At most one pass runs at a time. A trigger that arrives while a pass is
//! running is folded into one more pass by the running invocation, so an
//! entry inserted mid-pass is not left behind.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::connectivity::Connectivity;
use super::remote::RemoteAuthority;
use crate::storage::StoreProvider;

/// Counts for one `sync_all` invocation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Passes run (more than one when triggers were coalesced)
    pub passes: usize,
    /// Pushes attempted
    pub attempted: usize,
    /// Entries confirmed and marked synced
    pub pushed: usize,
    /// Entries left unsynced
    pub failed: usize,
}

impl SyncReport {
    fn merge(&mut self, other: SyncReport) {
        self.passes += other.passes;
        self.attempted += other.attempted;
        self.pushed += other.pushed;
        self.failed += other.failed;
    }
}

/// What a `sync_all` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No connectivity; nothing was attempted
    Offline,
    /// Another invocation was running and picked this trigger up
    Coalesced,
    /// This invocation ran one or more passes
    Completed(SyncReport),
}

/// Reconciles unsynced local entries with the remote authority
pub struct SyncEngine {
    provider: StoreProvider,
    remote: Arc<dyn RemoteAuthority>,
    connectivity: Arc<dyn Connectivity>,
    gate: Mutex<()>,
    rerun: AtomicBool,
}

impl SyncEngine {
    /// Create an engine over a store, a remote and a connectivity source
    pub fn new(
        provider: StoreProvider,
        remote: Arc<dyn RemoteAuthority>,
        connectivity: Arc<dyn Connectivity>,
    ) -> Self {
        Self {
            provider,
            remote,
            connectivity,
            gate: Mutex::new(()),
            rerun: AtomicBool::new(false),
        }
    }

    /// The connectivity source this engine consults
    pub fn connectivity(&self) -> &Arc<dyn Connectivity> {
        &self.connectivity
    }

    /// Push all unsynced entries
    ///
    /// Never fails: store and push errors are logged, and the outcome is
    /// returned for reporting only.
    pub async fn sync_all(&self) -> SyncOutcome {
        if !self.connectivity.is_connected() {
            debug!("Offline, skipping sync");
            return SyncOutcome::Offline;
        }

        self.rerun.store(true, Ordering::SeqCst);

        let mut report = SyncReport::default();
        let mut ran = false;

        loop {
            let guard = match self.gate.try_lock() {
                Ok(guard) => guard,
                Err(_) if ran => break,
                Err(_) => {
                    debug!("Sync already running, coalescing trigger");
                    return SyncOutcome::Coalesced;
                }
            };

            while self.rerun.swap(false, Ordering::SeqCst) {
                report.merge(self.run_pass().await);
                ran = true;
            }

            drop(guard);

            // A trigger may have landed between the last pass and the unlock
            if !self.rerun.load(Ordering::SeqCst) {
                break;
            }
        }

        info!(
            "Sync complete: {} pushed, {} failed",
            report.pushed, report.failed
        );
        SyncOutcome::Completed(report)
    }

    /// One pass over the unsynced set
    async fn run_pass(&self) -> SyncReport {
        let mut report = SyncReport {
            passes: 1,
            ..SyncReport::default()
        };

        let pending = match self
            .provider
            .with_handle(|handle| handle.unsynced_entries())
            .await
        {
            Ok(pending) => pending,
            Err(e) => {
                warn!("Sync could not read unsynced entries: {}", e);
                return report;
            }
        };

        if pending.is_empty() {
            debug!("No unsynced entries");
            return report;
        }

        debug!("Pushing {} unsynced entries", pending.len());

        for entry in pending {
            report.attempted += 1;

            if let Err(e) = self.remote.push(&entry).await {
                warn!("Failed to push entry {}: {}", entry.id, e);
                report.failed += 1;
                continue;
            }

            let id = entry.id.clone();
            match self
                .provider
                .with_handle(move |handle| handle.mark_synced(&id))
                .await
            {
                Ok(_) => {
                    debug!("Entry {} synced", entry.id);
                    report.pushed += 1;
                }
                Err(e) => {
                    warn!(
                        "Entry {} was accepted remotely but could not be marked synced: {}",
                        entry.id, e
                    );
                    report.failed += 1;
                }
            }
        }

        report
    }
}
