//! Connectivity capability
//!
//! The host environment tells us whether we are online and may offer to
//! run a sync later, once connectivity returns. Both are injected so
//! tests can flip online/offline deterministically.

use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tokio::sync::watch;

/// Errors from the connectivity capability
#[derive(Error, Debug)]
pub enum ConnectivityError {
    /// The environment cannot schedule a deferred sync
    #[error("Deferred sync is not supported in this environment")]
    DeferredSyncUnsupported,

    /// The environment refused the registration
    #[error("Failed to register deferred sync: {0}")]
    Registration(String),
}

/// Connectivity as reported by the host environment
pub trait Connectivity: Send + Sync {
    /// Whether the remote authority is currently reachable
    fn is_connected(&self) -> bool;

    /// Ask the environment to run a sync once connectivity returns
    ///
    /// Optional: the default reports that deferred sync is unsupported.
    fn register_deferred_sync(&self) -> Result<(), ConnectivityError> {
        Err(ConnectivityError::DeferredSyncUnsupported)
    }

    /// Clear a pending deferred sync, returning whether one was registered
    ///
    /// Called when connectivity returns and the sync runs in-process.
    fn take_deferred_sync(&self) -> bool {
        false
    }
}

/// Connectivity driven from inside the process
///
/// Status changes are published on a watch channel, so a coordinator can
/// react to the transition back online.
#[derive(Debug)]
pub struct ManualConnectivity {
    status: watch::Sender<bool>,
    deferred: AtomicBool,
    supports_deferred: bool,
}

impl ManualConnectivity {
    /// Create with an initial status
    pub fn new(connected: bool) -> Self {
        let (status, _) = watch::channel(connected);
        Self {
            status,
            deferred: AtomicBool::new(false),
            supports_deferred: true,
        }
    }

    /// Behave like an environment without deferred sync
    pub fn without_deferred_sync(mut self) -> Self {
        self.supports_deferred = false;
        self
    }

    /// Change the status, notifying subscribers on a change
    pub fn set_connected(&self, connected: bool) {
        self.status.send_if_modified(|current| {
            let changed = *current != connected;
            *current = connected;
            changed
        });
    }

    /// Subscribe to status changes
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.status.subscribe()
    }
}

impl Connectivity for ManualConnectivity {
    fn is_connected(&self) -> bool {
        *self.status.borrow()
    }

    fn register_deferred_sync(&self) -> Result<(), ConnectivityError> {
        if !self.supports_deferred {
            return Err(ConnectivityError::DeferredSyncUnsupported);
        }
        self.deferred.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn take_deferred_sync(&self) -> bool {
        self.deferred.swap(false, Ordering::SeqCst)
    }
}
