//! Background sync with the remote authority
//!
//! Entries are written locally first and pushed later.
//!
//! ## Flow
//!
//! 1. The repository commits an entry and emits `EntryInserted`
//! 2. The coordinator starts a sync if online, or registers a deferred one
//! 3. The engine pushes each unsynced entry and marks confirmed ones synced
//! 4. When connectivity returns, the coordinator syncs again
//!
//! ## Usage
//!
//! ```ignore
//! let engine = Arc::new(SyncEngine::new(provider, remote, connectivity));
//! let coordinator = SyncCoordinator::new(engine);
//! tokio::spawn(coordinator.run(repo.take_events().unwrap(), online));
//! ```

mod connectivity;
mod coordinator;
mod engine;
mod remote;

pub use connectivity::{Connectivity, ConnectivityError, ManualConnectivity};
pub use coordinator::SyncCoordinator;
pub use engine::{SyncEngine, SyncOutcome, SyncReport};
pub use remote::{HttpRemote, PushError, RemoteAuthority};
