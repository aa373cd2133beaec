//! Foodlog Core Library
//!
//! This crate provides the core functionality for foodlog, an offline-first
//! food diary. Entries are written to a local SQLite store and pushed to a
//! remote authority in the background.
//!
//! # Architecture
//!
//! - **SQLite**: local source of truth, one short-lived connection per operation
//! - **Remote authority**: HTTP endpoint that receives each entry once
//!
//! Inserts never wait on the network. Anything not yet confirmed by the
//! remote stays flagged unsynced until a later sync succeeds.
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let repo = EntryRepository::new(StoreProvider::from_config(&config));
//!
//! // Log a meal
//! let id = repo.insert(NewFoodEntry::new("u1", "Apple", Utc::now())).await?;
//!
//! // Query a day
//! let entries = repo.query("u1", Some(start), Some(end)).await;
//! ```
//!
//! # Modules
//!
//! - `repository`: Insert and query (main entry point)
//! - `models`: Food entry and insert input
//! - `storage`: SQLite store, schema and errors
//! - `sync`: Engine, coordinator, remote and connectivity
//! - `config`: Application configuration

pub mod config;
pub mod models;
pub mod repository;
pub mod storage;
pub mod sync;

pub use config::Config;
pub use models::{FoodEntry, NewFoodEntry};
pub use repository::{EntryRepository, RepositoryEvent};
pub use storage::{StorageError, StorageResult, StoreProvider};
pub use sync::{
    Connectivity, ConnectivityError, HttpRemote, ManualConnectivity, PushError, RemoteAuthority,
    SyncCoordinator, SyncEngine, SyncOutcome, SyncReport,
};
