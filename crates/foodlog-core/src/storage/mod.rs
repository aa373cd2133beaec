//! Storage layer
//!
//! Local SQLite store for food entries.
//!
//! ## Architecture
//!
//! - **StoreProvider**: opens the store and ensures the versioned schema
//! - **StoreHandle**: scoped connection with the entry transactions
//!
//! Every operation opens its own handle and releases it when done.

pub mod error;
pub mod handle;
pub mod schema;

pub use error::{StorageError, StorageResult};
pub use handle::{StoreHandle, StoreProvider};
pub use schema::{ensure_schema, SchemaState, SCHEMA_VERSION};
