//! Store handle provider
//!
//! Opens the SQLite store, ensures its schema, and hands out scoped
//! handles. Handles are never cached: every operation opens its own and
//! releases it when done, on success and on failure.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::DateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, warn};

use super::error::{StorageError, StorageResult};
use super::schema::{ensure_schema, SchemaState, SCHEMA_VERSION};
use crate::config::Config;
use crate::models::FoodEntry;

/// How long a connection waits on a locked database before failing
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SELECT_COLUMNS: &str =
    "id, owner_id, name, calories, protein, carbs, fat, occurred_at, synced";

/// Opens handles to the local store
#[derive(Debug, Clone)]
pub struct StoreProvider {
    path: PathBuf,
    busy_timeout: Duration,
}

impl StoreProvider {
    /// Create a provider for the database at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    /// Create a provider for the configured database
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.sqlite_path())
    }

    /// Override the busy timeout
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the database file exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Open a handle, creating the store and schema if needed
    ///
    /// Fails with `Unavailable` when SQLite cannot open or read the file
    /// and with `SchemaConflict` when a newer build wrote the schema.
    /// Neither is retried.
    pub fn open(&self) -> StorageResult<StoreHandle> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| {
                    StorageError::CreateDirectory {
                        path: parent.to_path_buf(),
                        source,
                    }
                })?;
            }
        }

        let unavailable = |source| StorageError::Unavailable {
            path: self.path.clone(),
            source,
        };

        let mut conn = Connection::open(&self.path).map_err(unavailable)?;
        conn.busy_timeout(self.busy_timeout).map_err(unavailable)?;

        match ensure_schema(&mut conn).map_err(unavailable)? {
            SchemaState::Newer(found) => {
                return Err(StorageError::SchemaConflict {
                    path: self.path.clone(),
                    found,
                    expected: SCHEMA_VERSION,
                });
            }
            SchemaState::Missing => debug!("Created store schema at {:?}", self.path),
            SchemaState::Outdated(from) => {
                debug!("Upgraded store schema at {:?} from v{}", self.path, from)
            }
            SchemaState::Current => {}
        }

        Ok(StoreHandle {
            conn,
            path: self.path.clone(),
        })
    }

    /// Run `op` against a freshly opened handle
    ///
    /// The work runs on the blocking pool. The handle is released when
    /// `op` returns, whatever the outcome.
    pub async fn with_handle<T, F>(&self, op: F) -> StorageResult<T>
    where
        F: FnOnce(&mut StoreHandle) -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let provider = self.clone();

        tokio::task::spawn_blocking(move || {
            let mut handle = provider.open()?;
            let result = op(&mut handle);
            if let Err(e) = handle.close() {
                warn!("Failed to close store handle: {}", e);
            }
            result
        })
        .await
        .map_err(|e| StorageError::Task(e.to_string()))?
    }
}

/// An open handle to the local store
///
/// Dropping the handle releases the connection.
pub struct StoreHandle {
    conn: Connection,
    path: PathBuf,
}

impl StoreHandle {
    /// Path of the database behind this handle
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert an entry in its own write transaction
    ///
    /// An existing id is a constraint failure, never an overwrite.
    pub fn insert_entry(&mut self, entry: &FoodEntry) -> StorageResult<()> {
        let write_err = |e| StorageError::from_write(e, &entry.id);

        let tx = self.conn.transaction().map_err(write_err)?;
        tx.execute(
            r#"
            INSERT INTO food_entries
                (id, owner_id, name, calories, protein, carbs, fat, occurred_at, synced)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                entry.id,
                entry.owner_id,
                entry.name,
                entry.calories,
                entry.protein,
                entry.carbs,
                entry.fat,
                entry.occurred_at.timestamp_millis(),
                entry.synced,
            ],
        )
        .map_err(write_err)?;
        tx.commit().map_err(write_err)?;

        Ok(())
    }

    /// All entries for an owner, via the owner index
    pub fn entries_for_owner(&mut self, owner_id: &str) -> StorageResult<Vec<FoodEntry>> {
        let tx = self.conn.transaction()?;
        let rows = {
            let mut stmt = tx.prepare(&format!(
                "SELECT {} FROM food_entries INDEXED BY idx_food_entries_owner_id WHERE owner_id = ?1",
                SELECT_COLUMNS
            ))?;
            let mapped = stmt.query_map(params![owner_id], EntryRow::from_row)?;
            let rows = mapped.collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };
        tx.commit()?;

        rows.into_iter().map(EntryRow::into_entry).collect()
    }

    /// Snapshot of the unsynced set, via the sync flag index
    pub fn unsynced_entries(&mut self) -> StorageResult<Vec<FoodEntry>> {
        let tx = self.conn.transaction()?;
        let rows = {
            let mut stmt = tx.prepare(&format!(
                "SELECT {} FROM food_entries INDEXED BY idx_food_entries_synced WHERE synced = 0",
                SELECT_COLUMNS
            ))?;
            let mapped = stmt.query_map([], EntryRow::from_row)?;
            let rows = mapped.collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };
        tx.commit()?;

        rows.into_iter().map(EntryRow::into_entry).collect()
    }

    /// Set `synced = true` on one entry in its own write transaction
    ///
    /// Touches no other column. Returns whether the flag changed.
    pub fn mark_synced(&mut self, id: &str) -> StorageResult<bool> {
        let write_err = |e| StorageError::from_write(e, id);

        let tx = self.conn.transaction().map_err(write_err)?;
        let changed = tx
            .execute(
                "UPDATE food_entries SET synced = 1 WHERE id = ?1 AND synced = 0",
                params![id],
            )
            .map_err(write_err)?;
        tx.commit().map_err(write_err)?;

        Ok(changed > 0)
    }

    /// Get an entry by id
    pub fn get_entry(&self, id: &str) -> StorageResult<Option<FoodEntry>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM food_entries WHERE id = ?1", SELECT_COLUMNS),
                params![id],
                EntryRow::from_row,
            )
            .optional()?;

        row.map(EntryRow::into_entry).transpose()
    }

    /// Number of entries not yet confirmed by the remote authority
    pub fn unsynced_count(&self) -> StorageResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM food_entries INDEXED BY idx_food_entries_synced WHERE synced = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Release the handle, reporting any close error
    pub fn close(self) -> StorageResult<()> {
        self.conn.close().map_err(|(_, e)| StorageError::Database(e))
    }
}

/// Raw row as stored
struct EntryRow {
    id: String,
    owner_id: String,
    name: String,
    calories: f64,
    protein: f64,
    carbs: f64,
    fat: f64,
    occurred_at: i64,
    synced: bool,
}

impl EntryRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            name: row.get(2)?,
            calories: row.get(3)?,
            protein: row.get(4)?,
            carbs: row.get(5)?,
            fat: row.get(6)?,
            occurred_at: row.get(7)?,
            synced: row.get(8)?,
        })
    }

    fn into_entry(self) -> StorageResult<FoodEntry> {
        let occurred_at =
            DateTime::from_timestamp_millis(self.occurred_at).ok_or_else(|| {
                StorageError::InvalidRow {
                    id: self.id.clone(),
                    details: format!("timestamp {} is out of range", self.occurred_at),
                }
            })?;

        Ok(FoodEntry {
            id: self.id,
            owner_id: self.owner_id,
            name: self.name,
            calories: self.calories,
            protein: self.protein,
            carbs: self.carbs,
            fat: self.fat,
            occurred_at,
            synced: self.synced,
        })
    }
}
