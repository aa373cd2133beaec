//! SQLite schema for the local food entry store
//!
//! One collection keyed by `id` with non-unique lookup indexes on the
//! owner, the timestamp and the sync flag. Creation is idempotent and
//! runs as a single transaction.

use rusqlite::{Connection, Result, TransactionBehavior};

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Name of the entry collection
pub const ENTRIES_TABLE: &str = "food_entries";

/// Schema state found when opening a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaState {
    /// No schema yet
    Missing,
    /// Schema from an older version
    Outdated(i32),
    /// Schema matches this build
    Current,
    /// Schema written by a newer build
    Newer(i32),
}

/// Initialize the database schema
///
/// Takes the write lock up front so two processes opening a fresh store
/// at the same time serialize on creation.
pub fn init_schema(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    tx.execute_batch(
        r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_info (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- Food entries, keyed by record identity
        CREATE TABLE IF NOT EXISTS food_entries (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            name TEXT NOT NULL,
            calories REAL NOT NULL,
            protein REAL NOT NULL,
            carbs REAL NOT NULL,
            fat REAL NOT NULL,
            occurred_at INTEGER NOT NULL,
            synced INTEGER NOT NULL DEFAULT 0
        );

        -- Per-owner lookups
        CREATE INDEX IF NOT EXISTS idx_food_entries_owner_id ON food_entries(owner_id);

        -- Time range lookups
        CREATE INDEX IF NOT EXISTS idx_food_entries_occurred_at ON food_entries(occurred_at);

        -- Unsynced set scan
        CREATE INDEX IF NOT EXISTS idx_food_entries_synced ON food_entries(synced);
        "#,
    )?;

    tx.execute(
        "INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?)",
        [SCHEMA_VERSION.to_string()],
    )?;

    tx.commit()
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<Option<i32>> {
    let mut stmt = conn.prepare("SELECT value FROM schema_info WHERE key = 'version'")?;
    let result: Result<String> = stmt.query_row([], |row| row.get(0));

    match result {
        Ok(version_str) => Ok(version_str.parse().ok()),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Inspect the schema without changing it
pub fn schema_state(conn: &Connection) -> Result<SchemaState> {
    let table_exists = conn
        .prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_info'")?
        .exists([])?;

    if !table_exists {
        return Ok(SchemaState::Missing);
    }

    Ok(match get_schema_version(conn)? {
        None => SchemaState::Missing,
        Some(v) if v < SCHEMA_VERSION => SchemaState::Outdated(v),
        Some(v) if v > SCHEMA_VERSION => SchemaState::Newer(v),
        Some(_) => SchemaState::Current,
    })
}

/// Bring the schema to the current version if needed
///
/// Returns the state found before any change. A newer schema is left
/// untouched; the caller decides how to report it.
pub fn ensure_schema(conn: &mut Connection) -> Result<SchemaState> {
    let state = schema_state(conn)?;

    if matches!(state, SchemaState::Missing | SchemaState::Outdated(_)) {
        init_schema(conn)?;
    }

    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(conn: &Connection, kind: &str) -> Vec<String> {
        conn.prepare("SELECT name FROM sqlite_master WHERE type = ?1 ORDER BY name")
            .unwrap()
            .query_map([kind], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect()
    }

    #[test]
    fn test_init_schema() {
        let mut conn = Connection::open_in_memory().unwrap();
        init_schema(&mut conn).unwrap();

        let tables = names(&conn, "table");
        assert!(tables.contains(&ENTRIES_TABLE.to_string()));
        assert!(tables.contains(&"schema_info".to_string()));
    }

    #[test]
    fn test_indexes_exist() {
        let mut conn = Connection::open_in_memory().unwrap();
        init_schema(&mut conn).unwrap();

        let indexes = names(&conn, "index");
        assert!(indexes.contains(&"idx_food_entries_owner_id".to_string()));
        assert!(indexes.contains(&"idx_food_entries_occurred_at".to_string()));
        assert!(indexes.contains(&"idx_food_entries_synced".to_string()));
    }

    #[test]
    fn test_schema_version() {
        let mut conn = Connection::open_in_memory().unwrap();

        assert_eq!(schema_state(&conn).unwrap(), SchemaState::Missing);

        init_schema(&mut conn).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), Some(SCHEMA_VERSION));
        assert_eq!(schema_state(&conn).unwrap(), SchemaState::Current);
    }

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();

        assert_eq!(ensure_schema(&mut conn).unwrap(), SchemaState::Missing);
        conn.execute(
            "INSERT INTO food_entries (id, owner_id, name, calories, protein, carbs, fat, occurred_at)
             VALUES ('e1', 'u1', 'Apple', 95, 0.5, 25, 0.3, 0)",
            [],
        )
        .unwrap();

        assert_eq!(ensure_schema(&mut conn).unwrap(), SchemaState::Current);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM food_entries", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_ensure_schema_leaves_newer_version() {
        let mut conn = Connection::open_in_memory().unwrap();
        init_schema(&mut conn).unwrap();
        conn.execute(
            "UPDATE schema_info SET value = ?1 WHERE key = 'version'",
            [(SCHEMA_VERSION + 1).to_string()],
        )
        .unwrap();

        assert_eq!(
            ensure_schema(&mut conn).unwrap(),
            SchemaState::Newer(SCHEMA_VERSION + 1)
        );
        assert_eq!(get_schema_version(&conn).unwrap(), Some(SCHEMA_VERSION + 1));
    }

    #[test]
    fn test_outdated_schema_is_upgraded() {
        let mut conn = Connection::open_in_memory().unwrap();
        init_schema(&mut conn).unwrap();
        conn.execute("UPDATE schema_info SET value = '0' WHERE key = 'version'", [])
            .unwrap();

        assert_eq!(ensure_schema(&mut conn).unwrap(), SchemaState::Outdated(0));
        assert_eq!(schema_state(&conn).unwrap(), SchemaState::Current);
    }
}
