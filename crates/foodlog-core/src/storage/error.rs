//! Storage error handling
//!
//! Provides typed errors for store operations with descriptive messages
//! and recovery suggestions.

use std::io;
use std::path::PathBuf;

use rusqlite::ffi::ErrorCode;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// The store could not be opened
    #[error("Local store at '{path}' is unavailable: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// The store was written by a newer schema version
    #[error("Local store at '{path}' has schema version {found}, but this build supports up to {expected}")]
    SchemaConflict {
        path: PathBuf,
        found: i32,
        expected: i32,
    },

    /// Failed to create data directory
    #[error("Failed to create data directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A write transaction failed and was rolled back
    #[error("Failed to persist entry '{id}': {source}")]
    Persist {
        id: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Disk is full or quota exceeded
    #[error("Disk full or quota exceeded while writing entry '{id}'")]
    DiskFull {
        id: String,
        #[source]
        source: rusqlite::Error,
    },

    /// A stored row could not be turned back into an entry
    #[error("Stored entry '{id}' is invalid: {details}")]
    InvalidRow { id: String, details: String },

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The blocking storage task did not complete
    #[error("Storage task failed: {0}")]
    Task(String),
}

impl StorageError {
    /// Create an error from a failed write, classifying quota failures
    pub fn from_write(error: rusqlite::Error, id: &str) -> Self {
        if is_disk_full_error(&error) {
            StorageError::DiskFull {
                id: id.to_string(),
                source: error,
            }
        } else {
            StorageError::Persist {
                id: id.to_string(),
                source: error,
            }
        }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StorageError::DiskFull { .. }
                | StorageError::CreateDirectory { .. }
                | StorageError::SchemaConflict { .. }
        )
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::DiskFull { .. } => Some("Free up disk space and try again."),
            StorageError::CreateDirectory { .. } => {
                Some("Check that the parent directory exists and you have write permissions.")
            }
            StorageError::SchemaConflict { .. } => {
                Some("The store was created by a newer version of foodlog. Upgrade foodlog or point data_dir at a different directory.")
            }
            StorageError::Unavailable { .. } => {
                Some("Check that data_dir is readable and writable and that no other process holds the database locked.")
            }
            _ => None,
        }
    }
}

/// Check if a SQLite error indicates a disk full condition
fn is_disk_full_error(error: &rusqlite::Error) -> bool {
    if let rusqlite::Error::SqliteFailure(failure, _) = error {
        if failure.code == ErrorCode::DiskFull {
            return true;
        }
    }

    let msg = error.to_string().to_lowercase();
    msg.contains("database or disk is full")
        || msg.contains("no space left")
        || msg.contains("quota exceeded")
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_failure(code: i32) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(code), None)
    }

    #[test]
    fn test_disk_full_classification() {
        let err = StorageError::from_write(sqlite_failure(rusqlite::ffi::SQLITE_FULL), "e1");

        assert!(matches!(err, StorageError::DiskFull { .. }));
        assert!(err.is_recoverable());
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_disk_full_message_leaves_suggestion_out() {
        let err = StorageError::from_write(sqlite_failure(rusqlite::ffi::SQLITE_FULL), "e1");
        let suggestion = err.recovery_suggestion().unwrap();

        // Callers append the suggestion; the message must not repeat it
        assert!(err.to_string().contains("'e1'"));
        assert!(!err.to_string().contains(suggestion));
    }

    #[test]
    fn test_constraint_is_persist_error() {
        let err = StorageError::from_write(sqlite_failure(rusqlite::ffi::SQLITE_CONSTRAINT), "e1");

        assert!(matches!(err, StorageError::Persist { ref id, .. } if id == "e1"));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_schema_conflict_display() {
        let err = StorageError::SchemaConflict {
            path: PathBuf::from("/data/foodlog.db"),
            found: 3,
            expected: 1,
        };

        let msg = err.to_string();
        assert!(msg.contains("schema version 3"));
        assert!(msg.contains("/data/foodlog.db"));
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_unavailable_display() {
        let err = StorageError::Unavailable {
            path: PathBuf::from("/readonly/foodlog.db"),
            source: sqlite_failure(rusqlite::ffi::SQLITE_CANTOPEN),
        };

        assert!(err.to_string().contains("unavailable"));
        assert!(!err.is_recoverable());
    }
}
