//! Food entry repository
//!
//! Insert and query operations over the local store. The repository knows
//! nothing about the network: a successful insert is announced on an event
//! channel, and whoever owns the receiver decides whether to sync.
//!
//! ## Usage
//!
//! ```ignore
//! let mut repo = EntryRepository::new(StoreProvider::from_config(&config));
//! let events = repo.take_events();
//!
//! let id = repo.insert(NewFoodEntry::new("u1", "Apple", Utc::now())).await?;
//! let today = repo.query("u1", Some(start), Some(end)).await;
//! ```

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::models::{truncate_to_millis, FoodEntry, NewFoodEntry};
use crate::storage::{StorageResult, StoreProvider};

/// Events emitted by the repository after a commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryEvent {
    /// A new entry was committed and is waiting to be synced
    EntryInserted { id: String },
}

/// Repository for food entries
pub struct EntryRepository {
    provider: StoreProvider,
    event_tx: mpsc::UnboundedSender<RepositoryEvent>,
    event_rx: Option<mpsc::UnboundedReceiver<RepositoryEvent>>,
}

impl EntryRepository {
    /// Create a repository over the given store
    pub fn new(provider: StoreProvider) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            provider,
            event_tx,
            event_rx: Some(event_rx),
        }
    }

    /// The store this repository reads and writes
    pub fn provider(&self) -> &StoreProvider {
        &self.provider
    }

    /// Take the event receiver (can only be called once)
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<RepositoryEvent>> {
        self.event_rx.take()
    }

    /// Insert a new entry and return its id
    ///
    /// Generates an id when none is given and always stores the entry as
    /// unsynced. The entry is durable once this returns `Ok`.
    pub async fn insert(&self, new: NewFoodEntry) -> StorageResult<String> {
        let entry = new.into_entry();
        let id = entry.id.clone();

        self.provider
            .with_handle(move |handle| handle.insert_entry(&entry))
            .await?;

        debug!("Inserted entry {}", id);

        // Nobody listening is fine; the entry stays in the unsynced set
        let _ = self
            .event_tx
            .send(RepositoryEvent::EntryInserted { id: id.clone() });

        Ok(id)
    }

    /// Entries for an owner, optionally limited to `[start, end)`
    ///
    /// The range applies only when both bounds are given. Failures are
    /// logged and produce an empty result. Order is unspecified.
    pub async fn query(
        &self,
        owner_id: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Vec<FoodEntry> {
        match self.try_query(owner_id, start, end).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Query for owner {} failed: {}", owner_id, e);
                Vec::new()
            }
        }
    }

    /// Like [`query`](Self::query), but reports failures
    pub async fn try_query(
        &self,
        owner_id: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> StorageResult<Vec<FoodEntry>> {
        let owner = owner_id.to_string();
        let entries = self
            .provider
            .with_handle(move |handle| handle.entries_for_owner(&owner))
            .await?;

        // Stored times have millisecond precision, so compare at that precision
        Ok(match (start, end) {
            (Some(start), Some(end)) => {
                let (start, end) = (truncate_to_millis(start), truncate_to_millis(end));
                entries
                    .into_iter()
                    .filter(|entry| within_range(entry, start, end))
                    .collect()
            }
            _ => entries,
        })
    }

    /// Get an entry by id
    pub async fn get(&self, id: &str) -> StorageResult<Option<FoodEntry>> {
        let id = id.to_string();
        self.provider
            .with_handle(move |handle| handle.get_entry(&id))
            .await
    }

    /// Number of entries waiting to be synced
    pub async fn unsynced_count(&self) -> StorageResult<usize> {
        self.provider
            .with_handle(|handle| handle.unsynced_count())
            .await
    }
}

/// Half-open range check: `start <= occurred_at < end`
pub fn within_range(entry: &FoodEntry, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    entry.occurred_at >= start && entry.occurred_at < end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::is_local_id;
    use crate::storage::StorageError;
    use chrono::{Duration, TimeZone};
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn repo(temp_dir: &TempDir) -> EntryRepository {
        EntryRepository::new(StoreProvider::new(temp_dir.path().join("foodlog.db")))
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn meal(owner: &str, name: &str, at: DateTime<Utc>) -> NewFoodEntry {
        NewFoodEntry::new(owner, name, at).with_nutrition(100.0, 1.0, 10.0, 1.0)
    }

    #[tokio::test]
    async fn test_insert_apple_then_query_window() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repo(&temp_dir);
        let new = NewFoodEntry::new("u1", "Apple", t0()).with_nutrition(95.0, 0.5, 25.0, 0.3);

        let id = repo.insert(new).await.unwrap();
        assert!(is_local_id(&id), "unexpected id: {}", id);

        let found = repo
            .query(
                "u1",
                Some(t0() - Duration::seconds(1)),
                Some(t0() + Duration::seconds(1)),
            )
            .await;

        assert_eq!(found.len(), 1);
        let apple = &found[0];
        assert_eq!(apple.id, id);
        assert_eq!(apple.name, "Apple");
        assert_eq!(apple.calories, 95.0);
        assert_eq!(apple.protein, 0.5);
        assert_eq!(apple.carbs, 25.0);
        assert_eq!(apple.fat, 0.3);
        assert_eq!(apple.occurred_at, t0());
        assert!(!apple.synced);
    }

    #[tokio::test]
    async fn test_insert_forces_unsynced() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repo(&temp_dir);
        let mut new = meal("u1", "Toast", t0());
        new.synced = Some(true);

        let id = repo.insert(new).await.unwrap();

        assert!(!repo.get(&id).await.unwrap().unwrap().synced);
        assert_eq!(repo.unsynced_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_insert_keeps_supplied_id() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repo(&temp_dir);

        let id = repo
            .insert(meal("u1", "Toast", t0()).with_id("server-7"))
            .await
            .unwrap();

        assert_eq!(id, "server-7");
        assert!(repo.get("server-7").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_insert_duplicate_id_is_persist_error() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repo(&temp_dir);
        repo.insert(meal("u1", "Toast", t0()).with_id("dup"))
            .await
            .unwrap();

        let err = repo
            .insert(meal("u1", "Jam", t0()).with_id("dup"))
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Persist { .. }));
        assert_eq!(repo.get("dup").await.unwrap().unwrap().name, "Toast");
    }

    #[tokio::test]
    async fn test_generated_ids_unique_across_inserts() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repo(&temp_dir);

        let mut ids = HashSet::new();
        for i in 0..10_000 {
            let id = repo
                .insert(meal("u1", "Snack", t0() + Duration::seconds(i)))
                .await
                .unwrap();
            ids.insert(id);
        }

        assert_eq!(ids.len(), 10_000);
        assert_eq!(repo.unsynced_count().await.unwrap(), 10_000);
    }

    #[tokio::test]
    async fn test_insert_emits_event() {
        let temp_dir = TempDir::new().unwrap();
        let mut repo = repo(&temp_dir);
        let mut events = repo.take_events().unwrap();
        assert!(repo.take_events().is_none());

        let id = repo.insert(meal("u1", "Toast", t0())).await.unwrap();

        assert_eq!(
            events.try_recv().unwrap(),
            RepositoryEvent::EntryInserted { id }
        );
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failed_insert_emits_no_event() {
        let temp_dir = TempDir::new().unwrap();
        let mut repo = repo(&temp_dir);
        let mut events = repo.take_events().unwrap();
        repo.insert(meal("u1", "Toast", t0()).with_id("dup"))
            .await
            .unwrap();
        events.try_recv().unwrap();

        assert!(repo
            .insert(meal("u1", "Toast", t0()).with_id("dup"))
            .await
            .is_err());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_query_isolates_owners() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repo(&temp_dir);
        let a = repo.insert(meal("u1", "Oats", t0())).await.unwrap();
        let b = repo.insert(meal("u1", "Eggs", t0())).await.unwrap();
        repo.insert(meal("u2", "Rice", t0())).await.unwrap();

        let ids: HashSet<String> = repo
            .query("u1", None, None)
            .await
            .into_iter()
            .map(|e| e.id)
            .collect();

        assert_eq!(ids, HashSet::from([a, b]));
        assert!(repo.query("u3", None, None).await.is_empty());
    }

    #[tokio::test]
    async fn test_query_range_is_half_open() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repo(&temp_dir);
        let start = t0();
        let end = t0() + Duration::hours(1);

        let at_start = repo.insert(meal("u1", "Start", start)).await.unwrap();
        let inside = repo
            .insert(meal("u1", "Inside", start + Duration::minutes(30)))
            .await
            .unwrap();
        repo.insert(meal("u1", "AtEnd", end)).await.unwrap();
        repo.insert(meal("u1", "Before", start - Duration::milliseconds(1)))
            .await
            .unwrap();

        let ids: HashSet<String> = repo
            .query("u1", Some(start), Some(end))
            .await
            .into_iter()
            .map(|e| e.id)
            .collect();

        assert_eq!(ids, HashSet::from([at_start, inside]));
    }

    #[tokio::test]
    async fn test_query_single_bound_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repo(&temp_dir);
        repo.insert(meal("u1", "Early", t0() - Duration::days(2)))
            .await
            .unwrap();
        repo.insert(meal("u1", "Late", t0() + Duration::days(2)))
            .await
            .unwrap();

        assert_eq!(repo.query("u1", Some(t0()), None).await.len(), 2);
        assert_eq!(repo.query("u1", None, Some(t0())).await.len(), 2);
    }

    #[tokio::test]
    async fn test_query_failure_returns_empty() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repo(&temp_dir);
        repo.insert(meal("u1", "Toast", t0())).await.unwrap();

        // Replace the store with something SQLite cannot read
        std::fs::write(repo.provider().path(), "garbage\n".repeat(128)).unwrap();

        assert!(repo.try_query("u1", None, None).await.is_err());
        assert!(repo.query("u1", None, None).await.is_empty());
    }

    #[tokio::test]
    async fn test_query_start_with_sub_millisecond_digits() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repo(&temp_dir);
        let at = t0() + Duration::nanoseconds(123_456_789);

        let id = repo.insert(meal("u1", "Coffee", at)).await.unwrap();

        // Same instant as inserted, and the range ending on it
        let found = repo.query("u1", Some(at), Some(at + Duration::seconds(1))).await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, id);
        assert!(repo.query("u1", Some(at - Duration::seconds(1)), Some(at)).await.is_empty());
    }

    #[test]
    fn test_within_range_boundaries() {
        let entry = meal("u1", "Toast", t0()).into_entry();

        assert!(within_range(&entry, t0(), t0() + Duration::seconds(1)));
        assert!(!within_range(&entry, t0() - Duration::seconds(1), t0()));
        assert!(!within_range(&entry, t0(), t0()));
    }
}
