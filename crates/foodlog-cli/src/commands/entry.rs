//! Entry command handlers

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use tracing::debug;

use foodlog_core::{
    Config, EntryRepository, FoodEntry, NewFoodEntry, StorageError, StoreProvider,
    SyncCoordinator,
};

use super::parse_time;
use crate::output::Output;

/// Arguments for `add`
#[derive(Debug, Clone)]
pub struct AddArgs {
    pub name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub at: Option<String>,
    pub owner: Option<String>,
    pub id: Option<String>,
}

/// Log a food entry, then push it if online
pub async fn add(config: &Config, args: AddArgs, offline: bool, output: &Output) -> Result<()> {
    let occurred_at = match args.at.as_deref() {
        Some(at) => parse_time(at)?,
        None => Utc::now(),
    };
    let owner = args.owner.unwrap_or_else(|| config.owner_id.clone());

    let mut new = NewFoodEntry::new(owner, args.name, occurred_at).with_nutrition(
        args.calories,
        args.protein,
        args.carbs,
        args.fat,
    );
    if let Some(id) = args.id {
        new = new.with_id(id);
    }

    let provider = StoreProvider::from_config(config);
    let mut repo = EntryRepository::new(provider.clone());
    let mut events = repo
        .take_events()
        .context("Repository events already taken")?;

    let id = repo.insert(new).await.map_err(storage_failure)?;

    let entry = repo
        .get(&id)
        .await
        .map_err(storage_failure)?
        .with_context(|| format!("Entry {} missing after insert", id))?;
    output.print_entry(&entry);

    // Drain the insert event so an online add is pushed before exit
    if let Some(engine) = super::sync::engine(config, &provider, offline)? {
        let coordinator = SyncCoordinator::new(engine);
        while let Ok(event) = events.try_recv() {
            if let Some(sync) = coordinator.handle_event(event) {
                match sync.await {
                    Ok(outcome) => debug!("Sync after add: {:?}", outcome),
                    Err(e) => debug!("Sync task failed: {}", e),
                }
            }
        }
    }

    Ok(())
}

/// List entries for an owner, optionally within `[from, to)`
pub async fn list(
    config: &Config,
    owner: Option<String>,
    from: Option<String>,
    to: Option<String>,
    output: &Output,
) -> Result<()> {
    if from.is_some() != to.is_some() {
        output.message("Note: both --from and --to are needed to filter by time.");
    }

    let entries = find(config, owner, from.as_deref(), to.as_deref()).await?;
    output.print_entries(&entries);

    Ok(())
}

/// Entries for `list`, with the time bounds parsed
async fn find(
    config: &Config,
    owner: Option<String>,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<Vec<FoodEntry>> {
    let from = from.map(parse_time).transpose()?;
    let to = to.map(parse_time).transpose()?;

    let owner = owner.unwrap_or_else(|| config.owner_id.clone());
    let repo = EntryRepository::new(StoreProvider::from_config(config));

    repo.try_query(&owner, from, to).await.map_err(storage_failure)
}

/// Attach the recovery suggestion, if any, to a storage error
fn storage_failure(error: StorageError) -> anyhow::Error {
    match error.recovery_suggestion() {
        Some(suggestion) => anyhow!("{}\n{}", error, suggestion),
        None => anyhow::Error::new(error),
    }
}
