//! Status command handler

use anyhow::Result;

use foodlog_core::storage::SCHEMA_VERSION;
use foodlog_core::{Config, EntryRepository, StoreProvider};

use crate::output::{Output, OutputFormat};

/// Show store and sync status
pub async fn show(config: &Config, offline: bool, output: &Output) -> Result<()> {
    let provider = StoreProvider::from_config(config);
    let exists = provider.exists();
    let size = std::fs::metadata(provider.path()).map(|m| m.len()).unwrap_or(0);

    // Don't create the store just to report on it
    let unsynced = if exists {
        EntryRepository::new(provider.clone())
            .unsynced_count()
            .await
            .ok()
    } else {
        Some(0)
    };

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "owner_id": config.owner_id,
                    "sync_enabled": config.sync_enabled,
                    "sync_url": config.sync_url,
                    "offline": offline,
                    "storage": {
                        "path": provider.path(),
                        "exists": exists,
                        "size": size,
                        "schema_version": SCHEMA_VERSION
                    },
                    "unsynced": unsynced
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", unsynced.map_or_else(|| "?".to_string(), |n| n.to_string()));
        }
        OutputFormat::Human => {
            println!("Foodlog Status");
            println!("==============");
            println!();
            println!("Owner: {}", config.owner_id);
            println!();
            println!("Sync:");
            println!(
                "  Status: {}",
                match (config.sync_endpoint().is_some(), offline) {
                    (false, _) => "disabled",
                    (true, true) => "offline",
                    (true, false) => "enabled",
                }
            );
            if let Some(ref url) = config.sync_url {
                println!("  Server: {}", url);
            }
            println!();
            println!("Storage:");
            println!("  Location: {}", provider.path().display());
            println!("  Size:     {}", format_size(size));
            println!();
            match unsynced {
                Some(n) => println!("Unsynced entries: {}", n),
                None => println!("Unsynced entries: unavailable (store could not be opened)"),
            }
        }
    }

    Ok(())
}

/// Human-readable byte count
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
