//! Sync command handler

use std::sync::Arc;

use anyhow::{bail, Context, Result};

use foodlog_core::{Config, HttpRemote, ManualConnectivity, StoreProvider, SyncEngine};

use crate::output::Output;

/// Build a sync engine for the configured endpoint
///
/// Returns `None` when sync is disabled or no endpoint is set. With
/// `offline`, the engine sees no connectivity and never touches the
/// network.
pub fn engine(
    config: &Config,
    provider: &StoreProvider,
    offline: bool,
) -> Result<Option<Arc<SyncEngine>>> {
    let Some(endpoint) = config.sync_endpoint() else {
        return Ok(None);
    };

    let remote = HttpRemote::new(endpoint, config.request_timeout())
        .context("Failed to create HTTP client")?;
    let connectivity = ManualConnectivity::new(!offline).without_deferred_sync();

    Ok(Some(Arc::new(SyncEngine::new(
        provider.clone(),
        Arc::new(remote),
        Arc::new(connectivity),
    ))))
}

/// Push all unsynced entries to the remote endpoint
pub async fn sync(config: &Config, offline: bool, output: &Output) -> Result<()> {
    if !config.sync_enabled {
        bail!(
            "Sync is not enabled. Enable it with:\n  \
             foodlog config set sync_enabled true\n  \
             foodlog config set sync_url https://your-server/api/food-entries"
        );
    }

    let provider = StoreProvider::from_config(config);
    let Some(engine) = engine(config, &provider, offline)? else {
        bail!(
            "Sync URL not configured. Set it with:\n  \
             foodlog config set sync_url https://your-server/api/food-entries"
        );
    };

    output.message("Syncing entries...");
    let outcome = engine.sync_all().await;
    output.print_sync_outcome(&outcome);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(temp_dir: &TempDir) -> Config {
        Config {
            data_dir: temp_dir.path().to_path_buf(),
            ..Config::default()
        }
    }

    #[test]
    fn test_no_engine_without_endpoint() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config(&temp_dir);
        let provider = StoreProvider::from_config(&config);

        assert!(engine(&config, &provider, false).unwrap().is_none());

        // A URL alone is not enough
        config.sync_url = Some("http://127.0.0.1:9/entries".to_string());
        assert!(engine(&config, &provider, false).unwrap().is_none());

        config.sync_enabled = true;
        assert!(engine(&config, &provider, false).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_sync_disabled_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let output = Output::new(crate::output::OutputFormat::Quiet);

        let err = sync(&config(&temp_dir), false, &output).await.unwrap_err();
        assert!(err.to_string().contains("not enabled"));
    }

    #[tokio::test]
    async fn test_offline_engine_reports_offline() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            sync_enabled: true,
            sync_url: Some("http://127.0.0.1:9/entries".to_string()),
            ..config(&temp_dir)
        };
        let provider = StoreProvider::from_config(&config);

        let engine = engine(&config, &provider, true).unwrap().unwrap();
        assert_eq!(engine.sync_all().await, foodlog_core::SyncOutcome::Offline);
    }
}
