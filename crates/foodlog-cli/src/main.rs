//! Foodlog CLI
//!
//! Command-line interface for foodlog - an offline-first food diary.

use std::fs::OpenOptions;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use foodlog_core::Config;

mod commands;
mod output;

use commands::entry::AddArgs;
use output::{Output, OutputFormat};

/// Log level when FOODLOG_LOG is not set
const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Parser)]
#[command(name = "foodlog")]
#[command(about = "Foodlog - Offline-first food diary")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Treat the network as unavailable (nothing is pushed)
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log a food entry
    Add {
        /// Food name
        name: String,
        /// Energy in kcal
        #[arg(long, default_value_t = 0.0)]
        calories: f64,
        /// Protein in grams
        #[arg(long, default_value_t = 0.0)]
        protein: f64,
        /// Carbohydrates in grams
        #[arg(long, default_value_t = 0.0)]
        carbs: f64,
        /// Fat in grams
        #[arg(long, default_value_t = 0.0)]
        fat: f64,
        /// When it was eaten (RFC 3339 or YYYY-MM-DD, default now)
        #[arg(long)]
        at: Option<String>,
        /// Owner id (default from config)
        #[arg(long)]
        owner: Option<String>,
        /// Use this id instead of generating one
        #[arg(long)]
        id: Option<String>,
    },
    /// List entries
    #[command(alias = "ls")]
    List {
        /// Owner id (default from config)
        #[arg(long)]
        owner: Option<String>,
        /// Start of range, inclusive (needs --to)
        #[arg(long)]
        from: Option<String>,
        /// End of range, exclusive (needs --from)
        #[arg(long)]
        to: Option<String>,
    },
    /// Push unsynced entries to the remote endpoint
    Sync,
    /// Show store and sync status
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, sync_url, sync_enabled, owner_id, ...)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands work even when the config file is broken
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), config_path, &output);
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    init_logging(&config);

    match cli.command {
        Commands::Add {
            name,
            calories,
            protein,
            carbs,
            fat,
            at,
            owner,
            id,
        } => {
            let args = AddArgs {
                name,
                calories,
                protein,
                carbs,
                fat,
                at,
                owner,
                id,
            };
            commands::entry::add(&config, args, cli.offline, &output).await
        }
        Commands::List { owner, from, to } => {
            commands::entry::list(&config, owner, from, to, &output).await
        }
        Commands::Sync => commands::sync::sync(&config, cli.offline, &output).await,
        Commands::Status => commands::status::show(&config, cli.offline, &output).await,
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Initialize logging
///
/// Level comes from FOODLOG_LOG (warnings only when unset). Logs go to
/// stderr, or to config.log_file when one is configured.
fn init_logging(config: &Config) {
    let log_level = std::env::var("FOODLOG_LOG").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string());
    let env_filter = EnvFilter::new(format!(
        "foodlog_core={},foodlog_cli={}",
        log_level, log_level
    ));

    let Some(ref log_path) = config.log_file else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
        return;
    };

    let log_file = match OpenOptions::new().create(true).append(true).open(log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
            return;
        }
    };

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_add() {
        let cli = Cli::try_parse_from([
            "foodlog",
            "add",
            "Apple",
            "--calories",
            "95",
            "--carbs",
            "25",
            "--at",
            "2026-03-01T08:00:00Z",
            "--offline",
        ])
        .unwrap();

        assert!(cli.offline);
        match cli.command {
            Commands::Add {
                name,
                calories,
                carbs,
                protein,
                at,
                ..
            } => {
                assert_eq!(name, "Apple");
                assert_eq!(calories, 95.0);
                assert_eq!(carbs, 25.0);
                assert_eq!(protein, 0.0);
                assert_eq!(at.as_deref(), Some("2026-03-01T08:00:00Z"));
            }
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["foodlog", "list", "--json", "--config", "/tmp/c.toml"])
            .unwrap();

        assert!(cli.json);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        assert!(matches!(cli.command, Commands::List { .. }));
    }

    #[test]
    fn test_config_without_subcommand() {
        let cli = Cli::try_parse_from(["foodlog", "config"]).unwrap();
        assert!(matches!(cli.command, Commands::Config { command: None }));
    }
}
