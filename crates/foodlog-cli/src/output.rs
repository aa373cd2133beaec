//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use foodlog_core::{FoodEntry, SyncOutcome};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print a single entry
    pub fn print_entry(&self, entry: &FoodEntry) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:       {}", entry.id);
                println!("Owner:    {}", entry.owner_id);
                println!("Name:     {}", entry.name);
                println!("Eaten:    {}", entry.occurred_at.format("%Y-%m-%d %H:%M"));
                println!("Calories: {}", entry.calories);
                println!(
                    "Macros:   {}g protein, {}g carbs, {}g fat",
                    entry.protein, entry.carbs, entry.fat
                );
                println!("Synced:   {}", if entry.synced { "yes" } else { "no" });
            }
            OutputFormat::Json => print_json(entry),
            OutputFormat::Quiet => {
                println!("{}", entry.id);
            }
        }
    }

    /// Print a list of entries, oldest first
    pub fn print_entries(&self, entries: &[FoodEntry]) {
        let mut entries: Vec<&FoodEntry> = entries.iter().collect();
        entries.sort_by_key(|entry| entry.occurred_at);

        match self.format {
            OutputFormat::Human => {
                if entries.is_empty() {
                    println!("No entries found.");
                    return;
                }
                for entry in &entries {
                    println!(
                        "{} | {} | {:>7.1} kcal | {}",
                        entry.occurred_at.format("%Y-%m-%d %H:%M"),
                        truncate(&entry.name, 30),
                        entry.calories,
                        if entry.synced { "synced" } else { "pending" }
                    );
                }
                let total: f64 = entries.iter().map(|entry| entry.calories).sum();
                println!("\n{} entr{}, {:.1} kcal", entries.len(), plural_y(entries.len()), total);
            }
            OutputFormat::Json => print_json(&entries),
            OutputFormat::Quiet => {
                for entry in &entries {
                    println!("{}", entry.id);
                }
            }
        }
    }

    /// Print the result of a sync run
    pub fn print_sync_outcome(&self, outcome: &SyncOutcome) {
        match self.format {
            OutputFormat::Human => match outcome {
                SyncOutcome::Offline => println!("Offline, nothing pushed."),
                SyncOutcome::Coalesced => println!("A sync is already running."),
                SyncOutcome::Completed(report) if report.attempted == 0 => {
                    println!("✓ Nothing to sync");
                }
                SyncOutcome::Completed(report) => {
                    println!("✓ Pushed {} of {} entries", report.pushed, report.attempted);
                    if report.failed > 0 {
                        println!("  {} left unsynced, will retry on next sync", report.failed);
                    }
                }
            },
            OutputFormat::Json => {
                let json = match outcome {
                    SyncOutcome::Offline => serde_json::json!({"status": "offline"}),
                    SyncOutcome::Coalesced => serde_json::json!({"status": "coalesced"}),
                    SyncOutcome::Completed(report) => serde_json::json!({
                        "status": "completed",
                        "passes": report.passes,
                        "attempted": report.attempted,
                        "pushed": report.pushed,
                        "failed": report.failed
                    }),
                };
                println!("{}", json);
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode JSON: {}", e),
    }
}

fn plural_y(count: usize) -> &'static str {
    if count == 1 {
        "y"
    } else {
        "ies"
    }
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
