use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "relent", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a new task
    ///
    /// Example: relent add "Call the bank" --interval 15
    /// Example: ask-parser "dentist friday 3pm" | relent add --parsed -
    Add {
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// RFC3339 timestamp, defaults to 24 hours from now
        #[arg(long)]
        deadline: Option<String>,
        /// Minutes between reminders once overdue
        #[arg(long, allow_negative_numbers = true)]
        interval: Option<i64>,
        /// Create from a task parser's JSON reply ("-" reads stdin)
        #[arg(
            long,
            value_name = "JSON",
            conflicts_with_all = ["title", "description", "deadline", "interval"]
        )]
        parsed: Option<String>,
    },
    /// List tasks, newest first
    ///
    /// Example: relent list --search bank
    List {
        #[arg(long)]
        search: Option<String>,
    },
    /// Show details of a task
    ///
    /// Example: relent show 3f2a
    Show { id: String },
    /// Edit a task
    ///
    /// Example: relent edit 3f2a --title "Call the bank again"
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        deadline: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        interval: Option<i64>,
    },
    /// Toggle a task between pending and done
    ///
    /// Example: relent done 3f2a
    Done { id: String },
    /// Delete a task
    ///
    /// Example: relent delete 3f2a
    Delete { id: String },
    /// Show the most recent reminders
    ///
    /// Example: relent log --limit 10
    Log {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show task and reminder counts
    Stats,
    /// Run one reminder pass now
    Tick,
    /// Interactive slash-command console with reminders running in the background
    ///
    /// Example: relent console
    Console,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverride {
    TickIntervalSecs(u64),
    Notifications(bool),
    StoreDir(PathBuf),
}

/// Parse a raw `KEY=VALUE` override string into a typed value.
pub fn parse_config_override(raw: &str) -> Result<ConfigOverride, String> {
    let (key_raw, value_raw) = raw
        .trim()
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let value = value_raw.trim();
    let field =
        canonicalize_flag_name(key_raw).ok_or_else(|| "override key cannot be empty".to_string())?;

    match field.as_str() {
        "tick_interval_secs" | "tick_interval" | "tick" => {
            let secs = value
                .parse::<u64>()
                .map_err(|_| format!("invalid tick interval '{value}'"))?;
            if secs == 0 {
                return Err("tick interval must be greater than zero".to_string());
            }
            Ok(ConfigOverride::TickIntervalSecs(secs))
        }
        "notifications" => match value.to_ascii_lowercase().as_str() {
            "true" | "on" | "yes" | "1" => Ok(ConfigOverride::Notifications(true)),
            "false" | "off" | "no" | "0" => Ok(ConfigOverride::Notifications(false)),
            _ => Err(format!("invalid notifications value '{value}'")),
        },
        "store_dir" => {
            if value.is_empty() {
                Err("store_dir override cannot be empty".to_string())
            } else {
                Ok(ConfigOverride::StoreDir(PathBuf::from(value)))
            }
        }
        other => Err(format!("unknown config field '{other}'")),
    }
}

fn canonicalize_flag_name(name: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
