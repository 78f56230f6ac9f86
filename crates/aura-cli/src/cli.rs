//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Aura - Voice capture vault
#[derive(Parser)]
#[command(name = "aura")]
#[command(about = "Local vault for classified voice captures", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path (overrides config and AURA_DB)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Config file (default: ~/.local/share/aura/config/aura.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for real data)
    ///
    /// By default, the vault is encrypted using SQLCipher.
    /// Set AURA_DB_KEY environment variable with your passphrase.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the vault
    Init,

    /// Capture an utterance and store its derived record
    Capture {
        /// Transcript text
        text: String,

        /// Intent (expense, todo, reminder, mood, note); classified offline if omitted
        #[arg(short, long)]
        intent: Option<String>,

        /// Extracted entities as a JSON object, e.g. '{"amount": 250, "category": "Food"}'
        #[arg(short, long)]
        entities: Option<String>,

        /// Classifier confidence (0-1)
        #[arg(long)]
        confidence: Option<f64>,
    },

    /// Show captured entries, newest first
    History {
        /// Filter by intent
        #[arg(short, long)]
        intent: Option<String>,

        /// Maximum number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Manage tasks and reminders
    Tasks {
        #[command(subcommand)]
        action: Option<TasksAction>,
    },

    /// Manage expense categories
    Categories {
        #[command(subcommand)]
        action: Option<CategoriesAction>,
    },

    /// Spending, mood and task report for a period
    Report {
        /// Period: month, week, today, all
        #[arg(short, long, default_value = "month")]
        period: String,

        /// Custom start date (YYYY-MM-DD), requires --to
        #[arg(long)]
        from: Option<String>,

        /// Custom end date (YYYY-MM-DD), requires --from
        #[arg(long)]
        to: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export a backup document
    Export {
        /// Output file (.json or .json.gz); defaults to the export dir
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Gzip the default output file
        #[arg(long)]
        compress: bool,
    },

    /// Merge a backup document into the vault
    Import {
        /// Backup file (.json or .json.gz)
        #[arg(short, long)]
        file: PathBuf,

        /// Fail if any record points at a missing voice entry
        #[arg(long)]
        strict: bool,
    },

    /// Delete every record (categories reset to defaults)
    Purge {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show vault status
    Status,
}

#[derive(Subcommand)]
pub enum TasksAction {
    /// List tasks
    List {
        /// Include completed tasks
        #[arg(short, long)]
        all: bool,
    },
    /// Flip a task between pending and done
    Toggle {
        /// Task ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum CategoriesAction {
    /// List categories
    List,
    /// Add a category
    Add {
        /// Category name
        name: String,
    },
}
