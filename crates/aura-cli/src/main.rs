//! Aura CLI - Local vault for classified voice captures
//!
//! Usage:
//!   aura init                          Initialize the vault
//!   aura capture "spent 250 on lunch"  Classify and store an utterance
//!   aura report --period week          Spending, mood and task report
//!   aura export --compress             Write a backup document

mod cli;
mod commands;


use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let settings =
        commands::Settings::resolve(cli.db.as_deref(), cli.config.as_deref(), cli.no_encrypt)?;

    match cli.command {
        Commands::Init => commands::cmd_init(&settings).await,
        Commands::Status => commands::cmd_status(&settings).await,
        command => {
            let vault = commands::open_vault(&settings)?;
            vault.init().await.context("Failed to open vault")?;
            run(&vault, &settings, command).await
        }
    }
}

async fn run(vault: &aura_core::Vault, settings: &commands::Settings, command: Commands) -> Result<()> {
    match command {
        Commands::Capture {
            text,
            intent,
            entities,
            confidence,
        } => {
            commands::cmd_capture(
                vault,
                &text,
                intent.as_deref(),
                entities.as_deref(),
                confidence,
            )
            .await
        }
        Commands::History { intent, limit } => {
            commands::cmd_history(vault, intent.as_deref(), limit).await
        }
        Commands::Tasks { action } => match action {
            None => commands::cmd_tasks_list(vault, false).await,
            Some(TasksAction::List { all }) => commands::cmd_tasks_list(vault, all).await,
            Some(TasksAction::Toggle { id }) => commands::cmd_tasks_toggle(vault, &id).await,
        },
        Commands::Categories { action } => match action {
            None | Some(CategoriesAction::List) => commands::cmd_categories_list(vault).await,
            Some(CategoriesAction::Add { name }) => commands::cmd_categories_add(vault, &name).await,
        },
        Commands::Report {
            period,
            from,
            to,
            json,
        } => commands::cmd_report(vault, &period, from.as_deref(), to.as_deref(), json).await,
        Commands::Export { output, compress } => {
            commands::cmd_export(vault, settings, output.as_deref(), compress).await
        }
        Commands::Import { file, strict } => commands::cmd_import(vault, &file, strict).await,
        Commands::Purge { yes } => commands::cmd_purge(vault, yes).await,
        // Handled before the vault is opened
        Commands::Init | Commands::Status => Ok(()),
    }
}
