//! Backup command implementations
//!
//! This module contains:
//! - `cmd_export` - Write the vault to a backup document
//! - `cmd_import` - Merge a backup document into the vault
//! - `cmd_purge` - Delete every record

use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use aura_core::archive::{generate_export_name, read_backup_file, write_backup_file};
use aura_core::{ReferencePolicy, Vault};

use super::core::Settings;

pub async fn cmd_export(
    vault: &Vault,
    settings: &Settings,
    output: Option<&Path>,
    compress: bool,
) -> Result<()> {
    let path = match output {
        Some(path) => path.to_path_buf(),
        None => settings
            .export_dir
            .join(generate_export_name(compress || settings.compress)),
    };

    println!("📦 Exporting vault...");
    let json = vault.export_backup_json().await?;
    let written = write_backup_file(&path, &json)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    let counts = vault.counts().await?;
    println!("✅ Export complete: {}", written.display());
    println!(
        "   {} entries, {} expenses, {} tasks, {} moods, {} notes, {} categories",
        counts.voice_entries,
        counts.expenses,
        counts.tasks,
        counts.moods,
        counts.notes,
        counts.categories
    );

    Ok(())
}

pub async fn cmd_import(vault: &Vault, file: &Path, strict: bool) -> Result<()> {
    let policy = if strict {
        ReferencePolicy::Strict
    } else {
        ReferencePolicy::Lenient
    };

    println!("📥 Importing from {}...", file.display());
    let json = read_backup_file(file)?;
    let stats = vault
        .import_backup_json(json, policy)
        .await
        .context("Import failed; vault left unchanged")?;

    println!("✅ Import complete: {} records", stats.total_records());
    println!("   Voice entries: {}", stats.voice_entries);
    println!("   Expenses: {}", stats.expenses);
    println!("   Tasks: {}", stats.tasks);
    println!("   Moods: {}", stats.moods);
    println!("   Notes: {}", stats.notes);
    println!("   New categories: {}", stats.categories);
    if stats.unresolved_references > 0 {
        println!(
            "   ⚠️  {} records pointed at missing voice entries and were linked to placeholders",
            stats.unresolved_references
        );
    }

    Ok(())
}

pub async fn cmd_purge(vault: &Vault, skip_confirm: bool) -> Result<()> {
    let counts = vault.counts().await?;
    let total = counts.voice_entries + counts.expenses + counts.tasks + counts.moods + counts.notes;

    println!();
    println!("⚠️  This will permanently delete:");
    println!("   • {} voice entries", counts.voice_entries);
    println!("   • {} expenses", counts.expenses);
    println!("   • {} tasks", counts.tasks);
    println!("   • {} moods", counts.moods);
    println!("   • {} notes", counts.notes);
    println!("   Categories will be reset to the defaults.");
    println!();

    if !skip_confirm {
        print!("Are you sure? [y/N] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    vault.purge_all().await.context("Failed to purge vault")?;
    println!("✅ Deleted {} records.", total);

    Ok(())
}
