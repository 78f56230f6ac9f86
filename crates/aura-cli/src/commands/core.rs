//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `Settings` - Vault location and options resolved from config and flags
//! - `open_vault` - Shared utility to open the vault
//! - `cmd_init` - Initialize the vault
//! - `cmd_status` - Show vault status

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use aura_core::config::{passphrase_from_env, AuraConfig};
use aura_core::db::DB_KEY_ENV;
use aura_core::Vault;
use tracing::debug;

/// Effective settings after config file, environment and flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub db_path: PathBuf,
    pub encrypt: bool,
    pub export_dir: PathBuf,
    pub compress: bool,
}

impl Settings {
    /// Flags win over AURA_DB, which wins over the config file
    pub fn resolve(db: Option<&Path>, config: Option<&Path>, no_encrypt: bool) -> Result<Self> {
        let config = AuraConfig::load(config).context("Failed to load config")?;
        Ok(Self::from_config(config, db, no_encrypt))
    }

    pub fn from_config(config: AuraConfig, db: Option<&Path>, no_encrypt: bool) -> Self {
        Self {
            db_path: db
                .map(Path::to_path_buf)
                .unwrap_or(config.database.path),
            encrypt: config.database.encrypt && !no_encrypt,
            export_dir: config.export.dir,
            compress: config.export.compress,
        }
    }
}

/// Open the vault, encrypted unless disabled by --no-encrypt or config
pub fn open_vault(settings: &Settings) -> Result<Vault> {
    let path_str = settings
        .db_path
        .to_str()
        .context("Database path is not valid UTF-8")?;

    if let Some(parent) = settings.db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let passphrase = if settings.encrypt {
        Some(passphrase_from_env().with_context(|| {
            format!(
                "Database encryption required. Set {} with your passphrase, or use --no-encrypt",
                DB_KEY_ENV
            )
        })?)
    } else {
        None
    };

    debug!(path = %settings.db_path.display(), encrypt = settings.encrypt, "Opening vault");
    Ok(Vault::new(path_str, passphrase))
}

pub async fn cmd_init(settings: &Settings) -> Result<()> {
    println!("🔧 Initializing vault at {}...", settings.db_path.display());

    let vault = open_vault(settings)?;
    let db = vault.init().await.context("Failed to open vault")?;
    let version = db.schema_version()?;
    let categories = db.list_categories()?;

    println!("   Schema version: {}", version);
    println!("   Categories: {}", categories.join(", "));

    if db.is_encrypted() {
        println!("   🔒 Encryption: ENABLED");
    } else {
        println!("   ⚠️  Encryption: DISABLED");
    }

    println!("✅ Vault initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Capture something: aura capture \"spent 250 on lunch\"");
    println!("  2. See this month: aura report");

    Ok(())
}

pub async fn cmd_status(settings: &Settings) -> Result<()> {
    println!();
    println!("📊 Aura Status");
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Database: {}", settings.db_path.display());

    let exists = settings.db_path.exists();
    if exists {
        if let Ok(metadata) = fs::metadata(&settings.db_path) {
            let size_kb = metadata.len() as f64 / 1024.0;
            if size_kb < 1024.0 {
                println!("   Size: {:.1} KB", size_kb);
            } else {
                println!("   Size: {:.1} MB", size_kb / 1024.0);
            }
        }
    } else {
        println!("   Size: (vault not initialized)");
    }

    let has_key = passphrase_from_env().is_some();
    if !settings.encrypt {
        println!("   ⚠️  Encryption: DISABLED");
    } else if has_key {
        println!("   🔒 Encryption: ENABLED ({}=***)", DB_KEY_ENV);
    } else {
        println!("   ❌ Encryption: REQUIRED but {} not set", DB_KEY_ENV);
    }
    println!("   Exports: {}", settings.export_dir.display());

    if !exists {
        println!();
        println!("   Run 'aura init' to create the vault.");
        return Ok(());
    }

    let counts = match open_vault(settings) {
        Ok(vault) => vault.counts().await,
        Err(e) => {
            println!();
            println!("   ❌ Error opening vault: {}", e);
            return Ok(());
        }
    };

    match counts {
        Ok(counts) => {
            println!();
            println!("   Voice entries: {}", counts.voice_entries);
            println!("   Expenses: {}", counts.expenses);
            println!("   Tasks: {}", counts.tasks);
            println!("   Moods: {}", counts.moods);
            println!("   Notes: {}", counts.notes);
            println!("   Categories: {}", counts.categories);
        }
        Err(e) => {
            println!();
            println!("   ❌ Error opening vault: {}", e);
            if settings.encrypt && !has_key {
                println!("      Set {} or use --no-encrypt", DB_KEY_ENV);
            }
        }
    }

    Ok(())
}
