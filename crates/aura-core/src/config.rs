//! Configuration
//!
//! Resolution order:
//! 1. Explicit path (`--config`)
//! 2. Override in data dir (~/.local/share/aura/config/aura.toml)
//! 3. Embedded defaults (compiled into binary)
//!
//! Environment variables then override file values:
//! - `AURA_DB`: vault path
//! - `AURA_DB_KEY`: encryption passphrase (never read from a file)

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::db::DB_KEY_ENV;
use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/aura.toml");

/// Environment variable overriding the vault path
pub const DB_PATH_ENV: &str = "AURA_DB";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub encrypt: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    pub dir: PathBuf,
    pub compress: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuraConfig {
    pub database: DatabaseConfig,
    pub export: ExportConfig,
}

impl AuraConfig {
    /// Built-in defaults rooted at `data_dir`
    pub fn defaults_in(data_dir: &Path) -> Self {
        Self {
            database: DatabaseConfig {
                path: data_dir.join("aura.db"),
                encrypt: true,
            },
            export: ExportConfig {
                dir: data_dir.join("exports"),
                compress: false,
            },
        }
    }

    /// Load config and apply environment overrides
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let data_dir = default_data_dir();
        let content = match explicit {
            Some(path) => read_config(path)?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => read_config(&path)?,
                None => DEFAULT_CONFIG.to_string(),
            },
        };

        let mut config = parse_config(&content, &data_dir)?;
        if let Ok(path) = std::env::var(DB_PATH_ENV) {
            if !path.trim().is_empty() {
                config.database.path = PathBuf::from(path);
            }
        }

        debug!(
            db = %config.database.path.display(),
            encrypt = config.database.encrypt,
            "Config loaded"
        );
        Ok(config)
    }
}

/// Passphrase from `AURA_DB_KEY`, if set and non-empty
pub fn passphrase_from_env() -> Option<String> {
    std::env::var(DB_KEY_ENV)
        .ok()
        .filter(|key| !key.is_empty())
}

/// Aura data directory (~/.local/share/aura on Linux)
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("aura"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("aura").join("config").join("aura.toml"))
}

fn read_config(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    database: Option<RawDatabase>,
    export: Option<RawExport>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDatabase {
    path: Option<PathBuf>,
    encrypt: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawExport {
    dir: Option<PathBuf>,
    compress: Option<bool>,
}

/// Parse config from TOML content; relative paths resolve against `data_dir`
fn parse_config(content: &str, data_dir: &Path) -> Result<AuraConfig> {
    let raw: RawConfig =
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

    let mut config = AuraConfig::defaults_in(data_dir);

    if let Some(database) = raw.database {
        if let Some(path) = database.path {
            config.database.path = data_dir.join(path);
        }
        if let Some(encrypt) = database.encrypt {
            config.database.encrypt = encrypt;
        }
    }

    if let Some(export) = raw.export {
        if let Some(dir) = export.dir {
            config.export.dir = data_dir.join(dir);
        }
        if let Some(compress) = export.compress {
            config.export.compress = compress;
        }
    }

    Ok(config)
}
