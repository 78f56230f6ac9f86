//! Backup files on disk
//!
//! Exports are written to a temporary file in the destination directory and
//! then renamed into place, so a crash never leaves a truncated backup.
//! Paths ending in `.gz` are gzip-compressed.
//!
//! File naming: `aura_vault_YYYY-MM-DD.json` (or `.json.gz`)

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::NamedTempFile;
use tracing::info;

use crate::error::{Error, Result};

const NAME_PREFIX: &str = "aura_vault_";

/// Whether a path names a gzip-compressed backup
pub fn is_compressed(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

/// Default export file name for today
pub fn generate_export_name(compress: bool) -> String {
    export_name_for(Local::now().date_naive(), compress)
}

pub fn export_name_for(day: NaiveDate, compress: bool) -> String {
    let ext = if compress { "json.gz" } else { "json" };
    format!("{}{}.{}", NAME_PREFIX, day.format("%Y-%m-%d"), ext)
}

/// Atomically write a backup document to `path`
pub fn write_backup_file(path: &Path, json: &str) -> Result<PathBuf> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;

    let temp = NamedTempFile::new_in(&dir)?;
    {
        let mut writer = BufWriter::new(temp.as_file());
        if is_compressed(path) {
            let mut encoder = GzEncoder::new(&mut writer, Compression::default());
            encoder.write_all(json.as_bytes())?;
            encoder.finish()?;
        } else {
            writer.write_all(json.as_bytes())?;
        }
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;

    info!("Wrote backup: {}", path.display());
    Ok(path.to_path_buf())
}

/// Read a backup document, decompressing `.gz` files
pub fn read_backup_file(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(Error::NotFound(format!("Backup file {}", path.display())));
    }

    let reader = BufReader::new(File::open(path)?);
    let mut json = String::new();
    if is_compressed(path) {
        GzDecoder::new(reader).read_to_string(&mut json)?;
    } else {
        let mut reader = reader;
        reader.read_to_string(&mut json)?;
    }
    Ok(json)
}
