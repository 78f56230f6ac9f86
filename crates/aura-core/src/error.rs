//! Error types for Aura

use thiserror::Error;

use crate::models::Table;

#[derive(Error, Debug)]
pub enum Error {
    /// The backend could not be opened or its schema is unusable. Fatal at startup.
    #[error("Storage init error: {0}")]
    StorageInit(String),

    /// A put/commit against one table failed; the operation was rolled back.
    #[error("Storage write error on {table}: {source}")]
    StorageWrite {
        table: Table,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Import parse error: {0}")]
    ImportParse(String),

    #[error("Unresolved reference: {table} row {id} points at missing voice entry {entry_id}")]
    UnresolvedReference {
        table: Table,
        id: String,
        entry_id: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl Error {
    /// Build a `map_err` adapter that tags a backend failure with its table
    pub(crate) fn write(table: Table) -> impl FnOnce(rusqlite::Error) -> Error {
        move |source| Error::StorageWrite { table, source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
