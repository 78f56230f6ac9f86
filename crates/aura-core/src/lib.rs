//! Aura Core Library
//!
//! Persistence and derivation layer for the Aura voice capture vault:
//! - Entity store (SQLite, optionally SQLCipher-encrypted)
//! - Category vocabulary with case-insensitive matching
//! - Derivation of typed records from classified captures
//! - Merge import and export of backup documents
//! - Analytics over loaded collections
//! - Vault session keeping an in-memory view behind disk
//! - Offline keyword classifier

pub mod analytics;
pub mod archive;
pub mod capture;
pub mod classify;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod vault;
pub mod vocabulary;

pub use analytics::{Analytics, CategorySpend, DateRange, TaskStats};
pub use capture::{derive, CaptureTime, Derivation, Draft};
pub use classify::{Classification, Classifier, KeywordClassifier};
pub use config::AuraConfig;
pub use db::{Database, StoredRecord, TableCounts};
pub use error::{Error, Result};
pub use export::{ImportStats, ReferencePolicy};
pub use models::{
    ChildRecord, Expense, Intent, MoodRecord, NoteRecord, Priority, Snapshot, Table, Task,
    VoiceEntry,
};
pub use vault::Vault;
pub use vocabulary::CategoryVocabulary;
