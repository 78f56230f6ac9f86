//! Entity store: SQLite access layer with connection pooling
//!
//! This module is organized by concern:
//! - `records` - Per-table row mapping (`StoredRecord`) for entries and derived records
//! - `categories` - Category vocabulary table
//! - `capture` - Atomic commit of a voice entry with its derived record
//! - `tasks` - In-place task completion toggling
//!
//! Every public operation runs inside one backend transaction. Writes take
//! the write lock up front (`BEGIN IMMEDIATE`) so a failure never leaves a
//! half-applied change behind.

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::TransactionBehavior;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::{Expense, MoodRecord, NoteRecord, Snapshot, Table, Task, VoiceEntry};
use crate::vocabulary::default_categories;

mod capture;
mod categories;
mod records;
mod tasks;

pub(crate) use categories::insert_category;
pub use records::StoredRecord;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Environment variable for database encryption key
pub const DB_KEY_ENV: &str = "AURA_DB_KEY";

/// Schema version mirrored to `PRAGMA user_version`
pub const SCHEMA_VERSION: u32 = 5;

/// Derive an encryption key from a passphrase using Argon2
///
/// Uses a fixed application salt so the same passphrase always produces the same key,
/// regardless of database path. This allows moving/renaming/restoring the database freely.
fn derive_key(passphrase: &str) -> Result<String> {
    use argon2::{password_hash::SaltString, Argon2, PasswordHasher};

    // Fixed application salt - changing this would invalidate all existing encrypted databases
    const APP_SALT: &[u8; 16] = b"aura-vault-salt1";

    let salt = SaltString::encode_b64(APP_SALT)
        .map_err(|e| Error::Encryption(format!("Failed to create salt: {}", e)))?;

    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| Error::Encryption(format!("Failed to derive key: {}", e)))?;

    let hash_str = hash
        .hash
        .ok_or_else(|| Error::Encryption("No hash output".to_string()))?;
    Ok(hex::encode(hash_str.as_bytes()))
}

/// Row counts per table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCounts {
    pub voice_entries: i64,
    pub expenses: i64,
    pub tasks: i64,
    pub moods: i64,
    pub notes: i64,
    pub categories: i64,
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
    encrypted: bool,
}

impl Database {
    /// Open an unencrypted store
    pub fn new_unencrypted(path: &str) -> Result<Self> {
        Self::new_with_key(path, None)
    }

    /// Open (or create) the store at the fixed schema version.
    ///
    /// Any failure here is reported as `StorageInit`; callers treat it as fatal.
    pub fn new_with_key(path: &str, passphrase: Option<&str>) -> Result<Self> {
        let key_pragma = passphrase
            .map(derive_key)
            .transpose()?
            .map(|key| format!("PRAGMA key = 'x\"{}\"';", key));
        let encrypted = key_pragma.is_some();

        // Key must be the first statement on every new connection
        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            if let Some(pragma) = &key_pragma {
                conn.execute_batch(pragma)?;
            }
            conn.execute_batch("PRAGMA busy_timeout = 5000;")
        });

        let pool = Pool::builder()
            .max_size(10)
            .build(manager)
            .map_err(|e| Error::StorageInit(format!("Failed to open {}: {}", path, e)))?;

        let db = Self {
            pool,
            db_path: path.to_string(),
            encrypted,
        };
        db.init_schema().map_err(|e| match e {
            Error::StorageInit(_) => e,
            other => Error::StorageInit(other.to_string()),
        })?;

        Ok(db)
    }

    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    /// Create a throwaway database (for testing)
    ///
    /// Uses a temporary file rather than `:memory:` because every pooled
    /// connection to `:memory:` would see its own empty database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "aura_test_{}_{}.db",
            std::process::id(),
            id
        ));

        let _ = std::fs::remove_file(&path);

        Self::new_unencrypted(&path.to_string_lossy())
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Upsert one record by primary key inside a single-table transaction.
    ///
    /// Other tables are untouched. Records that break a field invariant are
    /// refused with `InvalidData`; backend failures surface as `StorageWrite`.
    pub fn save_item<R: StoredRecord>(&self, item: &R) -> Result<()> {
        item.validate()?;

        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(Error::write(R::TABLE))?;
        item.put(&tx).map_err(Error::write(R::TABLE))?;
        tx.commit().map_err(Error::write(R::TABLE))?;

        debug!(table = %R::TABLE, id = item.id(), "Saved item");
        Ok(())
    }

    /// Read every table inside one read transaction.
    ///
    /// Collections come back newest first. An empty category table is
    /// reported as the default category list.
    pub fn load_all(&self) -> Result<Snapshot> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;

        let mut categories = categories::select_categories(&tx)?;
        if categories.is_empty() {
            categories = default_categories();
        }

        let snapshot = Snapshot {
            voice_entries: VoiceEntry::select_all(&tx)?,
            expenses: Expense::select_all(&tx)?,
            tasks: Task::select_all(&tx)?,
            moods: MoodRecord::select_all(&tx)?,
            notes: NoteRecord::select_all(&tx)?,
            categories,
        };
        tx.commit()?;

        debug!(
            records = snapshot.total_records(),
            categories = snapshot.categories.len(),
            "Loaded store"
        );
        Ok(snapshot)
    }

    /// Truncate every table inside one writable transaction
    pub fn clear_all(&self) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        for table in Table::all() {
            tx.execute(&format!("DELETE FROM {}", table.as_str()), [])?;
        }
        tx.commit()?;

        info!("Store cleared");
        Ok(())
    }

    /// Row counts for every table
    pub fn counts(&self) -> Result<TableCounts> {
        let conn = self.conn()?;
        let count = |table: Table| -> Result<i64> {
            let sql = format!("SELECT COUNT(*) FROM {}", table.as_str());
            Ok(conn.query_row(&sql, [], |row| row.get(0))?)
        };

        Ok(TableCounts {
            voice_entries: count(Table::VoiceEntries)?,
            expenses: count(Table::Expenses)?,
            tasks: count(Table::Tasks)?,
            moods: count(Table::Moods)?,
            notes: count(Table::Notes)?,
            categories: count(Table::Categories)?,
        })
    }

    /// Current `PRAGMA user_version`
    pub fn schema_version(&self) -> Result<u32> {
        let conn = self.conn()?;
        Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?)
    }

    /// Create tables at the fixed schema version.
    ///
    /// No migration steps: older versions are bumped, newer ones are refused.
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn()?;

        let current: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        if current > SCHEMA_VERSION {
            return Err(Error::StorageInit(format!(
                "Database schema version {} is newer than supported version {}",
                current, SCHEMA_VERSION
            )));
        }

        conn.execute_batch(
            r#"
            -- WAL mode: readers don't block the single writer
            -- Note: creates -wal and -shm sidecar files alongside the database
            PRAGMA journal_mode = WAL;

            -- Synchronous NORMAL: good balance of safety and performance
            PRAGMA synchronous = NORMAL;

            -- Voice entries (one per confirmed capture, immutable)
            CREATE TABLE IF NOT EXISTS voice_entries (
                id TEXT PRIMARY KEY,
                raw_text TEXT NOT NULL,
                intent TEXT NOT NULL,                       -- EXPENSE, TODO, REMINDER, MOOD, NOTE
                confidence REAL NOT NULL DEFAULT 0,
                extracted_entities TEXT NOT NULL DEFAULT '{}',  -- JSON object as classified
                created_at INTEGER NOT NULL,                -- epoch milliseconds
                source TEXT NOT NULL DEFAULT 'voice'
            );

            CREATE INDEX IF NOT EXISTS idx_voice_entries_created ON voice_entries(created_at);
            CREATE INDEX IF NOT EXISTS idx_voice_entries_intent ON voice_entries(intent);

            -- Expenses (child of voice_entries)
            -- entry_id is deliberately not a FOREIGN KEY: lenient imports may
            -- carry synthetic unresolved ids
            CREATE TABLE IF NOT EXISTS expenses (
                id TEXT PRIMARY KEY,
                entry_id TEXT NOT NULL,
                amount REAL NOT NULL,
                currency TEXT NOT NULL,
                category TEXT NOT NULL,
                date TEXT NOT NULL,                         -- YYYY-MM-DD
                description TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_expenses_entry ON expenses(entry_id);
            CREATE INDEX IF NOT EXISTS idx_expenses_date ON expenses(date);

            -- Tasks and reminders (standalone, no entry reference)
            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                completed BOOLEAN NOT NULL DEFAULT 0,
                priority TEXT NOT NULL DEFAULT 'medium',    -- high, medium, low
                category TEXT NOT NULL,
                date TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_created ON tasks(created_at);

            -- Mood reflections (child of voice_entries)
            CREATE TABLE IF NOT EXISTS moods (
                id TEXT PRIMARY KEY,
                entry_id TEXT NOT NULL,
                sentiment TEXT NOT NULL,
                sentence TEXT NOT NULL,
                reason TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_moods_entry ON moods(entry_id);

            -- Notes (child of voice_entries)
            CREATE TABLE IF NOT EXISTS notes (
                id TEXT PRIMARY KEY,
                entry_id TEXT NOT NULL,
                text TEXT NOT NULL,
                date TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_notes_entry ON notes(entry_id);

            -- Expense categories; identity is the name, compared case-insensitively
            CREATE TABLE IF NOT EXISTS categories (
                name TEXT PRIMARY KEY COLLATE NOCASE
            );
            "#,
        )?;

        if current < SCHEMA_VERSION {
            conn.execute_batch(&format!("PRAGMA user_version = {};", SCHEMA_VERSION))?;
            info!(from = current, to = SCHEMA_VERSION, "Schema version set");
        }

        info!(path = %self.db_path, encrypted = self.encrypted, "Store initialized");
        Ok(())
    }
}
