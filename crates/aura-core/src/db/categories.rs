//! Category vocabulary table

use rusqlite::{params, Connection, TransactionBehavior};
use tracing::debug;

use super::Database;
use crate::error::{Error, Result};
use crate::models::Table;
use crate::vocabulary::{default_categories, CategoryVocabulary, DEFAULT_CATEGORIES};

/// Category names in insertion order
pub(crate) fn select_categories(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM categories ORDER BY rowid")?;
    let names = stmt.query_map([], |row| row.get(0))?;
    names.collect()
}

/// Write the default categories into an empty table.
///
/// An empty table reads back as the defaults, so the first real insert has
/// to materialize them or they would disappear from the list.
pub(crate) fn seed_defaults_if_empty(conn: &Connection) -> rusqlite::Result<()> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))?;
    if count > 0 {
        return Ok(());
    }

    let mut stmt = conn.prepare("INSERT OR IGNORE INTO categories (name) VALUES (?1)")?;
    for name in DEFAULT_CATEGORIES {
        stmt.execute(params![name])?;
    }
    Ok(())
}

/// Insert a category unless a case-insensitive match exists. Returns true when added.
pub(crate) fn insert_category(conn: &Connection, name: &str) -> rusqlite::Result<bool> {
    seed_defaults_if_empty(conn)?;

    // NOCASE only folds ASCII; "Café" and "CAFÉ" must still collide
    if CategoryVocabulary::from_names(select_categories(conn)?).contains(name) {
        return Ok(false);
    }

    let changed = conn.execute(
        "INSERT OR IGNORE INTO categories (name) VALUES (?1)",
        params![name.trim()],
    )?;
    Ok(changed > 0)
}

impl Database {
    /// Persist a new category. Returns false when it already existed.
    pub fn add_category(&self, name: &str) -> Result<bool> {
        if name.trim().is_empty() {
            return Err(Error::InvalidData("Category name cannot be empty".into()));
        }

        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(Error::write(Table::Categories))?;
        let added = insert_category(&tx, name).map_err(Error::write(Table::Categories))?;
        tx.commit().map_err(Error::write(Table::Categories))?;

        debug!(name = name.trim(), added, "Category saved");
        Ok(added)
    }

    /// Category names, or the defaults when none are stored
    pub fn list_categories(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let names = select_categories(&conn)?;
        if names.is_empty() {
            return Ok(default_categories());
        }
        Ok(names)
    }
}
