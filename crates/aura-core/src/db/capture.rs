//! Atomic commit of a confirmed capture

use rusqlite::TransactionBehavior;
use tracing::info;

use super::categories::insert_category;
use super::{Database, StoredRecord};
use crate::error::{Error, Result};
use crate::models::{ChildRecord, Table, VoiceEntry};

impl ChildRecord {
    fn put(&self, conn: &rusqlite::Connection) -> rusqlite::Result<()> {
        match self {
            Self::Expense(e) => e.put(conn),
            Self::Task(t) => t.put(conn),
            Self::Mood(m) => m.put(conn),
            Self::Note(n) => n.put(conn),
        }
    }
}

impl Database {
    /// Write a voice entry, its derived record and any newly seen category
    /// in one transaction. Nothing is persisted unless all writes succeed.
    pub fn commit_capture(
        &self,
        entry: &VoiceEntry,
        child: &ChildRecord,
        new_category: Option<&str>,
    ) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(Error::write(Table::VoiceEntries))?;

        entry.put(&tx).map_err(Error::write(Table::VoiceEntries))?;
        child.put(&tx).map_err(Error::write(child.table()))?;
        if let Some(name) = new_category {
            insert_category(&tx, name).map_err(Error::write(Table::Categories))?;
        }

        tx.commit().map_err(Error::write(Table::VoiceEntries))?;

        info!(
            entry = %entry.id,
            intent = %entry.intent,
            child = %child.table(),
            new_category = new_category.unwrap_or(""),
            "Capture committed"
        );
        Ok(())
    }
}
