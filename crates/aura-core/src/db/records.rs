//! Row mapping for the record tables

use std::cmp::Reverse;
use std::collections::HashMap;

use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::models::{
    Expense, Intent, MoodRecord, NoteRecord, Snapshot, Table, Task, VoiceEntry,
};

/// A record type that lives in exactly one store table
pub trait StoredRecord: Sized + Clone + Send + 'static {
    const TABLE: Table;

    fn id(&self) -> &str;

    /// Upsert by primary key
    fn put(&self, conn: &Connection) -> rusqlite::Result<()>;

    /// Every row, newest first
    fn select_all(conn: &Connection) -> rusqlite::Result<Vec<Self>>;

    /// The snapshot collection holding records of this type
    fn collection(snapshot: &mut Snapshot) -> &mut Vec<Self>;

    /// Put the snapshot collection back into `select_all` order
    fn sort_view(snapshot: &mut Snapshot);

    /// Field invariants the store refuses to persist without
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Replace the record with the same id in a snapshot, or add it, keeping
    /// the collection in `select_all` order
    fn upsert_into(&self, snapshot: &mut Snapshot) {
        let rows = Self::collection(snapshot);
        match rows.iter().position(|r| r.id() == self.id()) {
            Some(pos) => rows[pos] = self.clone(),
            None => rows.push(self.clone()),
        }
        Self::sort_view(snapshot);
    }
}

/// `ORDER BY created_at DESC, id`
fn newest_first<T>(rows: &mut [T], key: impl Fn(&T) -> (i64, &str)) {
    rows.sort_by(|a, b| {
        let (a_at, a_id) = key(a);
        let (b_at, b_id) = key(b);
        b_at.cmp(&a_at).then_with(|| a_id.cmp(b_id))
    });
}

fn collect<T>(
    conn: &Connection,
    sql: &str,
    map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
) -> rusqlite::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], map)?;
    rows.collect()
}

impl StoredRecord for VoiceEntry {
    const TABLE: Table = Table::VoiceEntries;

    fn id(&self) -> &str {
        &self.id
    }

    fn put(&self, conn: &Connection) -> rusqlite::Result<()> {
        let entities = serde_json::to_string(&self.extracted_entities)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        conn.execute(
            r#"
            INSERT INTO voice_entries (id, raw_text, intent, confidence, extracted_entities, created_at, source)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                raw_text = excluded.raw_text,
                intent = excluded.intent,
                confidence = excluded.confidence,
                extracted_entities = excluded.extracted_entities,
                created_at = excluded.created_at,
                source = excluded.source
            "#,
            params![
                self.id,
                self.raw_text,
                self.intent.as_str(),
                self.confidence,
                entities,
                self.created_at,
                self.source
            ],
        )?;
        Ok(())
    }

    fn select_all(conn: &Connection) -> rusqlite::Result<Vec<Self>> {
        collect(
            conn,
            "SELECT id, raw_text, intent, confidence, extracted_entities, created_at, source
             FROM voice_entries ORDER BY created_at DESC, id",
            |row| {
                let intent: String = row.get(2)?;
                let entities: String = row.get(4)?;
                let extracted_entities: Map<String, Value> = serde_json::from_str(&entities)
                    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

                Ok(VoiceEntry {
                    id: row.get(0)?,
                    raw_text: row.get(1)?,
                    intent: Intent::parse_lenient(&intent),
                    confidence: row.get(3)?,
                    extracted_entities,
                    created_at: row.get(5)?,
                    source: row.get(6)?,
                })
            },
        )
    }

    fn collection(snapshot: &mut Snapshot) -> &mut Vec<Self> {
        &mut snapshot.voice_entries
    }

    /// Expenses are ordered by their parent, so they move with it
    fn sort_view(snapshot: &mut Snapshot) {
        newest_first(&mut snapshot.voice_entries, |e| (e.created_at, e.id.as_str()));
        Expense::sort_view(snapshot);
    }
}

impl StoredRecord for Expense {
    const TABLE: Table = Table::Expenses;

    fn id(&self) -> &str {
        &self.id
    }

    fn put(&self, conn: &Connection) -> rusqlite::Result<()> {
        conn.execute(
            r#"
            INSERT INTO expenses (id, entry_id, amount, currency, category, date, description)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                entry_id = excluded.entry_id,
                amount = excluded.amount,
                currency = excluded.currency,
                category = excluded.category,
                date = excluded.date,
                description = excluded.description
            "#,
            params![
                self.id,
                self.entry_id,
                self.amount,
                self.currency,
                self.category,
                self.date,
                self.description
            ],
        )?;
        Ok(())
    }

    /// Expenses carry no timestamp of their own; they follow their parent entry
    fn select_all(conn: &Connection) -> rusqlite::Result<Vec<Self>> {
        collect(
            conn,
            r#"
            SELECT e.id, e.entry_id, e.amount, e.currency, e.category, e.date, e.description
            FROM expenses e
            LEFT JOIN voice_entries v ON v.id = e.entry_id
            ORDER BY v.created_at IS NULL, v.created_at DESC, e.date DESC, e.id
            "#,
            |row| {
                Ok(Expense {
                    id: row.get(0)?,
                    entry_id: row.get(1)?,
                    amount: row.get(2)?,
                    currency: row.get(3)?,
                    category: row.get(4)?,
                    date: row.get(5)?,
                    description: row.get(6)?,
                })
            },
        )
    }

    fn collection(snapshot: &mut Snapshot) -> &mut Vec<Self> {
        &mut snapshot.expenses
    }

    /// Orphans last, then parent `created_at` DESC, `date` DESC, id
    fn sort_view(snapshot: &mut Snapshot) {
        let Snapshot {
            voice_entries,
            expenses,
            ..
        } = snapshot;
        let parents: HashMap<&str, i64> = voice_entries
            .iter()
            .map(|v| (v.id.as_str(), v.created_at))
            .collect();

        expenses.sort_by(|a, b| {
            let key = |e: &Expense| {
                let parent = parents.get(e.entry_id.as_str()).copied();
                (parent.is_none(), Reverse(parent))
            };
            key(a)
                .cmp(&key(b))
                .then_with(|| b.date.cmp(&a.date))
                .then_with(|| a.id.cmp(&b.id))
        });
    }

    fn validate(&self) -> Result<()> {
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(Error::InvalidData(format!(
                "Expense {} amount must be a finite number >= 0, got {}",
                self.id, self.amount
            )));
        }
        Ok(())
    }
}

impl StoredRecord for Task {
    const TABLE: Table = Table::Tasks;

    fn id(&self) -> &str {
        &self.id
    }

    fn put(&self, conn: &Connection) -> rusqlite::Result<()> {
        conn.execute(
            r#"
            INSERT INTO tasks (id, title, description, completed, priority, category, date, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                completed = excluded.completed,
                priority = excluded.priority,
                category = excluded.category,
                date = excluded.date,
                created_at = excluded.created_at
            "#,
            params![
                self.id,
                self.title,
                self.description,
                self.completed,
                self.priority.as_str(),
                self.category,
                self.date,
                self.created_at
            ],
        )?;
        Ok(())
    }

    fn select_all(conn: &Connection) -> rusqlite::Result<Vec<Self>> {
        collect(
            conn,
            "SELECT id, title, description, completed, priority, category, date, created_at
             FROM tasks ORDER BY created_at DESC, id",
            map_task,
        )
    }

    fn collection(snapshot: &mut Snapshot) -> &mut Vec<Self> {
        &mut snapshot.tasks
    }

    fn sort_view(snapshot: &mut Snapshot) {
        newest_first(&mut snapshot.tasks, |t| (t.created_at, t.id.as_str()));
    }
}

pub(super) fn map_task(row: &Row<'_>) -> rusqlite::Result<Task> {
    let priority: String = row.get(4)?;
    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        completed: row.get(3)?,
        priority: priority.parse().unwrap_or_default(),
        category: row.get(5)?,
        date: row.get(6)?,
        created_at: row.get(7)?,
    })
}

impl StoredRecord for MoodRecord {
    const TABLE: Table = Table::Moods;

    fn id(&self) -> &str {
        &self.id
    }

    fn put(&self, conn: &Connection) -> rusqlite::Result<()> {
        conn.execute(
            r#"
            INSERT INTO moods (id, entry_id, sentiment, sentence, reason, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                entry_id = excluded.entry_id,
                sentiment = excluded.sentiment,
                sentence = excluded.sentence,
                reason = excluded.reason,
                created_at = excluded.created_at
            "#,
            params![
                self.id,
                self.entry_id,
                self.sentiment,
                self.sentence,
                self.reason,
                self.created_at
            ],
        )?;
        Ok(())
    }

    fn select_all(conn: &Connection) -> rusqlite::Result<Vec<Self>> {
        collect(
            conn,
            "SELECT id, entry_id, sentiment, sentence, reason, created_at
             FROM moods ORDER BY created_at DESC, id",
            |row| {
                Ok(MoodRecord {
                    id: row.get(0)?,
                    entry_id: row.get(1)?,
                    sentiment: row.get(2)?,
                    sentence: row.get(3)?,
                    reason: row.get(4)?,
                    created_at: row.get(5)?,
                })
            },
        )
    }

    fn collection(snapshot: &mut Snapshot) -> &mut Vec<Self> {
        &mut snapshot.moods
    }

    fn sort_view(snapshot: &mut Snapshot) {
        newest_first(&mut snapshot.moods, |m| (m.created_at, m.id.as_str()));
    }
}

impl StoredRecord for NoteRecord {
    const TABLE: Table = Table::Notes;

    fn id(&self) -> &str {
        &self.id
    }

    fn put(&self, conn: &Connection) -> rusqlite::Result<()> {
        conn.execute(
            r#"
            INSERT INTO notes (id, entry_id, text, date, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                entry_id = excluded.entry_id,
                text = excluded.text,
                date = excluded.date,
                created_at = excluded.created_at
            "#,
            params![self.id, self.entry_id, self.text, self.date, self.created_at],
        )?;
        Ok(())
    }

    fn select_all(conn: &Connection) -> rusqlite::Result<Vec<Self>> {
        collect(
            conn,
            "SELECT id, entry_id, text, date, created_at
             FROM notes ORDER BY created_at DESC, id",
            |row| {
                Ok(NoteRecord {
                    id: row.get(0)?,
                    entry_id: row.get(1)?,
                    text: row.get(2)?,
                    date: row.get(3)?,
                    created_at: row.get(4)?,
                })
            },
        )
    }

    fn collection(snapshot: &mut Snapshot) -> &mut Vec<Self> {
        &mut snapshot.notes
    }

    fn sort_view(snapshot: &mut Snapshot) {
        newest_first(&mut snapshot.notes, |n| (n.created_at, n.id.as_str()));
    }
}
