//! Backup export and merge-import
//!
//! The backup document is a JSON object with top-level arrays
//! `voiceEntries`, `expenses`, `tasks`, `moods`, `notes` and `categories`,
//! each element shaped exactly like the in-memory model. Import never
//! overwrites: every row is relabelled with a fresh id and child rows are
//! pointed at their parent's new id before anything is written.

use std::collections::HashMap;

use rusqlite::TransactionBehavior;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::db::{insert_category, Database, StoredRecord};
use crate::error::{Error, Result};
use crate::models::{
    new_id, Expense, MoodRecord, NoteRecord, Snapshot, Table, Task, VoiceEntry,
};

/// Prefix on entry ids minted for references that could not be resolved
pub const UNRESOLVED_PREFIX: &str = "unresolved-";

const COLLECTION_KEYS: [&str; 6] = [
    "voiceEntries",
    "expenses",
    "tasks",
    "moods",
    "notes",
    "categories",
];

/// What to do with a child row whose `entryId` is not in the backup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferencePolicy {
    /// Point it at a synthetic `unresolved-…` id and keep going
    #[default]
    Lenient,
    /// Abort the whole import
    Strict,
}

/// Rows written by one import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStats {
    pub voice_entries: usize,
    pub expenses: usize,
    pub tasks: usize,
    pub moods: usize,
    pub notes: usize,
    /// Categories that did not already exist
    pub categories: usize,
    /// Child rows pointed at a synthetic entry id
    pub unresolved_references: usize,
}

impl ImportStats {
    pub fn total_records(&self) -> usize {
        self.voice_entries + self.expenses + self.tasks + self.moods + self.notes
    }
}

/// A backup relabelled with fresh ids
#[derive(Debug, Clone, PartialEq)]
pub struct Remapped {
    pub snapshot: Snapshot,
    pub unresolved_references: usize,
}

/// Parse a backup document.
///
/// Accepts the bare document or the `{ "app", "exportedAt", "database": {...} }`
/// envelope. A missing or non-array collection counts as empty; an element
/// that does not decode is an `ImportParse` error.
pub fn parse_backup(json: &str) -> Result<Snapshot> {
    let root: Value =
        serde_json::from_str(json).map_err(|e| Error::ImportParse(format!("Invalid JSON: {}", e)))?;

    let Value::Object(root) = root else {
        return Err(Error::ImportParse(
            "Backup must be a JSON object".to_string(),
        ));
    };

    let has_collections = COLLECTION_KEYS.iter().any(|k| root.contains_key(*k));
    let body = match root.get("database") {
        Some(Value::Object(inner)) if !has_collections => inner,
        _ => &root,
    };

    Ok(Snapshot {
        voice_entries: collection(body, "voiceEntries")?,
        expenses: collection(body, "expenses")?,
        tasks: collection(body, "tasks")?,
        moods: collection(body, "moods")?,
        notes: collection(body, "notes")?,
        categories: collection(body, "categories")?,
    })
}

fn collection<T: DeserializeOwned>(body: &Map<String, Value>, key: &str) -> Result<Vec<T>> {
    let Some(Value::Array(items)) = body.get(key) else {
        return Ok(Vec::new());
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            T::deserialize(item).map_err(|e| Error::ImportParse(format!("{}[{}]: {}", key, i, e)))
        })
        .collect()
}

/// Serialize a snapshot as a pretty-printed backup document
pub fn to_backup_json(snapshot: &Snapshot) -> Result<String> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}

/// Old entry id -> fresh entry id, plus the policy for misses
struct EntryIdMap<'a> {
    mapped: HashMap<&'a str, String>,
    /// Unknown parents sharing an old id share one synthetic id
    synthetic: HashMap<&'a str, String>,
    policy: ReferencePolicy,
    unresolved: usize,
}

impl<'a> EntryIdMap<'a> {
    fn resolve(&mut self, table: Table, id: &str, entry_id: &'a str) -> Result<String> {
        if let Some(fresh) = self.mapped.get(entry_id) {
            return Ok(fresh.clone());
        }

        if self.policy == ReferencePolicy::Strict {
            return Err(Error::UnresolvedReference {
                table,
                id: id.to_string(),
                entry_id: entry_id.to_string(),
            });
        }

        warn!(%table, id, entry_id, "Unresolved entry reference in backup");
        self.unresolved += 1;
        Ok(self
            .synthetic
            .entry(entry_id)
            .or_insert_with(|| format!("{}{}", UNRESOLVED_PREFIX, new_id()))
            .clone())
    }
}

/// Relabel every row with a fresh id and rewrite child `entryId`s.
///
/// Pure: nothing is written. Under [`ReferencePolicy::Strict`] the first
/// dangling reference is returned as `UnresolvedReference`. An expense with a
/// negative or non-finite amount is an `ImportParse` error.
pub fn remap(backup: &Snapshot, policy: ReferencePolicy) -> Result<Remapped> {
    let mut ids = EntryIdMap {
        mapped: HashMap::with_capacity(backup.voice_entries.len()),
        synthetic: HashMap::new(),
        policy,
        unresolved: 0,
    };
    let mut out = Snapshot {
        categories: backup.categories.clone(),
        ..Default::default()
    };

    // 1. Entries first so children can be rewritten
    for entry in &backup.voice_entries {
        let fresh = new_id();
        ids.mapped.insert(entry.id.as_str(), fresh.clone());
        out.voice_entries.push(VoiceEntry {
            id: fresh,
            ..entry.clone()
        });
    }

    // 2. Dependent records
    for (i, expense) in backup.expenses.iter().enumerate() {
        expense
            .validate()
            .map_err(|e| Error::ImportParse(format!("expenses[{}]: {}", i, e)))?;
        let entry_id = ids.resolve(Table::Expenses, &expense.id, &expense.entry_id)?;
        out.expenses.push(Expense {
            id: new_id(),
            entry_id,
            ..expense.clone()
        });
    }
    for mood in &backup.moods {
        let entry_id = ids.resolve(Table::Moods, &mood.id, &mood.entry_id)?;
        out.moods.push(MoodRecord {
            id: new_id(),
            entry_id,
            ..mood.clone()
        });
    }
    for note in &backup.notes {
        let entry_id = ids.resolve(Table::Notes, &note.id, &note.entry_id)?;
        out.notes.push(NoteRecord {
            id: new_id(),
            entry_id,
            ..note.clone()
        });
    }

    // 3. Tasks have no parent
    for task in &backup.tasks {
        out.tasks.push(Task {
            id: new_id(),
            ..task.clone()
        });
    }

    Ok(Remapped {
        snapshot: out,
        unresolved_references: ids.unresolved,
    })
}

fn put_all<R: StoredRecord>(tx: &rusqlite::Connection, rows: &[R]) -> Result<usize> {
    for row in rows {
        row.put(tx).map_err(Error::write(R::TABLE))?;
    }
    Ok(rows.len())
}

impl Database {
    /// Everything in the store as a backup document
    pub fn export_backup_json(&self) -> Result<String> {
        to_backup_json(&self.load_all()?)
    }

    /// Merge a backup into the store as new rows.
    ///
    /// All tables are written in one transaction; on any failure nothing
    /// from the backup is persisted.
    pub fn import_backup(&self, backup: &Snapshot, policy: ReferencePolicy) -> Result<ImportStats> {
        let Remapped {
            snapshot,
            unresolved_references,
        } = remap(backup, policy)?;

        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(Error::write(Table::VoiceEntries))?;

        let mut stats = ImportStats {
            voice_entries: put_all(&tx, &snapshot.voice_entries)?,
            expenses: put_all(&tx, &snapshot.expenses)?,
            tasks: put_all(&tx, &snapshot.tasks)?,
            moods: put_all(&tx, &snapshot.moods)?,
            notes: put_all(&tx, &snapshot.notes)?,
            categories: 0,
            unresolved_references,
        };

        for name in snapshot.categories.iter().filter(|c| !c.trim().is_empty()) {
            if insert_category(&tx, name).map_err(Error::write(Table::Categories))? {
                stats.categories += 1;
            }
        }

        tx.commit().map_err(Error::write(Table::VoiceEntries))?;

        info!(
            records = stats.total_records(),
            categories = stats.categories,
            unresolved = stats.unresolved_references,
            "Backup imported"
        );
        Ok(stats)
    }

    pub fn import_backup_json(&self, json: &str, policy: ReferencePolicy) -> Result<ImportStats> {
        let backup = parse_backup(json)?;
        self.import_backup(&backup, policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Intent, Priority, VOICE_SOURCE};
    use serde_json::json;

    fn sample_backup() -> Snapshot {
        Snapshot {
            voice_entries: vec![
                VoiceEntry {
                    id: "a1".to_string(),
                    raw_text: "spent 250 on lunch".to_string(),
                    intent: Intent::Expense,
                    confidence: 0.95,
                    extracted_entities: Map::new(),
                    created_at: 2_000,
                    source: VOICE_SOURCE.to_string(),
                },
                VoiceEntry {
                    id: "a2".to_string(),
                    raw_text: "feeling good".to_string(),
                    intent: Intent::Mood,
                    confidence: 0.9,
                    extracted_entities: Map::new(),
                    created_at: 1_000,
                    source: VOICE_SOURCE.to_string(),
                },
            ],
            expenses: vec![Expense {
                id: "x1".to_string(),
                entry_id: "a1".to_string(),
                amount: 250.0,
                currency: "INR".to_string(),
                category: "Food".to_string(),
                date: "2024-05-01".to_string(),
                description: "lunch".to_string(),
            }],
            tasks: vec![Task {
                id: "t1".to_string(),
                title: "Call mom".to_string(),
                description: String::new(),
                completed: false,
                priority: Priority::High,
                category: "Personal".to_string(),
                date: "2024-05-01".to_string(),
                created_at: 1_500,
            }],
            moods: vec![MoodRecord {
                id: "m1".to_string(),
                entry_id: "a2".to_string(),
                sentiment: "Happy".to_string(),
                sentence: "Good day".to_string(),
                reason: "feeling good".to_string(),
                created_at: 1_000,
            }],
            notes: vec![],
            categories: vec!["Food".to_string(), "Pets".to_string()],
        }
    }

    #[test]
    fn test_remap_rewrites_ids_and_references() {
        let backup = sample_backup();
        let remapped = remap(&backup, ReferencePolicy::Lenient).unwrap();
        let out = &remapped.snapshot;

        assert_eq!(remapped.unresolved_references, 0);
        assert_ne!(out.voice_entries[0].id, "a1");
        assert_eq!(out.expenses[0].entry_id, out.voice_entries[0].id);
        assert_eq!(out.moods[0].entry_id, out.voice_entries[1].id);
        assert_ne!(out.tasks[0].id, "t1");
        assert_eq!(out.tasks[0].title, "Call mom");
        assert!(out.dangling_references().is_empty());
    }

    #[test]
    fn test_remap_lenient_synthesizes_shared_ids() {
        let mut backup = sample_backup();
        backup.expenses[0].entry_id = "gone".to_string();
        backup.notes.push(NoteRecord {
            id: "n1".to_string(),
            entry_id: "gone".to_string(),
            text: "orphan".to_string(),
            date: "2024-05-01".to_string(),
            created_at: 0,
        });

        let remapped = remap(&backup, ReferencePolicy::Lenient).unwrap();
        let out = &remapped.snapshot;

        assert_eq!(remapped.unresolved_references, 2);
        assert!(out.expenses[0].entry_id.starts_with(UNRESOLVED_PREFIX));
        assert_eq!(out.expenses[0].entry_id, out.notes[0].entry_id);
    }

    #[test]
    fn test_remap_strict_rejects_dangling() {
        let mut backup = sample_backup();
        backup.moods[0].entry_id = "gone".to_string();

        let err = remap(&backup, ReferencePolicy::Strict).unwrap_err();
        assert!(matches!(
            err,
            Error::UnresolvedReference { table: Table::Moods, ref entry_id, .. } if entry_id == "gone"
        ));
    }

    #[test]
    fn test_export_import_round_trip() {
        let source = Database::in_memory().unwrap();
        source
            .import_backup(&sample_backup(), ReferencePolicy::Lenient)
            .unwrap();
        let json = source.export_backup_json().unwrap();

        let target = Database::in_memory().unwrap();
        let stats = target
            .import_backup_json(&json, ReferencePolicy::Strict)
            .unwrap();
        assert_eq!(stats.voice_entries, 2);
        assert_eq!(stats.expenses, 1);
        assert_eq!(stats.tasks, 1);
        assert_eq!(stats.moods, 1);

        let loaded = target.load_all().unwrap();
        assert!(loaded.dangling_references().is_empty());

        let expense = &loaded.expenses[0];
        let parent = loaded
            .voice_entries
            .iter()
            .find(|e| e.id == expense.entry_id)
            .unwrap();
        assert_eq!(parent.raw_text, "spent 250 on lunch");
        assert_eq!(expense.amount, 250.0);
        assert!(loaded.categories.contains(&"Pets".to_string()));
    }

    #[test]
    fn test_import_twice_duplicates() {
        let db = Database::in_memory().unwrap();
        let backup = sample_backup();

        let first = db.import_backup(&backup, ReferencePolicy::Lenient).unwrap();
        let second = db.import_backup(&backup, ReferencePolicy::Lenient).unwrap();
        assert_eq!(first.categories, 1);
        assert_eq!(second.categories, 0);

        let loaded = db.load_all().unwrap();
        assert_eq!(loaded.voice_entries.len(), 4);
        assert_eq!(loaded.expenses.len(), 2);
        assert_eq!(loaded.tasks.len(), 2);
        assert_ne!(loaded.expenses[0].entry_id, loaded.expenses[1].entry_id);
        assert_eq!(
            loaded.categories.iter().filter(|c| *c == "Pets").count(),
            1
        );
    }

    #[test]
    fn test_strict_import_persists_nothing() {
        let db = Database::in_memory().unwrap();
        let mut backup = sample_backup();
        backup.expenses[0].entry_id = "gone".to_string();

        assert!(db.import_backup(&backup, ReferencePolicy::Strict).is_err());

        let loaded = db.load_all().unwrap();
        assert_eq!(loaded.total_records(), 0);
        assert_eq!(loaded.categories.len(), 8);
    }

    #[test]
    fn test_import_rejects_invalid_amounts() {
        let db = Database::in_memory().unwrap();
        let mut backup = sample_backup();
        backup.expenses[0].amount = -250.0;

        assert!(matches!(
            db.import_backup(&backup, ReferencePolicy::Lenient),
            Err(Error::ImportParse(_))
        ));
        assert_eq!(db.load_all().unwrap().total_records(), 0);
    }

    #[test]
    fn test_import_dedupes_non_ascii_categories() {
        let db = Database::in_memory().unwrap();
        db.add_category("ÉPICERIE").unwrap();

        let stats = db
            .import_backup_json(
                r#"{"categories": ["Épicerie", "épicerie", "Ünterhaltung", "ÜNTERHALTUNG"]}"#,
                ReferencePolicy::Lenient,
            )
            .unwrap();
        assert_eq!(stats.categories, 1);

        let categories = db.list_categories().unwrap();
        assert_eq!(categories.len(), 10);
        assert!(categories.contains(&"ÉPICERIE".to_string()));
        assert!(categories.contains(&"Ünterhaltung".to_string()));
    }

    #[test]
    fn test_unknown_intent_imports_as_note() {
        let db = Database::in_memory().unwrap();
        let json = json!({
            "voiceEntries": [{
                "id": "u1", "rawText": "hmm", "intent": "UNKNOWN", "confidence": 0.2,
                "extractedEntities": {}, "createdAt": 5, "source": "voice"
            }]
        });

        db.import_backup_json(&json.to_string(), ReferencePolicy::Strict)
            .unwrap();
        let loaded = db.load_all().unwrap();
        assert_eq!(loaded.voice_entries[0].intent, Intent::Note);
        assert_eq!(loaded.voice_entries[0].raw_text, "hmm");
    }

    #[test]
    fn test_parse_backup_is_lenient_about_missing_arrays() {
        let snapshot = parse_backup(r#"{"voiceEntries": "nope", "tasks": []}"#).unwrap();
        assert_eq!(snapshot.total_records(), 0);
        assert!(snapshot.categories.is_empty());
    }

    #[test]
    fn test_parse_backup_accepts_envelope() {
        let json = json!({
            "app": "Aura",
            "exportedAt": "2024-05-01T10:00:00.000Z",
            "database": {
                "categories": ["Food"],
                "notes": [{
                    "id": "n1", "entryId": "e1", "text": "hi",
                    "date": "2024-05-01", "createdAt": 5
                }]
            }
        });
        let snapshot = parse_backup(&json.to_string()).unwrap();
        assert_eq!(snapshot.notes.len(), 1);
        assert_eq!(snapshot.categories, vec!["Food".to_string()]);
    }

    #[test]
    fn test_parse_backup_rejects_bad_elements() {
        assert!(matches!(
            parse_backup(r#"{"expenses": [{"id": "x1"}]}"#),
            Err(Error::ImportParse(_))
        ));
        assert!(matches!(parse_backup("[]"), Err(Error::ImportParse(_))));
        assert!(matches!(parse_backup("{not json"), Err(Error::ImportParse(_))));
    }
}
