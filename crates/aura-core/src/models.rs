//! Domain models for Aura
//!
//! Field names on the wire are camelCase and must stay stable: the backup
//! document produced by `export_backup_json` is the same shape as these types.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Source tag written on every capture
pub const VOICE_SOURCE: &str = "voice";

/// Mint a fresh primary key
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Intent a classified utterance resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Intent {
    Expense,
    Todo,
    Reminder,
    Mood,
    Note,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expense => "EXPENSE",
            Self::Todo => "TODO",
            Self::Reminder => "REMINDER",
            Self::Mood => "MOOD",
            Self::Note => "NOTE",
        }
    }

    /// Parse a label from a classifier or backup, falling back to NOTE.
    ///
    /// Classifiers are free to emit labels outside the fixed set (`UNKNOWN`,
    /// typos, empty strings); every such value is stored as a plain note.
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or(Self::Note)
    }
}

impl std::str::FromStr for Intent {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "EXPENSE" => Ok(Self::Expense),
            "TODO" => Ok(Self::Todo),
            "REMINDER" => Ok(Self::Reminder),
            "MOOD" => Ok(Self::Mood),
            "NOTE" => Ok(Self::Note),
            _ => Err(format!("Unknown intent: {}", s)),
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for Intent {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Intent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Self::parse_lenient(&label))
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(format!("Unknown priority: {}", s)),
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for Priority {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(label.parse().unwrap_or_default())
    }
}

/// Store tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    VoiceEntries,
    Expenses,
    Tasks,
    Moods,
    Notes,
    Categories,
}

impl Table {
    /// SQLite table name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VoiceEntries => "voice_entries",
            Self::Expenses => "expenses",
            Self::Tasks => "tasks",
            Self::Moods => "moods",
            Self::Notes => "notes",
            Self::Categories => "categories",
        }
    }

    pub fn all() -> &'static [Table] {
        &[
            Self::VoiceEntries,
            Self::Expenses,
            Self::Tasks,
            Self::Moods,
            Self::Notes,
            Self::Categories,
        ]
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn default_source() -> String {
    VOICE_SOURCE.to_string()
}

/// The immutable record of one classified utterance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceEntry {
    pub id: String,
    pub raw_text: String,
    pub intent: Intent,
    pub confidence: f64,
    #[serde(default)]
    pub extracted_entities: Map<String, Value>,
    /// Epoch milliseconds
    pub created_at: i64,
    #[serde(default = "default_source")]
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    pub entry_id: String,
    pub amount: f64,
    pub currency: String,
    pub category: String,
    /// ISO calendar day (YYYY-MM-DD)
    pub date: String,
    pub description: String,
}

impl Expense {
    pub fn day(&self) -> Option<NaiveDate> {
        parse_day(&self.date)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub completed: bool,
    pub priority: Priority,
    pub category: String,
    pub date: String,
    pub created_at: i64,
}

impl Task {
    /// Category reminders are filed under
    pub const REMINDER_CATEGORY: &'static str = "Reminder";

    pub fn day(&self) -> Option<NaiveDate> {
        parse_day(&self.date)
    }

    /// Reminders are alerts, not work items
    pub fn is_reminder(&self) -> bool {
        self.category.eq_ignore_ascii_case(Self::REMINDER_CATEGORY)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodRecord {
    pub id: String,
    pub entry_id: String,
    pub sentiment: String,
    pub sentence: String,
    pub reason: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteRecord {
    pub id: String,
    pub entry_id: String,
    pub text: String,
    pub date: String,
    pub created_at: i64,
}

/// A typed record derived from a voice entry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChildRecord {
    Expense(Expense),
    Task(Task),
    Mood(MoodRecord),
    Note(NoteRecord),
}

impl ChildRecord {
    pub fn table(&self) -> Table {
        match self {
            Self::Expense(_) => Table::Expenses,
            Self::Task(_) => Table::Tasks,
            Self::Mood(_) => Table::Moods,
            Self::Note(_) => Table::Notes,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Expense(e) => &e.id,
            Self::Task(t) => &t.id,
            Self::Mood(m) => &m.id,
            Self::Note(n) => &n.id,
        }
    }
}

/// Every collection in the store.
///
/// This is both what `load_all` returns and the backup document format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub voice_entries: Vec<VoiceEntry>,
    pub expenses: Vec<Expense>,
    pub tasks: Vec<Task>,
    pub moods: Vec<MoodRecord>,
    pub notes: Vec<NoteRecord>,
    pub categories: Vec<String>,
}

impl Snapshot {
    pub fn total_records(&self) -> usize {
        self.voice_entries.len()
            + self.expenses.len()
            + self.tasks.len()
            + self.moods.len()
            + self.notes.len()
    }

    /// Entries matching an intent, or all of them
    pub fn entries(&self, intent: Option<Intent>) -> impl Iterator<Item = &VoiceEntry> {
        self.voice_entries
            .iter()
            .filter(move |e| intent.map_or(true, |i| e.intent == i))
    }

    pub fn expense_for_entry(&self, entry_id: &str) -> Option<&Expense> {
        self.expenses.iter().find(|e| e.entry_id == entry_id)
    }

    pub fn mood_for_entry(&self, entry_id: &str) -> Option<&MoodRecord> {
        self.moods.iter().find(|m| m.entry_id == entry_id)
    }

    pub fn note_for_entry(&self, entry_id: &str) -> Option<&NoteRecord> {
        self.notes.iter().find(|n| n.entry_id == entry_id)
    }

    /// Child rows whose `entry_id` has no matching voice entry
    pub fn dangling_references(&self) -> Vec<(Table, &str)> {
        let known: std::collections::HashSet<&str> =
            self.voice_entries.iter().map(|e| e.id.as_str()).collect();

        let expenses = self
            .expenses
            .iter()
            .filter(|e| !known.contains(e.entry_id.as_str()))
            .map(|e| (Table::Expenses, e.id.as_str()));
        let moods = self
            .moods
            .iter()
            .filter(|m| !known.contains(m.entry_id.as_str()))
            .map(|m| (Table::Moods, m.id.as_str()));
        let notes = self
            .notes
            .iter()
            .filter(|n| !known.contains(n.entry_id.as_str()))
            .map(|n| (Table::Notes, n.id.as_str()));

        expenses.chain(moods).chain(notes).collect()
    }
}

/// Parse an ISO calendar day
pub fn parse_day(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}
