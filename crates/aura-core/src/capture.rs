//! Derivation of typed records from a classified capture
//!
//! A classifier hands back a loosely-typed `{ intent, entities }` payload.
//! [`Draft`] is that payload read into a per-intent shape, and [`derive`]
//! applies the fallback rules that turn a draft into a [`VoiceEntry`] plus
//! exactly one [`ChildRecord`]. Nothing here touches the store; the caller
//! commits the resulting [`Derivation`] in one transaction.

use std::sync::LazyLock;

use chrono::{Local, NaiveDate};
use regex::Regex;
use serde_json::{Map, Value};

use crate::classify::Classification;
use crate::models::{
    new_id, parse_day, ChildRecord, Expense, Intent, MoodRecord, NoteRecord, Priority, Task,
    VoiceEntry, VOICE_SOURCE,
};
use crate::vocabulary::CategoryVocabulary;

/// Confidence recorded when the classifier reports none
pub const DEFAULT_CONFIDENCE: f64 = 0.95;
pub const DEFAULT_CURRENCY: &str = "INR";
pub const TODO_CATEGORY: &str = "Personal";
pub const REMINDER_TITLE: &str = "Reminder";
pub const DEFAULT_SENTIMENT: &str = "Neutral";
pub const DEFAULT_SENTENCE: &str = "Mood reflection";

const SHOPPING_KEYWORDS: [&str; 4] = ["shoe", "clothe", "dress", "buy"];

static NUMBER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("valid amount regex"));

/// Wall-clock inputs to a derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureTime {
    /// Local calendar day used for defaulted dates
    pub today: NaiveDate,
    /// Epoch milliseconds stamped on created records
    pub now_ms: i64,
}

impl CaptureTime {
    pub fn now() -> Self {
        let now = Local::now();
        Self {
            today: now.date_naive(),
            now_ms: now.timestamp_millis(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseDraft {
    pub amount: f64,
    pub currency: Option<String>,
    pub category: Option<String>,
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskDraft {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MoodDraft {
    pub sentiment: Option<String>,
    pub sentence: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteDraft {
    pub text: Option<String>,
    pub date: Option<NaiveDate>,
}

/// Classification payload validated into a per-intent shape.
///
/// `None` fields were absent, null, blank or unparseable and will take
/// their fallback during [`derive`].
#[derive(Debug, Clone, PartialEq)]
pub enum Draft {
    Expense(ExpenseDraft),
    Todo(TaskDraft),
    Reminder(TaskDraft),
    Mood(MoodDraft),
    Note(NoteDraft),
}

impl Draft {
    pub fn from_entities(intent: Intent, entities: &Map<String, Value>) -> Self {
        match intent {
            Intent::Expense => Self::Expense(ExpenseDraft {
                amount: entities.get("amount").map(coerce_amount).unwrap_or(0.0),
                currency: text_field(entities, &["currency"]),
                category: text_field(entities, &["category"]),
                date: date_field(entities),
                description: text_field(entities, &["description", "details"]),
            }),
            Intent::Todo | Intent::Reminder => {
                let draft = TaskDraft {
                    title: text_field(entities, &["title", "headline"]),
                    description: text_field(entities, &["description", "details"]),
                    priority: text_field(entities, &["priority"])
                        .map(|p| p.parse().unwrap_or_default()),
                    date: date_field(entities),
                };
                if intent == Intent::Todo {
                    Self::Todo(draft)
                } else {
                    Self::Reminder(draft)
                }
            }
            Intent::Mood => Self::Mood(MoodDraft {
                sentiment: text_field(entities, &["sentiment", "vibe"]),
                sentence: text_field(entities, &["sentence", "headline"]),
                reason: text_field(entities, &["reason"]),
            }),
            Intent::Note => Self::Note(NoteDraft {
                text: text_field(entities, &["text"]),
                date: date_field(entities),
            }),
        }
    }

    pub fn intent(&self) -> Intent {
        match self {
            Self::Expense(_) => Intent::Expense,
            Self::Todo(_) => Intent::Todo,
            Self::Reminder(_) => Intent::Reminder,
            Self::Mood(_) => Intent::Mood,
            Self::Note(_) => Intent::Note,
        }
    }
}

/// A voice entry and its derived record, ready to commit together
#[derive(Debug, Clone, PartialEq)]
pub struct Derivation {
    pub entry: VoiceEntry,
    pub child: ChildRecord,
    /// Category first seen in this capture; must be persisted with it
    pub new_category: Option<String>,
}

/// Apply the per-intent fallback rules.
///
/// A novel expense category is added to `vocabulary` before it is resolved,
/// so pass a staged copy and only keep it once the commit succeeds.
pub fn derive(
    raw_text: &str,
    classification: &Classification,
    vocabulary: &mut CategoryVocabulary,
    at: CaptureTime,
) -> Derivation {
    let draft = Draft::from_entities(classification.intent, &classification.entities);

    let entry = VoiceEntry {
        id: new_id(),
        raw_text: raw_text.to_string(),
        intent: draft.intent(),
        confidence: classification.confidence.unwrap_or(DEFAULT_CONFIDENCE),
        extracted_entities: classification.entities.clone(),
        created_at: at.now_ms,
        source: VOICE_SOURCE.to_string(),
    };

    let today = at.today.format("%Y-%m-%d").to_string();
    let day = |d: Option<NaiveDate>| {
        d.map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| today.clone())
    };

    let mut new_category = None;
    let child = match draft {
        Draft::Expense(d) => {
            let category = match d.category {
                Some(name) => {
                    if vocabulary.insert(&name) {
                        new_category = Some(name.trim().to_string());
                    }
                    vocabulary.resolve(&name).unwrap_or(name.trim()).to_string()
                }
                None => {
                    let guess = shopping_heuristic(raw_text);
                    vocabulary.resolve(guess).unwrap_or(guess).to_string()
                }
            };

            ChildRecord::Expense(Expense {
                id: new_id(),
                entry_id: entry.id.clone(),
                amount: d.amount,
                currency: d.currency.unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
                category,
                date: day(d.date),
                description: d.description.unwrap_or_else(|| raw_text.to_string()),
            })
        }
        Draft::Todo(d) => ChildRecord::Task(Task {
            id: new_id(),
            title: d.title.unwrap_or_else(|| raw_text.to_string()),
            description: d.description.unwrap_or_default(),
            completed: false,
            priority: d.priority.unwrap_or_default(),
            category: TODO_CATEGORY.to_string(),
            date: day(d.date),
            created_at: at.now_ms,
        }),
        Draft::Reminder(d) => ChildRecord::Task(Task {
            id: new_id(),
            title: d.title.unwrap_or_else(|| REMINDER_TITLE.to_string()),
            description: d.description.unwrap_or_default(),
            completed: false,
            priority: Priority::High,
            category: Task::REMINDER_CATEGORY.to_string(),
            date: day(d.date),
            created_at: at.now_ms,
        }),
        Draft::Mood(d) => ChildRecord::Mood(MoodRecord {
            id: new_id(),
            entry_id: entry.id.clone(),
            sentiment: d.sentiment.unwrap_or_else(|| DEFAULT_SENTIMENT.to_string()),
            sentence: d.sentence.unwrap_or_else(|| DEFAULT_SENTENCE.to_string()),
            reason: d.reason.unwrap_or_else(|| raw_text.to_string()),
            created_at: at.now_ms,
        }),
        Draft::Note(d) => ChildRecord::Note(NoteRecord {
            id: new_id(),
            entry_id: entry.id.clone(),
            text: d.text.unwrap_or_else(|| raw_text.to_string()),
            date: day(d.date),
            created_at: at.now_ms,
        }),
    };

    Derivation {
        entry,
        child,
        new_category,
    }
}

fn shopping_heuristic(raw_text: &str) -> &'static str {
    let lower = raw_text.to_lowercase();
    if SHOPPING_KEYWORDS.iter().any(|k| lower.contains(k)) {
        "Shopping"
    } else {
        "Others"
    }
}

/// First non-blank string among `keys`; numbers and bools are stringified
fn text_field(entities: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match entities.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn date_field(entities: &Map<String, Value>) -> Option<NaiveDate> {
    text_field(entities, &["date"]).and_then(|d| parse_day(&d))
}

/// Numeric coercion for `amount`; never negative, never NaN
fn coerce_amount(value: &Value) -> f64 {
    let amount = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_amount(s),
        _ => None,
    }
    .unwrap_or(0.0);

    if amount.is_finite() && amount > 0.0 {
        amount
    } else {
        0.0
    }
}

/// First number in free text, ignoring currency symbols and thousands separators
pub(crate) fn parse_amount(text: &str) -> Option<f64> {
    let cleaned = text.replace(',', "");
    NUMBER_REGEX.find(&cleaned).and_then(|m| m.as_str().parse().ok())
}
