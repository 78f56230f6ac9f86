//! Classification seam
//!
//! The store never classifies anything itself. It accepts an already
//! resolved [`Classification`] from whatever [`Classifier`] the caller uses:
//! a remote model, a test double, or the offline [`KeywordClassifier`].

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{Map, Value};

use crate::capture::parse_amount;
use crate::error::{Error, Result};
use crate::models::Intent;

/// A resolved `{ intent, entities }` result
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub intent: Intent,
    pub confidence: Option<f64>,
    pub entities: Map<String, Value>,
}

impl Classification {
    pub fn new(intent: Intent) -> Self {
        Self {
            intent,
            confidence: None,
            entities: Map::new(),
        }
    }

    pub fn with_entities(mut self, entities: Map<String, Value>) -> Self {
        self.entities = entities;
        self
    }

    /// Read a classifier response shaped `{ "intent", "confidence"?, "entities"? }`.
    ///
    /// Unrecognized intent labels become NOTE. A missing or non-object
    /// `entities` is treated as empty.
    pub fn from_json(value: Value) -> Result<Self> {
        let Value::Object(mut obj) = value else {
            return Err(Error::InvalidData(
                "Classification must be a JSON object".into(),
            ));
        };

        let intent = obj
            .get("intent")
            .and_then(Value::as_str)
            .map(Intent::parse_lenient)
            .unwrap_or(Intent::Note);
        let confidence = obj.get("confidence").and_then(Value::as_f64);
        let entities = match obj.remove("entities") {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };

        Ok(Self {
            intent,
            confidence,
            entities,
        })
    }
}

/// Anything that can turn a transcript into a classification
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, transcript: &str) -> Result<Classification>;

    /// Short name for logs
    fn name(&self) -> &str;
}

const EXPENSE_WORDS: [&str; 7] = ["spent", "bought", "cost", "paid", "price", "rupees", " rs"];

const MOOD_WORDS: [&str; 21] = [
    "feel",
    "feeling",
    "happy",
    "sad",
    "stressed",
    "anxious",
    "tired",
    "great",
    "awesome",
    "bad",
    "terrible",
    "thought",
    "think",
    "reflection",
    "realized",
    "wondering",
    "excited",
    "angry",
    "mood",
    "today was",
    "day was",
];

const REMINDER_WORDS: [&str; 3] = ["remind", "reminder", "alert"];
const TODO_WORDS: [&str; 4] = ["todo", "task", "need to", "remember to"];

static RUPEE_SUFFIX_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\s?rs").expect("valid rupee regex"));

/// Offline keyword heuristic, checked in order: expense, mood, reminder, todo, note
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify synchronously
    pub fn classify_text(&self, transcript: &str) -> Classification {
        let lower = transcript.to_lowercase();
        let contains_any = |words: &[&str]| words.iter().any(|w| lower.contains(w));

        let is_expense = contains_any(&EXPENSE_WORDS) || RUPEE_SUFFIX_REGEX.is_match(&lower);
        let (intent, confidence) = if is_expense {
            (Intent::Expense, 0.95)
        } else if contains_any(&MOOD_WORDS) {
            (Intent::Mood, 0.9)
        } else if contains_any(&REMINDER_WORDS) {
            (Intent::Reminder, 0.9)
        } else if contains_any(&TODO_WORDS) {
            (Intent::Todo, 0.85)
        } else {
            (Intent::Note, 0.5)
        };

        let mut entities = Map::new();
        if intent == Intent::Expense {
            if let Some(amount) = parse_amount(transcript).filter(|a| *a >= 0.0) {
                entities.insert("amount".to_string(), Value::from(amount));
            }
        }

        Classification {
            intent,
            confidence: Some(confidence),
            entities,
        }
    }
}

#[async_trait]
impl Classifier for KeywordClassifier {
    async fn classify(&self, transcript: &str) -> Result<Classification> {
        Ok(self.classify_text(transcript))
    }

    fn name(&self) -> &str {
        "keyword"
    }
}
