//! Expense category vocabulary
//!
//! Categories are a set of display strings. Membership is case-insensitive
//! ("shopping" and "Shopping" are the same category) but the first casing
//! seen is the one that is kept and returned.

use std::collections::HashMap;

/// Categories reported when the category table is empty
pub const DEFAULT_CATEGORIES: [&str; 8] = [
    "Food",
    "Groceries",
    "Transport",
    "Shopping",
    "Bills",
    "Entertainment",
    "Medical",
    "Others",
];

pub fn default_categories() -> Vec<String> {
    DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect()
}

/// Case-insensitive lookup key for a category name
pub fn category_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Ordered, deduplicated category names with a case-insensitive index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryVocabulary {
    names: Vec<String>,
    /// lowercase key -> position in `names`
    index: HashMap<String, usize>,
}

impl CategoryVocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from stored names, dropping blanks and case-insensitive duplicates
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut vocabulary = Self::new();
        for name in names {
            vocabulary.insert(name.as_ref());
        }
        vocabulary
    }

    pub fn defaults() -> Self {
        Self::from_names(DEFAULT_CATEGORIES)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&category_key(name))
    }

    /// Canonical casing of a known category
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.index
            .get(&category_key(name))
            .map(|&pos| self.names[pos].as_str())
    }

    /// Add a category if it is not already known. Returns true when added.
    pub fn insert(&mut self, name: &str) -> bool {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return false;
        }

        let key = category_key(trimmed);
        if self.index.contains_key(&key) {
            return false;
        }

        self.index.insert(key, self.names.len());
        self.names.push(trimmed.to_string());
        true
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn into_names(self) -> Vec<String> {
        self.names
    }
}
