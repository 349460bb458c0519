//! Response store: what the respondent has said so far.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A collected value. Form inputs arrive as text or booleans; multi-choice
/// answers are stored as the selected option values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseValue {
    Flag(bool),
    Text(String),
    Selection(Vec<String>),
}

impl ResponseValue {
    /// Empty string (after trimming), unchecked box, or empty selection.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Flag(b) => !b,
            Self::Text(s) => s.trim().is_empty(),
            Self::Selection(v) => v.is_empty(),
        }
    }

    /// Checkbox semantics. HTML forms post checked boxes as `"on"`.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Flag(b) => *b,
            Self::Text(s) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "true" | "on" | "yes"
            ),
            Self::Selection(v) => !v.is_empty(),
        }
    }
}

impl From<&str> for ResponseValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ResponseValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for ResponseValue {
    fn from(b: bool) -> Self {
        Self::Flag(b)
    }
}

/// Raw form input keyed by field name, in the order it was entered.
pub type FormValues = IndexMap<String, ResponseValue>;

/// Insertion-ordered map from response key (a step id for choice answers,
/// a field name for form answers) to its value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseStore {
    values: IndexMap<String, ResponseValue>,
}

impl ResponseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a value. Re-writing an existing key keeps its original position.
    pub fn put(&mut self, key: impl Into<String>, value: ResponseValue) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&ResponseValue> {
        self.values.get(key)
    }

    /// Drop the given keys, preserving the order of the rest.
    pub fn remove_keys<S: AsRef<str>>(&mut self, keys: &[S]) -> usize {
        let before = self.values.len();
        for key in keys {
            self.values.shift_remove(key.as_ref());
        }
        before - self.values.len()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResponseValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Owned copy of the entries whose keys are in `keys`, in `keys` order.
    pub fn subset<S: AsRef<str>>(&self, keys: &[S]) -> IndexMap<String, ResponseValue> {
        keys.iter()
            .filter_map(|k| {
                let k = k.as_ref();
                self.values.get(k).map(|v| (k.to_string(), v.clone()))
            })
            .collect()
    }
}
