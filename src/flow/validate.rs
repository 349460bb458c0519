//! Field validator: pure checks of form input against field definitions.
//!
//! Missing required fields are reported before any format problem, and only
//! the first problem is reported: the respondent fixes one field at a time.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::responses::{FormValues, ResponseValue};
use super::step::{FieldSpec, InputKind};

/// `local@domain.tld`: one `@`, a dot in the domain, no whitespace.
static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

/// NANP shape: optional `+country`, then 3-3-4 digits with optional
/// parentheses around the area code and space/dot/dash separators.
static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\+\d{1,3}[\s.-]?)?(?:\(\d{3}\)|\d{3})[\s.-]?\d{3}[\s.-]?\d{4}$")
        .expect("phone pattern is valid")
});

/// Why a field was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InvalidReason {
    Missing,
    BadEmail,
    BadPhone,
}

impl std::fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "missing"),
            Self::BadEmail => write!(f, "bad-email"),
            Self::BadPhone => write!(f, "bad-phone"),
        }
    }
}

/// The first problem found in a form submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub field: String,
    pub label: String,
    pub input: InputKind,
    pub reason: InvalidReason,
}

impl ValidationIssue {
    fn new(field: &FieldSpec, reason: InvalidReason) -> Self {
        Self {
            field: field.name.clone(),
            label: field.label.clone(),
            input: field.input,
            reason,
        }
    }

    /// Text shown to the respondent next to the form.
    pub fn message(&self) -> String {
        match (self.reason, self.input) {
            (InvalidReason::Missing, InputKind::Checkbox) => {
                format!("Please check \"{}\"", self.label)
            }
            (InvalidReason::Missing, _) => format!("Please enter {}", self.label),
            (InvalidReason::BadEmail, _) => "Please enter a valid email address".to_string(),
            (InvalidReason::BadPhone, _) => "Please enter a valid phone number".to_string(),
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Outcome of validating a form submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidationResult {
    Valid,
    Invalid(ValidationIssue),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn issue(&self) -> Option<&ValidationIssue> {
        match self {
            Self::Valid => None,
            Self::Invalid(issue) => Some(issue),
        }
    }
}

fn is_missing(field: &FieldSpec, value: Option<&ResponseValue>) -> bool {
    if !field.required {
        return false;
    }
    match (field.input, value) {
        (_, None) => true,
        (InputKind::Checkbox, Some(v)) => !v.is_truthy(),
        (_, Some(v)) => v.is_blank(),
    }
}

fn format_problem(field: &FieldSpec, value: Option<&ResponseValue>) -> Option<InvalidReason> {
    let (reason, matches): (_, fn(&str) -> bool) = match field.input {
        InputKind::Email => (InvalidReason::BadEmail, is_email),
        InputKind::Tel => (InvalidReason::BadPhone, is_phone),
        _ => return None,
    };
    match value? {
        ResponseValue::Text(text) => {
            let text = text.trim();
            (!text.is_empty() && !matches(text)).then_some(reason)
        }
        // A flag or a selection is never an address or a number.
        other if other.is_blank() => None,
        _ => Some(reason),
    }
}

/// Validate `values` against `fields`.
///
/// `format_checks` enables the email and phone shape checks; required-field
/// checks always run.
pub fn validate(fields: &[FieldSpec], values: &FormValues, format_checks: bool) -> ValidationResult {
    if let Some(field) = fields
        .iter()
        .find(|f| is_missing(f, values.get(&f.name)))
    {
        return ValidationResult::Invalid(ValidationIssue::new(field, InvalidReason::Missing));
    }

    if format_checks {
        for field in fields {
            if let Some(reason) = format_problem(field, values.get(&field.name)) {
                return ValidationResult::Invalid(ValidationIssue::new(field, reason));
            }
        }
    }

    ValidationResult::Valid
}

pub fn is_email(s: &str) -> bool {
    EMAIL.is_match(s)
}

pub fn is_phone(s: &str) -> bool {
    PHONE.is_match(s)
}
