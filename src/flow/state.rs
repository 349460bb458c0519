//! Flow state: the single mutable unit of a conversation, and the
//! read-only snapshot handed to the presentation layer.

use serde::{Deserialize, Serialize};

use super::responses::{FormValues, ResponseStore};
use super::step::{ChoiceOption, FieldSpec, StepId, StepKind};
use super::transcript::{Transcript, TranscriptEntry};
use super::validate::ValidationIssue;

/// Everything a conversation has accumulated in the current attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowState {
    /// Step being shown (or about to be shown).
    pub current: StepId,
    pub responses: ResponseStore,
    pub transcript: Transcript,
    /// True from a step change until its reveal fires. No input is
    /// accepted while set.
    pub awaiting_display: bool,
    /// Last failed form validation, cleared when the offending field is edited.
    pub validation_error: Option<ValidationIssue>,
    /// Form values entered on the current form step but not yet submitted.
    pub draft: FormValues,
}

impl FlowState {
    /// Fresh state positioned at `initial`, waiting for its first reveal.
    pub fn new(initial: StepId) -> Self {
        Self {
            current: initial,
            responses: ResponseStore::new(),
            transcript: Transcript::new(),
            awaiting_display: true,
            validation_error: None,
            draft: FormValues::new(),
        }
    }

    /// Move to `step`. Per-step scratch state is dropped.
    pub fn enter(&mut self, step: StepId) {
        self.current = step;
        self.awaiting_display = true;
        self.validation_error = None;
        self.draft.clear();
    }
}

/// Identifies one scheduled reveal. A ticket only applies while it is the
/// most recently issued one, so a late timer can never reveal a later step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealTicket {
    pub step: StepId,
    pub generation: u64,
}

/// How a finished flow ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Qualified,
    Disqualified,
}

impl Outcome {
    pub fn from_kind(kind: StepKind) -> Option<Self> {
        match kind {
            StepKind::TerminalSuccess => Some(Self::Qualified),
            StepKind::TerminalFailure => Some(Self::Disqualified),
            _ => None,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Qualified => write!(f, "qualified"),
            Self::Disqualified => write!(f, "disqualified"),
        }
    }
}

/// "Step n of N" over the question steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

/// Renderable view of the current step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepView {
    pub id: StepId,
    pub kind: StepKind,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ChoiceOption>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldSpec>,
}

/// Owned, read-only view of a conversation for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowSnapshot {
    /// Catalog name.
    pub flow: String,
    pub step: StepView,
    pub transcript: Vec<TranscriptEntry>,
    pub awaiting_display: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_error: Option<ValidationIssue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_message: Option<String>,
    #[serde(default, skip_serializing_if = "FormValues::is_empty")]
    pub draft: FormValues,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_awaits_first_reveal() {
        let state = FlowState::new("welcome".into());
        assert_eq!(state.current.as_str(), "welcome");
        assert!(state.awaiting_display);
        assert!(state.responses.is_empty());
        assert!(state.transcript.is_empty());
        assert!(state.validation_error.is_none());
    }

    #[test]
    fn enter_resets_step_scratch_but_keeps_answers() {
        let mut state = FlowState::new("welcome".into());
        state.awaiting_display = false;
        state.responses.put("exposure", "yes".into());
        state.draft.insert("name".into(), "A".into());

        state.enter("timing".into());

        assert_eq!(state.current.as_str(), "timing");
        assert!(state.awaiting_display);
        assert!(state.draft.is_empty());
        assert_eq!(state.responses.len(), 1);
    }

    #[test]
    fn outcome_from_kind() {
        assert_eq!(
            Outcome::from_kind(StepKind::TerminalSuccess),
            Some(Outcome::Qualified)
        );
        assert_eq!(
            Outcome::from_kind(StepKind::TerminalFailure),
            Some(Outcome::Disqualified)
        );
        assert_eq!(Outcome::from_kind(StepKind::Form), None);
    }

    #[test]
    fn outcome_display_matches_serde() {
        for outcome in [Outcome::Qualified, Outcome::Disqualified] {
            let json = serde_json::to_string(&outcome).unwrap();
            assert_eq!(format!("\"{outcome}\""), json);
        }
    }
}
