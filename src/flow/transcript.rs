//! Transcript: the ordered log of displayed prompts and given answers.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::step::{Step, StepId};

/// Who produced a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
    pub step: StepId,
}

/// How a validated form submission shows up in the transcript.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormTranscript {
    /// Nothing is recorded; raw contact details stay out of the log.
    Omit,
    /// One user entry noting that details were submitted.
    #[default]
    Summary,
}

/// Text of the summary entry recorded under [`FormTranscript::Summary`].
pub const FORM_SUMMARY: &str = "Contact details submitted";

/// Append-only log for one flow attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the step's prompt as a system entry.
    ///
    /// Returns `false` (and appends nothing) when the last entry is already
    /// this prompt for this step, so re-entering a step never duplicates it.
    pub fn record_prompt(&mut self, step: &Step) -> bool {
        if let Some(last) = self.entries.last() {
            if last.speaker == Speaker::System && last.step == step.id && last.text == step.prompt
            {
                debug!(step = %step.id, "Prompt already recorded, skipping");
                return false;
            }
        }
        self.entries.push(TranscriptEntry {
            speaker: Speaker::System,
            text: step.prompt.clone(),
            step: step.id.clone(),
        });
        true
    }

    /// Append a user answer. `display` is the human-readable form of it.
    pub fn record_answer(&mut self, step: &Step, display: impl Into<String>) {
        self.entries.push(TranscriptEntry {
            speaker: Speaker::User,
            text: display.into(),
            step: step.id.clone(),
        });
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
