//! Qualification flow: a scripted, branching chat questionnaire.
//!
//! A `Catalog` declares the steps and their branch rules. A `FlowController`
//! walks one respondent through it: each input is validated, recorded in the
//! response store and transcript, and routed by the `TransitionEngine`. Steps
//! are revealed after a composing delay, driven by `Conversation`.

pub mod catalog;
pub mod controller;
pub mod responses;
pub mod reveal;
pub mod state;
pub mod step;
pub mod transcript;
pub mod transition;
pub mod validate;
pub mod variants;

pub use catalog::{Catalog, CatalogDef};
pub use controller::FlowController;
pub use responses::{FormValues, ResponseStore, ResponseValue};
pub use reveal::{Conversation, DEFAULT_REVEAL_DELAY};
pub use state::{FlowSnapshot, FlowState, Outcome, Progress, RevealTicket, StepView};
pub use step::{
    Answer, BranchRule, ChoiceOption, FieldSpec, InputKind, Predicate, Step, StepId, StepKind,
};
pub use transcript::{FormTranscript, Speaker, Transcript, TranscriptEntry};
pub use transition::{Transition, TransitionEngine};
pub use validate::{InvalidReason, ValidationIssue, ValidationResult};
pub use variants::Variant;
