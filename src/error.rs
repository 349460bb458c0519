//! Error types for the qualification flow engine.

use crate::flow::step::StepId;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Flow error: {0}")]
    Flow(#[from] FlowError),

    #[error("Submission error: {0}")]
    Submit(#[from] SubmitError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Unknown flow variant: {0}")]
    UnknownVariant(String),
}

/// Step catalog defects. All of these are detected when a catalog is built,
/// before any conversation starts.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Step not found: {0}")]
    NotFound(StepId),

    #[error("Duplicate step id: {0}")]
    DuplicateStep(StepId),

    #[error("Step {step} branches to unknown step {target}")]
    UnknownBranchTarget { step: StepId, target: StepId },

    #[error("Step {step} has kind {actual}, expected {expected}")]
    WrongKind {
        step: StepId,
        expected: String,
        actual: String,
    },

    #[error("Choice step {0} has no options")]
    MissingOptions(StepId),

    #[error("Form step {0} has no fields")]
    MissingFields(StepId),

    #[error("Duplicate field {field} in step {step}")]
    DuplicateField { step: StepId, field: String },

    #[error("Field {field} in step {step} collides with a step id")]
    FieldShadowsStep { step: StepId, field: String },

    #[error("Terminal step {0} cannot declare branches")]
    TerminalBranches(StepId),

    #[error("Catalog has no steps")]
    Empty,

    #[error("Failed to parse catalog: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors returned by the flow controller's input operations.
///
/// None of these change the flow state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    #[error("Cannot {operation} on step {step}: {reason}")]
    InvalidOperation {
        operation: &'static str,
        step: StepId,
        reason: String,
    },

    #[error("Step {step} has no option {value}")]
    UnknownOption { step: StepId, value: String },

    #[error("Step {0} requires at least one selection")]
    EmptySelection(StepId),

    #[error("Step {step} has no field {field}")]
    UnknownField { step: StepId, field: String },
}

/// Lead delivery errors. Delivery is fire-and-forget, so these are only
/// logged by the submitter that produced them.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Endpoint {url} rejected lead with status {status}")]
    Rejected { url: String, status: u16 },
}

/// Front-end channel errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Channel {name} disconnected: {reason}")]
    Disconnected { name: String, reason: String },
}

/// Result type alias for the engine.
pub type Result<T> = std::result::Result<T, Error>;
