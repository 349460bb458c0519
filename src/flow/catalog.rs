//! Step catalog: the validated, read-only questionnaire graph.
//!
//! A catalog is built once (from a built-in variant or a JSON file) and
//! rejected up front if any step, branch target or terminal id is
//! inconsistent. Nothing downstream has to handle a dangling step id.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::step::{Step, StepId, StepKind};
use crate::error::CatalogError;

/// Unvalidated catalog definition, as written in JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogDef {
    pub name: String,
    pub initial: StepId,
    pub success: StepId,
    pub failure: StepId,
    /// Enables email/phone shape checks on form fields.
    #[serde(default)]
    pub format_checks: bool,
    pub steps: Vec<Step>,
}

/// A validated step catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    def: CatalogDef,
    index: HashMap<StepId, usize>,
}

impl Catalog {
    /// Validate a definition. Fails on the first defect found.
    pub fn new(def: CatalogDef) -> Result<Self, CatalogError> {
        if def.steps.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut index = HashMap::with_capacity(def.steps.len());
        for (i, step) in def.steps.iter().enumerate() {
            if index.insert(step.id.clone(), i).is_some() {
                return Err(CatalogError::DuplicateStep(step.id.clone()));
            }
        }

        for id in [&def.initial, &def.success, &def.failure] {
            if !index.contains_key(id) {
                return Err(CatalogError::NotFound(id.clone()));
            }
        }
        expect_kind(&def, &index, &def.success, StepKind::TerminalSuccess)?;
        expect_kind(&def, &index, &def.failure, StepKind::TerminalFailure)?;

        for step in &def.steps {
            validate_step(step, &index)?;
        }

        info!(
            catalog = %def.name,
            steps = def.steps.len(),
            format_checks = def.format_checks,
            "Step catalog loaded"
        );

        Ok(Self { def, index })
    }

    /// Parse and validate a JSON catalog.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let def: CatalogDef = serde_json::from_str(json)?;
        Self::new(def)
    }

    /// Read, parse and validate a JSON catalog file.
    pub fn load_file(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Override the catalog's format-check flag.
    pub fn with_format_checks(mut self, enabled: bool) -> Self {
        self.def.format_checks = enabled;
        self
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn initial(&self) -> &StepId {
        &self.def.initial
    }

    pub fn success(&self) -> &StepId {
        &self.def.success
    }

    pub fn failure(&self) -> &StepId {
        &self.def.failure
    }

    pub fn format_checks(&self) -> bool {
        self.def.format_checks
    }

    pub fn steps(&self) -> &[Step] {
        &self.def.steps
    }

    pub fn definition(&self) -> &CatalogDef {
        &self.def
    }

    /// Look up a step by id.
    pub fn step(&self, id: &StepId) -> Result<&Step, CatalogError> {
        self.index
            .get(id)
            .map(|&i| &self.def.steps[i])
            .ok_or_else(|| CatalogError::NotFound(id.clone()))
    }

    /// Declaration position of a step.
    pub fn position(&self, id: &StepId) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// The next non-terminal step declared after `id`, if any.
    pub fn next_declared(&self, id: &StepId) -> Option<&Step> {
        let pos = self.position(id)?;
        self.def.steps[pos + 1..]
            .iter()
            .find(|s| !s.kind.is_terminal())
    }

    /// Response keys owned by `id` and every step declared after it.
    pub fn keys_from(&self, id: &StepId) -> Vec<String> {
        let Some(pos) = self.position(id) else {
            return Vec::new();
        };
        let mut keys = Vec::new();
        for step in &self.def.steps[pos..] {
            match step.kind {
                StepKind::SingleChoice | StepKind::MultiChoice => {
                    keys.push(step.id.as_str().to_string());
                }
                StepKind::Form => keys.extend(step.fields.iter().map(|f| f.name.clone())),
                _ => {}
            }
        }
        keys
    }

    /// One-based position of a question step among all question steps,
    /// with the total question count.
    pub fn question_position(&self, id: &StepId) -> Option<(usize, usize)> {
        let questions: Vec<&Step> = self
            .def
            .steps
            .iter()
            .filter(|s| s.kind.is_question())
            .collect();
        let current = questions.iter().position(|s| &s.id == id)?;
        Some((current + 1, questions.len()))
    }
}

fn expect_kind(
    def: &CatalogDef,
    index: &HashMap<StepId, usize>,
    id: &StepId,
    expected: StepKind,
) -> Result<(), CatalogError> {
    let actual = def.steps[index[id]].kind;
    if actual != expected {
        return Err(CatalogError::WrongKind {
            step: id.clone(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

fn validate_step(step: &Step, index: &HashMap<StepId, usize>) -> Result<(), CatalogError> {
    if step.kind.accepts_choice() && step.options.is_empty() {
        return Err(CatalogError::MissingOptions(step.id.clone()));
    }

    if step.kind == StepKind::Form {
        if step.fields.is_empty() {
            return Err(CatalogError::MissingFields(step.id.clone()));
        }
        let mut seen = HashSet::new();
        for field in &step.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(CatalogError::DuplicateField {
                    step: step.id.clone(),
                    field: field.name.clone(),
                });
            }
            // Choice answers are keyed by step id, so a field of the same
            // name would overwrite them.
            if index.contains_key(&StepId::from(field.name.as_str())) {
                return Err(CatalogError::FieldShadowsStep {
                    step: step.id.clone(),
                    field: field.name.clone(),
                });
            }
        }
    }

    if step.kind.is_terminal() && !step.branches.is_empty() {
        return Err(CatalogError::TerminalBranches(step.id.clone()));
    }

    for rule in &step.branches {
        if !index.contains_key(&rule.target) {
            return Err(CatalogError::UnknownBranchTarget {
                step: step.id.clone(),
                target: rule.target.clone(),
            });
        }
    }

    Ok(())
}
