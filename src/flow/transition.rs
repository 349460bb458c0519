//! Transition engine: picks the next step for an answered step.
//!
//! Branch rules run in declared order and the first match wins, so a
//! disqualifying rule placed first short-circuits everything after it.
//! Without a match the flow advances to the next declared non-terminal step,
//! or to the success terminal after the last one.

use tracing::debug;

use super::catalog::Catalog;
use super::step::{Answer, Step, StepId};
use crate::error::FlowError;

/// Where an answered step leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Move forward to the step.
    Advance(StepId),
    /// Move back to an earlier (non-initial) step; answers from that step
    /// onward are stale.
    Revisit(StepId),
    /// Loop back to the initial step; everything collected so far is void.
    Restart(StepId),
}

impl Transition {
    pub fn target(&self) -> &StepId {
        match self {
            Self::Advance(id) | Self::Revisit(id) | Self::Restart(id) => id,
        }
    }
}

/// Evaluates branch rules against a catalog.
pub struct TransitionEngine<'a> {
    catalog: &'a Catalog,
}

impl<'a> TransitionEngine<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Compute the transition out of `step` for `answer`.
    pub fn next(&self, step: &Step, answer: &Answer) -> Result<Transition, FlowError> {
        if step.kind.is_terminal() {
            return Err(FlowError::InvalidOperation {
                operation: "advance",
                step: step.id.clone(),
                reason: "terminal steps have no outgoing transition".to_string(),
            });
        }

        if let Some((i, rule)) = step
            .branches
            .iter()
            .enumerate()
            .find(|(_, rule)| rule.when.matches(answer))
        {
            debug!(
                step = %step.id,
                rule = i,
                target = %rule.target,
                "Branch rule matched"
            );
            return Ok(self.classify(&step.id, &rule.target));
        }

        let target = match self.catalog.next_declared(&step.id) {
            Some(next) => next.id.clone(),
            None => self.catalog.success().clone(),
        };
        Ok(self.classify(&step.id, &target))
    }

    fn classify(&self, from: &StepId, target: &StepId) -> Transition {
        if target == self.catalog.success() || target == self.catalog.failure() {
            return Transition::Advance(target.clone());
        }
        if target == self.catalog.initial() {
            return Transition::Restart(target.clone());
        }
        match (self.catalog.position(from), self.catalog.position(target)) {
            (Some(f), Some(t)) if t <= f => Transition::Revisit(target.clone()),
            _ => Transition::Advance(target.clone()),
        }
    }
}
