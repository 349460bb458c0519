//! Flow controller: the facade the presentation layer drives.
//!
//! Owns one conversation's `FlowState`. Every input goes through here:
//! the controller checks the reveal gate and step kind, validates, writes
//! the response store, asks the transition engine for the next step, keeps
//! the transcript and issues the next reveal ticket. It never sleeps; the
//! timer that redeems tickets lives in `flow::reveal`.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::catalog::Catalog;
use super::responses::{FormValues, ResponseValue};
use super::state::{FlowSnapshot, FlowState, Outcome, Progress, RevealTicket, StepView};
use super::step::{Answer, Step, StepKind};
use super::transcript::{FORM_SUMMARY, FormTranscript};
use super::transition::{Transition, TransitionEngine};
use super::validate::{ValidationResult, validate};
use crate::error::FlowError;
use crate::submit::{Lead, LeadSubmitter};

/// Drives a single conversation through a catalog.
pub struct FlowController {
    catalog: Arc<Catalog>,
    submitter: Arc<dyn LeadSubmitter>,
    form_transcript: FormTranscript,
    state: FlowState,
    pending_reveal: Option<RevealTicket>,
    generation: u64,
}

impl FlowController {
    /// Create a controller positioned at the catalog's initial step.
    /// Nothing is revealed until [`start`](Self::start) is called.
    pub fn new(catalog: Arc<Catalog>, submitter: Arc<dyn LeadSubmitter>) -> Self {
        let state = FlowState::new(catalog.initial().clone());
        Self {
            catalog,
            submitter,
            form_transcript: FormTranscript::default(),
            state,
            pending_reveal: None,
            generation: 0,
        }
    }

    pub fn with_form_transcript(mut self, policy: FormTranscript) -> Self {
        self.form_transcript = policy;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    /// The reveal that is currently allowed to fire, if any.
    pub fn pending_reveal(&self) -> Option<&RevealTicket> {
        self.pending_reveal.as_ref()
    }

    /// Begin the flow at the initial step and schedule its reveal.
    pub fn start(&mut self) -> RevealTicket {
        self.reset();
        info!(flow = %self.catalog.name(), step = %self.state.current, "Flow started");
        self.schedule_reveal()
    }

    /// Return to the initial step from any state, discarding all answers,
    /// the transcript and any pending reveal.
    pub fn restart(&mut self) -> RevealTicket {
        let from = self.state.current.clone();
        self.reset();
        info!(flow = %self.catalog.name(), from = %from, "Flow restarted");
        self.schedule_reveal()
    }

    /// End the composing delay for `ticket`'s step.
    ///
    /// Returns `false` for any ticket other than the latest one issued; those
    /// belong to a step the flow has already left.
    pub fn reveal(&mut self, ticket: &RevealTicket) -> bool {
        if self.pending_reveal.as_ref() != Some(ticket) {
            debug!(
                step = %ticket.step,
                generation = ticket.generation,
                "Ignoring stale reveal"
            );
            return false;
        }
        self.pending_reveal = None;
        self.state.awaiting_display = false;

        let catalog = Arc::clone(&self.catalog);
        if let Ok(step) = catalog.step(&self.state.current) {
            self.state.transcript.record_prompt(step);
        }
        debug!(step = %self.state.current, generation = ticket.generation, "Step revealed");
        true
    }

    /// Answer a welcome, message or single-choice step with one option value.
    /// On a multi-choice step this confirms a selection of just that value.
    pub fn choose(&mut self, value: &str) -> Result<Transition, FlowError> {
        let catalog = Arc::clone(&self.catalog);
        let step = self.input_step(&catalog, "choose")?;

        if step.kind == StepKind::MultiChoice {
            return self.choose_many(&[value.to_string()]);
        }
        if !step.kind.accepts_choice() {
            return Err(self.reject("choose", step, format!("{} steps take no choices", step.kind)));
        }

        let option = step.option(value).ok_or_else(|| FlowError::UnknownOption {
            step: step.id.clone(),
            value: value.to_string(),
        })?;
        let transition =
            TransitionEngine::new(&catalog).next(step, &Answer::Choice(value.to_string()))?;

        if step.kind.is_question() {
            self.state
                .responses
                .put(step.id.as_str(), ResponseValue::Text(value.to_string()));
        }
        self.state.transcript.record_answer(step, option.label.as_str());
        info!(step = %step.id, answer = %value, "Answer recorded");

        self.apply(&catalog, &transition);
        Ok(transition)
    }

    /// Confirm a multi-choice selection. Duplicates collapse and the stored
    /// selection follows option order.
    pub fn choose_many(&mut self, values: &[String]) -> Result<Transition, FlowError> {
        let catalog = Arc::clone(&self.catalog);
        let step = self.input_step(&catalog, "choose")?;

        if step.kind != StepKind::MultiChoice {
            return Err(self.reject(
                "choose",
                step,
                format!("{} steps take a single choice", step.kind),
            ));
        }
        if values.is_empty() {
            return Err(FlowError::EmptySelection(step.id.clone()));
        }
        if let Some(unknown) = values.iter().find(|v| step.option(v).is_none()) {
            return Err(FlowError::UnknownOption {
                step: step.id.clone(),
                value: unknown.clone(),
            });
        }

        let selected: Vec<_> = step
            .options
            .iter()
            .filter(|o| values.contains(&o.value))
            .collect();
        let selection: Vec<String> = selected.iter().map(|o| o.value.clone()).collect();
        let labels = selected
            .iter()
            .map(|o| o.label.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let transition =
            TransitionEngine::new(&catalog).next(step, &Answer::Selection(selection.clone()))?;

        self.state
            .responses
            .put(step.id.as_str(), ResponseValue::Selection(selection));
        self.state.transcript.record_answer(step, labels);
        info!(step = %step.id, selected = selected.len(), "Selection recorded");

        self.apply(&catalog, &transition);
        Ok(transition)
    }

    /// Record an edit to one form field without submitting. Clears the
    /// validation error if it was about this field.
    pub fn update_field(&mut self, name: &str, value: ResponseValue) -> Result<(), FlowError> {
        let catalog = Arc::clone(&self.catalog);
        let step = self.form_step(&catalog, "edit field")?;

        if step.field(name).is_none() {
            return Err(FlowError::UnknownField {
                step: step.id.clone(),
                field: name.to_string(),
            });
        }

        self.state.draft.insert(name.to_string(), value);
        if self
            .state
            .validation_error
            .as_ref()
            .is_some_and(|issue| issue.field == name)
        {
            self.state.validation_error = None;
        }
        Ok(())
    }

    /// Submit the form step. `values` are laid over any drafted values.
    ///
    /// An invalid submission leaves the flow on the form with
    /// `validation_error` set and is returned as `Ok(Invalid(..))`; the
    /// caller may resubmit. A valid one is stored, handed to the submitter
    /// once, and the flow moves on to the success terminal.
    pub fn submit_form(&mut self, values: FormValues) -> Result<ValidationResult, FlowError> {
        let catalog = Arc::clone(&self.catalog);
        let step = self.form_step(&catalog, "submit form")?;

        if let Some(unknown) = values.keys().find(|k| step.field(k).is_none()) {
            return Err(FlowError::UnknownField {
                step: step.id.clone(),
                field: unknown.clone(),
            });
        }

        let mut merged = self.state.draft.clone();
        merged.extend(values);

        let result = validate(&step.fields, &merged, catalog.format_checks());
        if let ValidationResult::Invalid(issue) = &result {
            info!(
                step = %step.id,
                field = %issue.field,
                reason = %issue.reason,
                "Form rejected"
            );
            self.state.validation_error = Some(issue.clone());
            self.state.draft = merged;
            return Ok(result);
        }

        // A forwarded lead always finishes the flow, whatever follows the form.
        let transition = Transition::Advance(catalog.success().clone());

        let names: Vec<&str> = step.fields.iter().map(|f| f.name.as_str()).collect();
        for name in &names {
            if let Some(value) = merged.get(*name) {
                self.state.responses.put(*name, value.clone());
            }
        }
        let fields = self.state.responses.subset(&names);
        let answers = self
            .state
            .responses
            .iter()
            .filter(|(k, _)| !names.contains(k))
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        let lead = Lead::new(catalog.name(), fields, answers);
        info!(
            step = %step.id,
            lead_id = %lead.id,
            submitter = %self.submitter.name(),
            "Form accepted, forwarding lead"
        );
        self.submitter.submit(lead);

        if self.form_transcript == FormTranscript::Summary {
            self.state.transcript.record_answer(step, FORM_SUMMARY);
        }

        self.apply(&catalog, &transition);
        Ok(result)
    }

    /// Owned view of the conversation for rendering.
    pub fn snapshot(&self) -> FlowSnapshot {
        let step = self.catalog.step(&self.state.current).ok();
        let kind = step.map(|s| s.kind);
        FlowSnapshot {
            flow: self.catalog.name().to_string(),
            step: StepView {
                id: self.state.current.clone(),
                kind: kind.unwrap_or(StepKind::Welcome),
                prompt: step.map(|s| s.prompt.clone()).unwrap_or_default(),
                options: step.map(|s| s.options.clone()).unwrap_or_default(),
                fields: step.map(|s| s.fields.clone()).unwrap_or_default(),
            },
            transcript: self.state.transcript.entries().to_vec(),
            awaiting_display: self.state.awaiting_display,
            validation_error: self.state.validation_error.clone(),
            validation_message: self.state.validation_error.as_ref().map(|i| i.message()),
            draft: self.state.draft.clone(),
            outcome: kind.and_then(Outcome::from_kind),
            progress: self
                .catalog
                .question_position(&self.state.current)
                .map(|(current, total)| Progress { current, total }),
        }
    }

    fn reset(&mut self) {
        self.state = FlowState::new(self.catalog.initial().clone());
    }

    fn schedule_reveal(&mut self) -> RevealTicket {
        self.generation += 1;
        let ticket = RevealTicket {
            step: self.state.current.clone(),
            generation: self.generation,
        };
        if let Some(stale) = self.pending_reveal.replace(ticket.clone()) {
            debug!(step = %stale.step, generation = stale.generation, "Pending reveal superseded");
        }
        ticket
    }

    fn apply(&mut self, catalog: &Catalog, transition: &Transition) {
        let from = self.state.current.clone();
        match transition {
            Transition::Advance(target) => {
                self.state.enter(target.clone());
            }
            Transition::Revisit(target) => {
                let stale = catalog.keys_from(target);
                let removed = self.state.responses.remove_keys(&stale);
                info!(from = %from, to = %target, cleared = removed, "Revisiting earlier step");
                self.state.enter(target.clone());
            }
            Transition::Restart(_) => {
                info!(from = %from, "Answer invalidates the attempt, starting over");
                self.reset();
            }
        }

        match catalog.step(&self.state.current).map(|s| s.kind) {
            Ok(kind) => match Outcome::from_kind(kind) {
                Some(outcome) => {
                    info!(flow = %catalog.name(), from = %from, outcome = %outcome, "Flow finished")
                }
                None => debug!(from = %from, to = %self.state.current, "Step changed"),
            },
            Err(e) => warn!(error = %e, "Transitioned to a step outside the catalog"),
        }

        self.schedule_reveal();
    }

    /// The current step, if it is revealed and accepts input.
    fn input_step<'c>(
        &self,
        catalog: &'c Catalog,
        operation: &'static str,
    ) -> Result<&'c Step, FlowError> {
        let step = catalog
            .step(&self.state.current)
            .map_err(|e| FlowError::InvalidOperation {
                operation,
                step: self.state.current.clone(),
                reason: e.to_string(),
            })?;
        if self.state.awaiting_display {
            return Err(self.reject(operation, step, "step has not been revealed yet".into()));
        }
        if step.kind.is_terminal() {
            return Err(self.reject(operation, step, "flow is finished, restart to continue".into()));
        }
        Ok(step)
    }

    fn form_step<'c>(
        &self,
        catalog: &'c Catalog,
        operation: &'static str,
    ) -> Result<&'c Step, FlowError> {
        let step = self.input_step(catalog, operation)?;
        if step.kind != StepKind::Form {
            return Err(self.reject(operation, step, format!("{} steps have no form", step.kind)));
        }
        Ok(step)
    }

    fn reject(&self, operation: &'static str, step: &Step, reason: String) -> FlowError {
        warn!(step = %step.id, operation, reason = %reason, "Rejected input");
        FlowError::InvalidOperation {
            operation,
            step: step.id.clone(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FlowError;
    use crate::flow::catalog::CatalogDef;
    use crate::flow::state::Outcome;
    use crate::flow::step::{ChoiceOption, FieldSpec, InputKind};
    use crate::flow::transcript::Speaker;
    use crate::flow::validate::InvalidReason;
    use crate::flow::variants::Variant;
    use crate::submit::ChannelSubmitter;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn controller(variant: Variant) -> (FlowController, UnboundedReceiver<Lead>) {
        let (submitter, rx) = ChannelSubmitter::new();
        let catalog = Arc::new(variant.catalog().unwrap());
        (FlowController::new(catalog, Arc::new(submitter)), rx)
    }

    /// Fire the pending reveal, as the timer would.
    fn reveal(c: &mut FlowController) {
        let ticket = c.pending_reveal().cloned().expect("a reveal is pending");
        assert!(c.reveal(&ticket));
    }

    fn answer(c: &mut FlowController, value: &str) -> Transition {
        reveal(c);
        c.choose(value).unwrap()
    }

    fn form(pairs: &[(&str, ResponseValue)]) -> FormValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn at_classic_form() -> (FlowController, UnboundedReceiver<Lead>) {
        let (mut c, rx) = controller(Variant::Classic);
        c.start();
        for value in ["start", "yes", "pre-2005", "diagnosed", "no"] {
            answer(&mut c, value);
        }
        reveal(&mut c);
        assert_eq!(c.state().current.as_str(), "contact");
        (c, rx)
    }

    #[test]
    fn start_positions_at_initial_and_awaits_reveal() {
        let (mut c, _rx) = controller(Variant::LawyerReview);
        let ticket = c.start();
        assert_eq!(ticket.step.as_str(), "welcome");
        let snap = c.snapshot();
        assert!(snap.awaiting_display);
        assert!(snap.transcript.is_empty());
        assert_eq!(snap.step.kind, StepKind::Welcome);
    }

    #[test]
    fn inputs_rejected_until_reveal() {
        let (mut c, _rx) = controller(Variant::LawyerReview);
        c.start();
        assert!(matches!(
            c.choose("start"),
            Err(FlowError::InvalidOperation { .. })
        ));
        reveal(&mut c);
        c.choose("start").unwrap();

        // New step: gated again.
        assert!(c.state().awaiting_display);
        assert!(matches!(
            c.choose("yes"),
            Err(FlowError::InvalidOperation { .. })
        ));
        assert!(matches!(
            c.submit_form(FormValues::new()),
            Err(FlowError::InvalidOperation { .. })
        ));
        assert_eq!(c.state().current.as_str(), "exposure");
    }

    #[test]
    fn reveal_records_prompt_once() {
        let (mut c, _rx) = controller(Variant::LawyerReview);
        let ticket = c.start();
        assert!(c.reveal(&ticket));
        assert!(!c.reveal(&ticket));
        let snap = c.snapshot();
        assert_eq!(snap.transcript.len(), 1);
        assert_eq!(snap.transcript[0].speaker, Speaker::System);
    }

    #[test]
    fn stale_ticket_cannot_reveal_new_step() {
        let (mut c, _rx) = controller(Variant::LawyerReview);
        let first = c.start();
        let second = c.restart();
        assert!(!c.reveal(&first));
        assert!(c.state().awaiting_display);
        assert!(c.reveal(&second));
    }

    #[test]
    fn negative_exposure_ends_in_failure() {
        let (mut c, rx) = controller(Variant::LawyerReview);
        c.start();
        answer(&mut c, "start");
        let t = answer(&mut c, "no");
        assert_eq!(t.target().as_str(), "not-eligible");

        let snap = c.snapshot();
        assert_eq!(snap.outcome, Some(Outcome::Disqualified));
        assert!(c.state().responses.get("timing").is_none());

        reveal(&mut c);
        assert!(matches!(
            c.choose("yes"),
            Err(FlowError::InvalidOperation { .. })
        ));
        drop(rx);
    }

    #[test]
    fn undiagnosed_clears_everything_and_returns_to_start() {
        let (mut c, _rx) = controller(Variant::LawyerReview);
        c.start();
        answer(&mut c, "start");
        answer(&mut c, "yes");
        answer(&mut c, "pre-2005");
        assert_eq!(c.state().responses.len(), 2);

        let t = answer(&mut c, "undiagnosed");
        assert!(matches!(t, Transition::Restart(_)));
        assert_eq!(c.state().current, *c.catalog().initial());
        assert!(c.state().responses.is_empty());
        assert!(c.state().transcript.is_empty());
        assert!(c.state().awaiting_display);
    }

    #[test]
    fn restart_equals_fresh_start_from_any_state() {
        let (mut fresh, _rx0) = controller(Variant::LawyerReview);
        fresh.start();
        let expected = fresh.state().clone();

        // Mid-reveal.
        let (mut c, _rx1) = controller(Variant::LawyerReview);
        c.start();
        c.restart();
        assert_eq!(*c.state(), expected);

        // Mid-flow with answers and transcript.
        answer(&mut c, "start");
        answer(&mut c, "yes");
        c.restart();
        assert_eq!(*c.state(), expected);

        // Failure terminal.
        answer(&mut c, "start");
        answer(&mut c, "no");
        reveal(&mut c);
        c.restart();
        assert_eq!(*c.state(), expected);
        assert_eq!(c.snapshot(), fresh.snapshot());
    }

    #[test]
    fn restart_from_success_terminal() {
        let (mut c, _rx) = at_classic_form();
        c.submit_form(form(&[
            ("name", "A".into()),
            ("email", "a@b.com".into()),
            ("phone", "5551234567".into()),
        ]))
        .unwrap();
        assert_eq!(c.snapshot().outcome, Some(Outcome::Qualified));
        reveal(&mut c);

        c.restart();
        assert_eq!(c.state().current.as_str(), "welcome");
        assert!(c.state().responses.is_empty());
        assert!(c.snapshot().outcome.is_none());
    }

    #[test]
    fn choose_rejects_unknown_option() {
        let (mut c, _rx) = controller(Variant::LawyerReview);
        c.start();
        reveal(&mut c);
        assert!(matches!(
            c.choose("maybe"),
            Err(FlowError::UnknownOption { .. })
        ));
        assert_eq!(c.state().current.as_str(), "welcome");
    }

    #[test]
    fn choose_on_form_is_invalid_operation() {
        let (mut c, _rx) = at_classic_form();
        let before = c.state().clone();
        assert!(matches!(
            c.choose("yes"),
            Err(FlowError::InvalidOperation { .. })
        ));
        assert_eq!(*c.state(), before);
    }

    #[test]
    fn submit_form_on_choice_step_is_invalid_operation() {
        let (mut c, _rx) = controller(Variant::Classic);
        c.start();
        reveal(&mut c);
        assert!(matches!(
            c.submit_form(FormValues::new()),
            Err(FlowError::InvalidOperation { .. })
        ));
    }

    #[test]
    fn missing_name_is_reported_first() {
        let (mut c, mut rx) = at_classic_form();
        let result = c
            .submit_form(form(&[
                ("name", "".into()),
                ("email", "a@b.com".into()),
                ("phone", "5551234567".into()),
            ]))
            .unwrap();
        let issue = result.issue().unwrap();
        assert_eq!(issue.field, "name");
        assert_eq!(issue.reason, InvalidReason::Missing);

        assert_eq!(c.state().current.as_str(), "contact");
        assert_eq!(c.snapshot().validation_message.as_deref(), Some("Please enter Full Name"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn malformed_email_blocks_submission() {
        let (mut c, mut rx) = at_classic_form();
        let result = c
            .submit_form(form(&[
                ("name", "A".into()),
                ("email", "not-an-email".into()),
                ("phone", "5551234567".into()),
            ]))
            .unwrap();
        let issue = result.issue().unwrap();
        assert_eq!(issue.field, "email");
        assert_eq!(issue.reason, InvalidReason::BadEmail);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn editing_offending_field_clears_error_and_retry_succeeds() {
        let (mut c, mut rx) = at_classic_form();
        c.submit_form(form(&[
            ("name", "A".into()),
            ("email", "not-an-email".into()),
            ("phone", "5551234567".into()),
        ]))
        .unwrap();
        assert!(c.state().validation_error.is_some());

        c.update_field("name", "Alice".into()).unwrap();
        assert!(c.state().validation_error.is_some(), "other field keeps error");
        c.update_field("email", "alice@example.com".into()).unwrap();
        assert!(c.state().validation_error.is_none());

        // Remaining values come from the draft.
        let result = c.submit_form(FormValues::new()).unwrap();
        assert!(result.is_valid());
        assert_eq!(c.state().current.as_str(), "submitted");

        let lead = rx.try_recv().unwrap();
        assert_eq!(lead.fields["name"], ResponseValue::from("Alice"));
        assert_eq!(lead.fields["email"], ResponseValue::from("alice@example.com"));
        assert_eq!(lead.answers["exposure"], ResponseValue::from("yes"));
        assert!(rx.try_recv().is_err(), "exactly one lead per submission");
    }

    #[test]
    fn valid_submission_forwards_complete_field_set_once() {
        let (mut c, mut rx) = at_classic_form();
        let result = c
            .submit_form(form(&[
                ("phone", "(555) 123-4567".into()),
                ("name", "A".into()),
                ("email", "a@b.com".into()),
            ]))
            .unwrap();
        assert!(result.is_valid());

        let lead = rx.try_recv().unwrap();
        let keys: Vec<&String> = lead.fields.keys().collect();
        assert_eq!(keys, vec!["name", "email", "phone"]);
        assert_eq!(lead.flow, "classic");
        assert!(rx.try_recv().is_err());

        let last = c.state().transcript.entries().last().unwrap();
        assert_eq!(last.speaker, Speaker::User);
        assert_eq!(last.text, FORM_SUMMARY);

        // The terminal step takes no more submissions.
        reveal(&mut c);
        assert!(matches!(
            c.submit_form(FormValues::new()),
            Err(FlowError::InvalidOperation { .. })
        ));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn valid_submission_finishes_even_with_steps_after_form() {
        let catalog = Catalog::new(CatalogDef {
            name: "form-first".into(),
            initial: "welcome".into(),
            success: "done".into(),
            failure: "rejected".into(),
            format_checks: false,
            steps: vec![
                Step::welcome("welcome", "Hi", ChoiceOption::new("Start", "start")),
                Step::form(
                    "contact",
                    "Details",
                    vec![FieldSpec::new("name", InputKind::Text, "Full Name").required()],
                ),
                Step::single_choice("q1", "One more?", vec![ChoiceOption::new("Yes", "yes")]),
                Step::success("done", "Thanks"),
                Step::failure("rejected", "Sorry"),
            ],
        })
        .unwrap();
        let (submitter, mut rx) = ChannelSubmitter::new();
        let mut c = FlowController::new(Arc::new(catalog), Arc::new(submitter));
        c.start();
        answer(&mut c, "start");
        reveal(&mut c);

        let t = c.submit_form(form(&[("name", "A".into())])).unwrap();
        assert!(t.is_valid());
        assert_eq!(c.state().current.as_str(), "done");
        assert_eq!(c.snapshot().outcome, Some(Outcome::Qualified));
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn omit_policy_keeps_form_out_of_transcript() {
        let (c, _rx) = at_classic_form();
        let mut c = c.with_form_transcript(FormTranscript::Omit);
        let before = c.state().transcript.len();
        c.submit_form(form(&[
            ("name", "A".into()),
            ("email", "a@b.com".into()),
            ("phone", "5551234567".into()),
        ]))
        .unwrap();
        assert_eq!(c.state().transcript.len(), before);
    }

    #[test]
    fn unknown_form_field_is_rejected() {
        let (mut c, _rx) = at_classic_form();
        assert!(matches!(
            c.submit_form(form(&[("ssn", "123".into())])),
            Err(FlowError::UnknownField { .. })
        ));
        assert!(matches!(
            c.update_field("ssn", "123".into()),
            Err(FlowError::UnknownField { .. })
        ));
    }

    #[test]
    fn lawyer_review_consent_checkbox_required() {
        let (mut c, mut rx) = controller(Variant::LawyerReview);
        c.start();
        for value in ["start", "yes", "2005-2015", "diagnosed", "no-lawyer", "continue"] {
            answer(&mut c, value);
        }
        reveal(&mut c);
        assert_eq!(c.state().current.as_str(), "contact");

        let mut values = form(&[
            ("name", "A".into()),
            ("phone", "555-123-4567".into()),
            ("email", "a@b.com".into()),
            ("zip", "10001".into()),
            ("agree", false.into()),
        ]);
        let result = c.submit_form(values.clone()).unwrap();
        assert_eq!(result.issue().unwrap().field, "agree");
        assert_eq!(
            c.snapshot().validation_message.unwrap(),
            "Please check \"I agree to be contacted and provide my consent for audio/video \
             verification if needed\""
        );

        values.insert("agree".into(), true.into());
        assert!(c.submit_form(values).unwrap().is_valid());
        assert_eq!(rx.try_recv().unwrap().fields.len(), 5);
    }

    #[test]
    fn transcript_alternates_prompts_and_labels() {
        let (mut c, _rx) = controller(Variant::LawyerReview);
        c.start();
        answer(&mut c, "start");
        answer(&mut c, "yes");
        reveal(&mut c);

        let texts: Vec<(Speaker, &str)> = c
            .state()
            .transcript
            .entries()
            .iter()
            .map(|e| (e.speaker, e.text.as_str()))
            .collect();
        assert_eq!(texts.len(), 5);
        assert_eq!(texts[1], (Speaker::User, "Start Assessment"));
        assert_eq!(texts[3], (Speaker::User, "Yes"));
        assert_eq!(texts[4].0, Speaker::System);
    }

    #[test]
    fn multi_choice_selection_in_option_order() {
        let (mut c, _rx) = controller(Variant::Screening);
        c.start();
        answer(&mut c, "start");
        answer(&mut c, "yes");
        answer(&mut c, "post-2015");
        reveal(&mut c);

        assert!(matches!(
            c.choose_many(&[]),
            Err(FlowError::EmptySelection(_))
        ));
        assert!(matches!(
            c.choose_many(&["cancer".to_string()]),
            Err(FlowError::UnknownOption { .. })
        ));

        let t = c
            .choose_many(&[
                "mesothelioma".to_string(),
                "lung-disease".to_string(),
                "mesothelioma".to_string(),
            ])
            .unwrap();
        assert_eq!(t.target().as_str(), "lawyer");
        assert_eq!(
            c.state().responses.get("diagnosis"),
            Some(&ResponseValue::Selection(vec![
                "lung-disease".into(),
                "mesothelioma".into()
            ]))
        );
        assert_eq!(
            c.state().transcript.entries().last().unwrap().text,
            "Lung Disease, Mesothelioma"
        );
    }

    #[test]
    fn choose_on_multi_choice_confirms_single_selection() {
        let (mut c, _rx) = controller(Variant::Screening);
        c.start();
        for value in ["start", "yes", "post-2015", "asbestosis"] {
            answer(&mut c, value);
        }
        assert_eq!(
            c.state().responses.get("diagnosis"),
            Some(&ResponseValue::Selection(vec!["asbestosis".into()]))
        );
    }

    #[test]
    fn choose_many_on_single_choice_is_invalid() {
        let (mut c, _rx) = controller(Variant::Screening);
        c.start();
        answer(&mut c, "start");
        reveal(&mut c);
        assert!(matches!(
            c.choose_many(&["yes".to_string()]),
            Err(FlowError::InvalidOperation { .. })
        ));
    }

    #[test]
    fn progress_tracks_question_steps() {
        let (mut c, _rx) = controller(Variant::Classic);
        c.start();
        assert!(c.snapshot().progress.is_none());
        answer(&mut c, "start");
        assert_eq!(c.snapshot().progress, Some(Progress { current: 1, total: 4 }));
        answer(&mut c, "yes");
        assert_eq!(c.snapshot().progress, Some(Progress { current: 2, total: 4 }));
    }

    #[test]
    fn snapshot_serializes_for_rendering() {
        let (mut c, _rx) = controller(Variant::Classic);
        c.start();
        let json = serde_json::to_value(c.snapshot()).unwrap();
        assert_eq!(json["flow"], "classic");
        assert_eq!(json["step"]["id"], "welcome");
        assert_eq!(json["step"]["kind"], "welcome");
        assert_eq!(json["awaiting_display"], true);
        assert!(json.get("validation_error").is_none());
    }
}
