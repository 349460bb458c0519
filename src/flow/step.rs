//! Step definitions: the static data a questionnaire is built from.

use serde::{Deserialize, Serialize};

/// Symbolic, catalog-unique step identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(String);

impl StepId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StepId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// What a step renders and which inputs it accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Opening step with a single "start" control.
    Welcome,
    /// Question answered with exactly one option.
    SingleChoice,
    /// Question answered with one or more options, then confirmed.
    MultiChoice,
    /// Interstitial notice acknowledged with a single control.
    Message,
    /// Contact details form.
    Form,
    /// Qualified; the flow ends here.
    TerminalSuccess,
    /// Disqualified; the flow ends here.
    TerminalFailure,
}

impl StepKind {
    /// Whether the flow stops at this step until restarted.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::TerminalSuccess | Self::TerminalFailure)
    }

    /// Whether `choose` is a valid input on this step.
    pub fn accepts_choice(&self) -> bool {
        matches!(
            self,
            Self::Welcome | Self::SingleChoice | Self::MultiChoice | Self::Message
        )
    }

    /// Whether the step is a qualification question (counts toward progress
    /// and stores its answer in the response store).
    pub fn is_question(&self) -> bool {
        matches!(self, Self::SingleChoice | Self::MultiChoice)
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Welcome => "welcome",
            Self::SingleChoice => "single_choice",
            Self::MultiChoice => "multi_choice",
            Self::Message => "message",
            Self::Form => "form",
            Self::TerminalSuccess => "terminal_success",
            Self::TerminalFailure => "terminal_failure",
        };
        write!(f, "{s}")
    }
}

/// One selectable control on a choice step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub label: String,
    pub value: String,
}

impl ChoiceOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// HTML-style input kind of a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Text,
    Email,
    Tel,
    Checkbox,
}

/// A single field on a form step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub input: InputKind,
    pub label: String,
    #[serde(default)]
    pub required: bool,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, input: InputKind, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input,
            label: label.into(),
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// The answer a step was given, as seen by branch predicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// A single option value (welcome, message and single-choice steps).
    Choice(String),
    /// Selected option values of a multi-choice step, in option order.
    Selection(Vec<String>),
    /// A validated form submission.
    Form,
}

/// Condition half of a branch rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Answer is exactly this value (a selection of exactly this one value).
    Equals(String),
    /// Answer is any of these values (a selection contains any of them).
    OneOf(Vec<String>),
    /// Selection includes this value.
    Contains(String),
    /// Matches every answer.
    Any,
}

impl Predicate {
    pub fn matches(&self, answer: &Answer) -> bool {
        match (self, answer) {
            (Self::Any, _) => true,
            (_, Answer::Form) => false,
            (Self::Equals(v), Answer::Choice(c)) => c == v,
            (Self::Equals(v), Answer::Selection(s)) => s.len() == 1 && &s[0] == v,
            (Self::OneOf(vs), Answer::Choice(c)) => vs.contains(c),
            (Self::OneOf(vs), Answer::Selection(s)) => s.iter().any(|v| vs.contains(v)),
            (Self::Contains(v), Answer::Choice(c)) => c == v,
            (Self::Contains(v), Answer::Selection(s)) => s.contains(v),
        }
    }
}

/// Overrides the default linear progression when its predicate matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRule {
    pub when: Predicate,
    pub target: StepId,
}

/// One addressable node in the questionnaire graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    pub kind: StepKind,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ChoiceOption>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<BranchRule>,
}

impl Step {
    fn bare(id: &str, kind: StepKind, prompt: &str) -> Self {
        Self {
            id: StepId::from(id),
            kind,
            prompt: prompt.to_string(),
            options: Vec::new(),
            fields: Vec::new(),
            branches: Vec::new(),
        }
    }

    pub fn welcome(id: &str, prompt: &str, control: ChoiceOption) -> Self {
        Self {
            options: vec![control],
            ..Self::bare(id, StepKind::Welcome, prompt)
        }
    }

    pub fn message(id: &str, prompt: &str, control: ChoiceOption) -> Self {
        Self {
            options: vec![control],
            ..Self::bare(id, StepKind::Message, prompt)
        }
    }

    pub fn single_choice(id: &str, prompt: &str, options: Vec<ChoiceOption>) -> Self {
        Self {
            options,
            ..Self::bare(id, StepKind::SingleChoice, prompt)
        }
    }

    pub fn multi_choice(id: &str, prompt: &str, options: Vec<ChoiceOption>) -> Self {
        Self {
            options,
            ..Self::bare(id, StepKind::MultiChoice, prompt)
        }
    }

    pub fn form(id: &str, prompt: &str, fields: Vec<FieldSpec>) -> Self {
        Self {
            fields,
            ..Self::bare(id, StepKind::Form, prompt)
        }
    }

    pub fn success(id: &str, prompt: &str) -> Self {
        Self::bare(id, StepKind::TerminalSuccess, prompt)
    }

    pub fn failure(id: &str, prompt: &str) -> Self {
        Self::bare(id, StepKind::TerminalFailure, prompt)
    }

    /// Append a branch rule. Rules are evaluated in the order they are added.
    pub fn branch(mut self, when: Predicate, target: &str) -> Self {
        self.branches.push(BranchRule {
            when,
            target: StepId::from(target),
        });
        self
    }

    pub fn option(&self, value: &str) -> Option<&ChoiceOption> {
        self.options.iter().find(|o| o.value == value)
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_classification() {
        use StepKind::*;
        for kind in [Welcome, SingleChoice, MultiChoice, Message] {
            assert!(kind.accepts_choice(), "{kind} should accept choose");
            assert!(!kind.is_terminal());
        }
        assert!(!Form.accepts_choice());
        assert!(TerminalSuccess.is_terminal());
        assert!(TerminalFailure.is_terminal());
        assert!(!TerminalFailure.accepts_choice());
        assert!(SingleChoice.is_question());
        assert!(MultiChoice.is_question());
        assert!(!Message.is_question());
        assert!(!Welcome.is_question());
    }

    #[test]
    fn kind_display_matches_serde() {
        use StepKind::*;
        for kind in [
            Welcome,
            SingleChoice,
            MultiChoice,
            Message,
            Form,
            TerminalSuccess,
            TerminalFailure,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(format!("\"{kind}\""), json);
        }
    }

    #[test]
    fn equals_predicate() {
        let p = Predicate::Equals("no".into());
        assert!(p.matches(&Answer::Choice("no".into())));
        assert!(!p.matches(&Answer::Choice("yes".into())));
        assert!(p.matches(&Answer::Selection(vec!["no".into()])));
        assert!(!p.matches(&Answer::Selection(vec!["no".into(), "yes".into()])));
        assert!(!p.matches(&Answer::Form));
    }

    #[test]
    fn one_of_and_contains_predicates() {
        let one_of = Predicate::OneOf(vec!["a".into(), "b".into()]);
        assert!(one_of.matches(&Answer::Choice("b".into())));
        assert!(!one_of.matches(&Answer::Choice("c".into())));
        assert!(one_of.matches(&Answer::Selection(vec!["c".into(), "a".into()])));

        let contains = Predicate::Contains("meso".into());
        assert!(contains.matches(&Answer::Selection(vec!["lung".into(), "meso".into()])));
        assert!(!contains.matches(&Answer::Selection(vec!["lung".into()])));
    }

    #[test]
    fn any_matches_forms() {
        assert!(Predicate::Any.matches(&Answer::Form));
        assert!(Predicate::Any.matches(&Answer::Choice("x".into())));
    }

    #[test]
    fn predicate_json_shape() {
        let rule: BranchRule =
            serde_json::from_str(r#"{"when": {"equals": "no"}, "target": "rejected"}"#).unwrap();
        assert_eq!(rule.when, Predicate::Equals("no".into()));
        assert_eq!(rule.target, StepId::from("rejected"));

        let any: Predicate = serde_json::from_str(r#""any""#).unwrap();
        assert_eq!(any, Predicate::Any);
    }

    #[test]
    fn builder_keeps_branch_order() {
        let step = Step::single_choice(
            "lawyer",
            "Are you working with a lawyer?",
            vec![ChoiceOption::new("Yes", "yes"), ChoiceOption::new("No", "no")],
        )
        .branch(Predicate::Equals("yes".into()), "rejected")
        .branch(Predicate::Any, "contact");

        assert_eq!(step.branches.len(), 2);
        assert_eq!(step.branches[0].target.as_str(), "rejected");
        assert_eq!(step.option("no").map(|o| o.label.as_str()), Some("No"));
        assert!(step.option("maybe").is_none());
    }
}
