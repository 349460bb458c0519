//! Built-in questionnaire variants.
//!
//! Each deployment of the chat widget differs only in copy and branch
//! wording, so each is expressed as a catalog rather than as engine code.

use serde::{Deserialize, Serialize};

use super::catalog::{Catalog, CatalogDef};
use super::step::{ChoiceOption, FieldSpec, InputKind, Predicate, Step};
use crate::error::{CatalogError, ConfigError};

const WELCOME: &str = "Welcome! We'll help determine if you qualify for our program. \
This will only take a few moments. All information is confidential.";
const EXPOSURE: &str = "Were you exposed to the substance between 1990-2010?";
const TIMING: &str = "When did the exposure occur?";
const DIAGNOSIS: &str = "Have you received a medical diagnosis related to this exposure?";
const THANK_YOU: &str = "Thank you for your information! We will be in touch soon.";

/// Names a built-in catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    /// Four questions, then the contact form.
    Classic,
    /// Adds the diagnosis re-ask loop, a qualified notice and a consent box.
    LawyerReview,
    /// Multi-choice diagnosis question.
    Screening,
}

impl Variant {
    pub const ALL: [Variant; 3] = [Self::Classic, Self::LawyerReview, Self::Screening];

    /// Build and validate this variant's catalog.
    pub fn catalog(self) -> Result<Catalog, CatalogError> {
        let def = match self {
            Self::Classic => classic(),
            Self::LawyerReview => lawyer_review(),
            Self::Screening => screening(),
        };
        Catalog::new(def)
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Classic => write!(f, "classic"),
            Self::LawyerReview => write!(f, "lawyer-review"),
            Self::Screening => write!(f, "screening"),
        }
    }
}

impl std::str::FromStr for Variant {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "classic" => Ok(Self::Classic),
            "lawyer-review" => Ok(Self::LawyerReview),
            "screening" => Ok(Self::Screening),
            _ => Err(ConfigError::UnknownVariant(s.to_string())),
        }
    }
}

fn opt(label: &str, value: &str) -> ChoiceOption {
    ChoiceOption::new(label, value)
}

fn yes_no() -> Vec<ChoiceOption> {
    vec![opt("Yes", "yes"), opt("No", "no")]
}

fn timing_options() -> Vec<ChoiceOption> {
    vec![
        opt("Before 2005", "pre-2005"),
        opt("2005-2015", "2005-2015"),
        opt("After 2015", "post-2015"),
    ]
}

fn contact_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new("name", InputKind::Text, "Full Name").required(),
        FieldSpec::new("email", InputKind::Email, "Email Address").required(),
        FieldSpec::new("phone", InputKind::Tel, "Phone Number").required(),
    ]
}

fn classic() -> CatalogDef {
    CatalogDef {
        name: Variant::Classic.to_string(),
        initial: "welcome".into(),
        success: "submitted".into(),
        failure: "not-eligible".into(),
        format_checks: true,
        steps: vec![
            Step::welcome("welcome", WELCOME, opt("Start Assessment", "start")),
            Step::single_choice("exposure", EXPOSURE, yes_no())
                .branch(Predicate::Equals("no".into()), "not-eligible"),
            Step::single_choice("timing", TIMING, timing_options()),
            Step::single_choice(
                "diagnosis",
                DIAGNOSIS,
                vec![
                    opt("Yes, I have a diagnosis", "diagnosed"),
                    opt("No official diagnosis", "undiagnosed"),
                    opt("I suspect but not confirmed", "suspected"),
                ],
            ),
            Step::single_choice("lawyer", "Are you currently working with a lawyer?", yes_no())
                .branch(Predicate::Equals("yes".into()), "not-eligible"),
            Step::form(
                "contact",
                "Based on your answers, you may qualify for compensation! Please provide your \
                 contact information and we'll follow up with more details.",
                contact_fields(),
            ),
            Step::success("submitted", THANK_YOU),
            Step::failure(
                "not-eligible",
                "Based on your answers, it doesn't appear you qualify at this time. If your \
                 situation changes, please check back with us. Thank you for your time.",
            ),
        ],
    }
}

fn lawyer_review() -> CatalogDef {
    CatalogDef {
        name: Variant::LawyerReview.to_string(),
        initial: "welcome".into(),
        success: "submitted".into(),
        failure: "not-eligible".into(),
        format_checks: true,
        steps: vec![
            Step::welcome("welcome", WELCOME, opt("Start Assessment", "start")),
            Step::single_choice("exposure", EXPOSURE, yes_no())
                .branch(Predicate::Equals("no".into()), "not-eligible"),
            Step::single_choice("timing", TIMING, timing_options()),
            Step::single_choice(
                "diagnosis",
                DIAGNOSIS,
                vec![
                    opt("Yes, I have a diagnosis", "diagnosed"),
                    opt("No official diagnosis", "undiagnosed"),
                    opt("I suspect but not confirmed", "suspected"),
                ],
            )
            .branch(Predicate::Equals("undiagnosed".into()), "welcome"),
            Step::single_choice(
                "lawyer",
                "Have you already hired a lawyer for this case?",
                vec![opt("Yes", "already-lawyer"), opt("No", "no-lawyer")],
            )
            .branch(Predicate::Equals("already-lawyer".into()), "not-eligible")
            .branch(Predicate::Equals("no-lawyer".into()), "qualified"),
            Step::message(
                "qualified",
                "Based on your answers, you may qualify! Let's get your contact details so our \
                 legal team can review your case.",
                opt("Continue", "continue"),
            ),
            Step::form(
                "contact",
                "Please provide your contact information:",
                vec![
                    FieldSpec::new("name", InputKind::Text, "Full Name").required(),
                    FieldSpec::new("phone", InputKind::Tel, "Phone Number").required(),
                    FieldSpec::new("email", InputKind::Email, "Email Address").required(),
                    FieldSpec::new("zip", InputKind::Text, "Zip Code").required(),
                    FieldSpec::new(
                        "agree",
                        InputKind::Checkbox,
                        "I agree to be contacted and provide my consent for audio/video \
                         verification if needed",
                    )
                    .required(),
                ],
            ),
            Step::success("submitted", THANK_YOU),
            Step::failure(
                "not-eligible",
                "It looks like you may already be represented, so we cannot proceed.",
            ),
        ],
    }
}

fn screening() -> CatalogDef {
    CatalogDef {
        name: Variant::Screening.to_string(),
        initial: "welcome".into(),
        success: "submitted".into(),
        failure: "not-eligible".into(),
        format_checks: false,
        steps: vec![
            Step::welcome(
                "welcome",
                "Hi there! Before we begin, please read this disclaimer.",
                opt("Start", "start"),
            ),
            Step::single_choice("exposure", "Were you exposed?", yes_no())
                .branch(Predicate::Equals("no".into()), "not-eligible"),
            Step::single_choice("timing", "When did this happen?", timing_options()),
            Step::multi_choice(
                "diagnosis",
                "Have you been diagnosed with any of the following?",
                vec![
                    opt("Lung Disease", "lung-disease"),
                    opt("Asbestosis", "asbestosis"),
                    opt("Mesothelioma", "mesothelioma"),
                    opt("Other", "other"),
                ],
            ),
            Step::single_choice("lawyer", "Are you currently working with a lawyer?", yes_no())
                .branch(Predicate::Equals("yes".into()), "not-eligible"),
            Step::form("contact", "Please provide your contact information:", contact_fields()),
            Step::success("submitted", THANK_YOU),
            Step::failure(
                "not-eligible",
                "Based on your answers, it doesn't appear you qualify at this time.",
            ),
        ],
    }
}
