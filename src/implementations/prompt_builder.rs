//! Instruction text for every pipeline stage.
//!
//! Few-shot templates ship as resources under `src/prompts/` and are tagged with
//! [`TEMPLATE_VERSION`]; a config file may replace any of them by name. Building a
//! prompt is a pure string transform: the same inputs always give the same text.

use std::collections::HashMap;
use std::sync::OnceLock;

use log::{ debug, info };
use regex::{ Captures, Regex };

use crate::errors::{ AnnotatorError, AnnotatorResult };
use crate::models::claim::{ Claim, EvaluatedClaim, EvaluationLabel };

/// Bumped whenever a bundled template changes wording
pub const TEMPLATE_VERSION: &str = "hal-templates/1";

pub const CLAIM_EXTRACTION: &str = "claim_extraction";
pub const VERIFICATION: &str = "verification";
pub const REVERIFICATION: &str = "reverification";
pub const CORRECTION: &str = "correction";

const BUNDLED_TEMPLATES: [(&str, &str, &[&str]); 4] = [
    (CLAIM_EXTRACTION, include_str!("../prompts/claim_extraction.txt"), &["description"]),
    (VERIFICATION, include_str!("../prompts/verification.txt"), &["statements"]),
    (REVERIFICATION, include_str!("../prompts/reverification.txt"), &["annotations"]),
    (CORRECTION, include_str!("../prompts/correction.txt"), &["initial_description", "annotations"]),
];

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{\{([a-z_]+)\}\}").expect("placeholder pattern is valid"))
}

fn category_definition(label: EvaluationLabel) -> &'static str {
    match label {
        EvaluationLabel::NonHallucination =>
            "The statement is factually correct and fully supported by the image.",
        EvaluationLabel::Hallucination =>
            "The statement contains factual errors or contradicts the visual evidence.",
        EvaluationLabel::Subjective =>
            "The statement expresses personal opinions, interpretations, or subjective descriptions that cannot be objectively verified using the image.",
        EvaluationLabel::NotFound => "",
    }
}

#[derive(Debug, Clone)]
pub struct PromptBuilder {
    templates: HashMap<String, String>,
    overridden: Vec<String>,
    allow_subjective: bool,
}

impl PromptBuilder {
    /// Builder over the bundled templates
    pub fn new(allow_subjective: bool) -> Self {
        let templates = BUNDLED_TEMPLATES
            .iter()
            .map(|(name, body, _)| (name.to_string(), body.to_string()))
            .collect();
        debug!("Using bundled prompt templates {}", TEMPLATE_VERSION);

        Self { templates, overridden: Vec::new(), allow_subjective }
    }

    /// Builder over the bundled templates with some of them replaced.
    ///
    /// Fails on unknown template names and on replacements that drop a
    /// placeholder the stage needs.
    pub fn with_overrides(
        overrides: &HashMap<String, String>,
        allow_subjective: bool
    ) -> AnnotatorResult<Self> {
        let mut builder = Self::new(allow_subjective);

        for (name, body) in overrides {
            let (_, _, required) = BUNDLED_TEMPLATES
                .iter()
                .find(|(known, _, _)| known == name)
                .ok_or_else(|| AnnotatorError::TemplateError(format!("Unknown template: {}", name)))?;

            for placeholder in required.iter() {
                if !body.contains(&format!("{{{{{}}}}}", placeholder)) {
                    return Err(
                        AnnotatorError::TemplateError(
                            format!("Template {} must contain {{{{{}}}}}", name, placeholder)
                        )
                    );
                }
            }

            builder.templates.insert(name.clone(), body.clone());
            builder.overridden.push(name.clone());
        }

        if !builder.overridden.is_empty() {
            builder.overridden.sort();
            info!("Prompt templates {}", builder.template_version());
        }
        Ok(builder)
    }

    /// Bundled template version, plus the names of any replaced templates
    pub fn template_version(&self) -> String {
        if self.overridden.is_empty() {
            TEMPLATE_VERSION.to_string()
        } else {
            format!("{}+{}", TEMPLATE_VERSION, self.overridden.join(","))
        }
    }

    /// Labels offered to the verifier, in prompt order
    pub fn verdicts(&self) -> Vec<EvaluationLabel> {
        EvaluationLabel::VERDICTS
            .into_iter()
            .filter(|label| self.allow_subjective || *label != EvaluationLabel::Subjective)
            .collect()
    }

    /// Prompt asking the text model to split a description into atomic facts
    pub fn build_claim_extraction_prompt(&self, description: &str) -> String {
        let mut prompt = self.render(CLAIM_EXTRACTION, &[("description", description)]);
        if !prompt.ends_with('\n') {
            prompt.push('\n');
        }
        prompt
    }

    /// Prompt asking the vision model to judge one claim
    pub fn build_verification_prompt(&self, claim: &Claim) -> String {
        let statements = render_statement_slots(std::slice::from_ref(claim));
        self.render_verification("the following statement", &statements)
    }

    /// Prompt asking the vision model to judge several claims in one reply
    pub fn build_batch_verification_prompt(&self, claims: &[Claim]) -> String {
        let statements = render_statement_slots(claims);
        self.render_verification("the following statements", &statements)
    }

    /// Prompt asking the vision model to re-review a finished annotation block
    pub fn build_reverification_prompt(&self, annotations: &str) -> String {
        let categories = self.categories();
        let labels = self.label_list();
        self.render(REVERIFICATION, &[
            ("categories", categories.as_str()),
            ("labels", labels.as_str()),
            ("annotations", annotations),
        ])
    }

    /// Prompt asking the vision model to rewrite the description from the annotations
    pub fn build_correction_prompt(&self, initial_description: &str, annotations: &str) -> String {
        let labels = self.label_list();
        self.render(CORRECTION, &[
            ("labels", labels.as_str()),
            ("initial_description", initial_description),
            ("annotations", annotations),
        ])
    }

    fn render_verification(&self, subject: &str, statements: &str) -> String {
        let categories = self.categories();
        self.render(VERIFICATION, &[
            ("subject", subject),
            ("categories", categories.as_str()),
            ("statements", statements),
        ])
    }

    fn categories(&self) -> String {
        self.verdicts()
            .into_iter()
            .map(|label| format!("- **{}**: {}", label, category_definition(label)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn label_list(&self) -> String {
        self.verdicts()
            .iter()
            .map(|label| label.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Single pass over the template; substituted values are never rescanned
    fn render(&self, template_name: &str, params: &[(&str, &str)]) -> String {
        let template = self.templates
            .get(template_name)
            .map(String::as_str)
            .unwrap_or_default();

        placeholder_pattern()
            .replace_all(template, |caps: &Captures| {
                let key = &caps[1];
                params
                    .iter()
                    .find(|(name, _)| *name == key)
                    .map(|(_, value)| value.to_string())
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Empty `[STATEMENT]/[EVALUATION]/[REASON]` slots for the verifier to fill
pub fn render_statement_slots(claims: &[Claim]) -> String {
    claims
        .iter()
        .enumerate()
        .map(|(i, claim)| {
            let n = i + 1;
            format!("[STATEMENT {n}]: {}\n[EVALUATION {n}]: \n[REASON {n}]: \n", claim.text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Combined annotation block in the tagged triplet format
pub fn render_annotation_block(claims: &[EvaluatedClaim]) -> String {
    claims
        .iter()
        .enumerate()
        .map(|(i, claim)| {
            let n = i + 1;
            format!(
                "[STATEMENT {n}]: {}\n[EVALUATION {n}]: {}\n[REASON {n}]: {}",
                claim.claim,
                claim.evaluation,
                claim.reason
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
