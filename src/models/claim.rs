use std::fmt;

use serde::{ Deserialize, Serialize };

/// An atomic factual statement extracted from a description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub text: String,
}

impl Claim {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl fmt::Display for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Verdict category assigned to a claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvaluationLabel {
    #[serde(rename = "non-hallucination")]
    NonHallucination,
    #[serde(rename = "hallucination")]
    Hallucination,
    #[serde(rename = "subjective")]
    Subjective,
    /// No label could be recovered from the model reply
    #[serde(rename = "Not Found")]
    NotFound,
}

impl EvaluationLabel {
    /// Labels a model may emit, in the order they are described in prompts
    pub const VERDICTS: [EvaluationLabel; 3] = [
        EvaluationLabel::NonHallucination,
        EvaluationLabel::Hallucination,
        EvaluationLabel::Subjective,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationLabel::NonHallucination => "non-hallucination",
            EvaluationLabel::Hallucination => "hallucination",
            EvaluationLabel::Subjective => "subjective",
            EvaluationLabel::NotFound => "Not Found",
        }
    }

    /// Map a keyword matched in model output onto the closed label set
    pub fn from_keyword(keyword: &str) -> Self {
        let normalized: String = keyword
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect();

        match normalized.as_str() {
            "nonhallucination" | "nothallucination" | "notahallucination" | "notanhallucination" =>
                EvaluationLabel::NonHallucination,
            "hallucination" => EvaluationLabel::Hallucination,
            "subjective" => EvaluationLabel::Subjective,
            _ => EvaluationLabel::NotFound,
        }
    }

    pub fn is_found(&self) -> bool {
        *self != EvaluationLabel::NotFound
    }
}

impl fmt::Display for EvaluationLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Verdict attached to a single claim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub label: EvaluationLabel,
    pub reason: String,
}

impl Evaluation {
    pub fn new(label: EvaluationLabel, reason: impl Into<String>) -> Self {
        Self { label, reason: reason.into() }
    }

    /// Placeholder recorded when a reply could not be parsed
    pub fn not_found() -> Self {
        Self { label: EvaluationLabel::NotFound, reason: String::new() }
    }
}

/// Claim paired with its evaluation; the unit persisted in the dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluatedClaim {
    pub claim: String,
    pub evaluation: EvaluationLabel,
    pub reason: String,
}

impl EvaluatedClaim {
    pub fn new(claim: &Claim, evaluation: Evaluation) -> Self {
        Self {
            claim: claim.text.clone(),
            evaluation: evaluation.label,
            reason: evaluation.reason,
        }
    }

    pub fn is_hallucination(&self) -> bool {
        self.evaluation == EvaluationLabel::Hallucination
    }
}
