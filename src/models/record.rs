use chrono::{ DateTime, Utc };
use serde::{ Deserialize, Serialize };

use crate::models::claim::EvaluatedClaim;
use crate::models::sample::Sample;

/// Per-sample output of the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub image: String,
    pub prompt: String,
    pub initial_response: String,

    /// Annotation block as first produced, kept only when a double check rewrote it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_annotations: Option<String>,

    /// Final combined annotation block fed to the correction stage
    #[serde(rename = "qwen_annotations")]
    pub annotations: String,

    pub evaluated_claims: Vec<EvaluatedClaim>,
    pub refined_response: String,
}

impl ResultRecord {
    pub fn hallucination_count(&self) -> usize {
        self.evaluated_claims
            .iter()
            .filter(|c| c.is_hallucination())
            .count()
    }
}

/// Marker for a sample whose processing was abandoned
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedSample {
    /// Position of the sample in the input dataset
    pub index: usize,
    pub image: String,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

impl FailedSample {
    pub fn new(index: usize, sample: &Sample, error: impl ToString) -> Self {
        Self {
            index,
            image: sample.image.clone(),
            error: error.to_string(),
            failed_at: Utc::now(),
        }
    }
}
