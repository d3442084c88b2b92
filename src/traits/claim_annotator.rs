use async_trait::async_trait;

use crate::errors::AnnotatorResult;
use crate::models::claim::{ Claim, Evaluation };
use crate::models::common::ImageRef;
use crate::models::record::ResultRecord;
use crate::models::sample::Sample;

/// Output of the verification stage for one sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationOutcome {
    /// One evaluation per claim, same order as the claims
    pub evaluations: Vec<Evaluation>,

    /// Combined tagged annotation block handed to the correction stage
    pub annotations: String,

    /// Block before the double check rewrote it, if one ran
    pub initial_annotations: Option<String>,
}

/// The extract, verify, correct pipeline for a single sample
#[async_trait]
pub trait ClaimAnnotator {
    /// Break a description into atomic claims
    async fn extract_claims(&self, description: &str) -> AnnotatorResult<Vec<Claim>>;

    /// Check every claim against the image
    async fn verify_claims(
        &self,
        image: &ImageRef,
        claims: &[Claim],
    ) -> AnnotatorResult<VerificationOutcome>;

    /// Rewrite a description so it only keeps what the annotations support
    async fn correct_description(
        &self,
        image: &ImageRef,
        description: &str,
        annotations: &str,
    ) -> AnnotatorResult<String>;

    /// Run every stage for one sample and assemble its record
    async fn annotate_sample(&self, sample: &Sample) -> AnnotatorResult<ResultRecord>;
}
