use std::path::PathBuf;

use async_trait::async_trait;
use log::{ debug, info, warn };

use crate::config::PipelineOptions;
use crate::errors::{ AnnotatorError, AnnotatorResult };
use crate::implementations::prompt_builder::{ render_annotation_block, PromptBuilder };
use crate::implementations::response_parser::{ parse_annotation_block, parse_evaluation, parse_facts };
use crate::models::claim::{ Claim, EvaluatedClaim, Evaluation };
use crate::models::common::{ ImageRef, VerificationMode };
use crate::models::record::ResultRecord;
use crate::models::sample::Sample;
use crate::traits::claim_annotator::{ ClaimAnnotator, VerificationOutcome };
use crate::traits::model_gateway::ModelGateway;

/// Runs the extract, verify, correct pipeline against an injected model gateway.
///
/// The gateway is built once by the caller and reused for every sample. Samples
/// share no state, so one annotator can process a whole dataset.
///
/// # Usage Example
/// ```rust,no_run
/// use hal_annotator::{
///     ChatGateway, GatewayConfig, HallucinationAnnotator, PipelineOptions, Sample,
///     traits::ClaimAnnotator,
/// };
///
/// async fn annotate_one() -> Result<(), Box<dyn std::error::Error>> {
///     let gateway = ChatGateway::new(GatewayConfig::default())?;
///     let annotator = HallucinationAnnotator::new(gateway, PipelineOptions::default());
///
///     let sample = Sample::new("cat.jpg", "Describe the image.", "Two cats sleep on a red couch.");
///     let record = annotator.annotate_sample(&sample).await?;
///
///     println!("{}", record.refined_response);
///     Ok(())
/// }
/// ```
pub struct HallucinationAnnotator<G: ModelGateway> {
    gateway: G,
    prompts: PromptBuilder,
    options: PipelineOptions,
    image_root: Option<PathBuf>,
}

impl<G: ModelGateway> HallucinationAnnotator<G> {
    /// Annotator using the bundled prompt templates
    pub fn new(gateway: G, options: PipelineOptions) -> Self {
        let prompts = PromptBuilder::new(options.allow_subjective);
        Self { gateway, prompts, options, image_root: None }
    }

    /// Annotator using a custom prompt builder
    pub fn with_prompts(gateway: G, prompts: PromptBuilder, options: PipelineOptions) -> Self {
        Self { gateway, prompts, options, image_root: None }
    }

    /// Resolve relative dataset image names against `root`
    pub fn with_image_root(mut self, root: Option<PathBuf>) -> Self {
        self.image_root = root;
        self
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn image_for(&self, sample: &Sample) -> ImageRef {
        ImageRef::resolve(&sample.image, self.image_root.as_deref())
    }

    /// One prompt per claim, sent as a single batch
    async fn verify_per_claim(
        &self,
        image: &ImageRef,
        claims: &[Claim]
    ) -> AnnotatorResult<(Vec<Evaluation>, String)> {
        let prompts: Vec<String> = claims
            .iter()
            .map(|claim| self.prompts.build_verification_prompt(claim))
            .collect();
        let images = vec![image.clone(); claims.len()];

        let responses = self.gateway.respond_batch(&images, &prompts).await?;
        if responses.len() != prompts.len() {
            return Err(AnnotatorError::BatchMismatch {
                expected: prompts.len(),
                actual: responses.len(),
            });
        }

        let evaluations: Vec<Evaluation> = responses
            .iter()
            .map(|response| {
                let mut evaluation = parse_evaluation(response);
                // Keep an unreadable reply so correction and the dataset still see it
                if !evaluation.label.is_found() && evaluation.reason.is_empty() {
                    evaluation.reason = response.trim().to_string();
                }
                evaluation
            })
            .collect();
        let block = render_annotation_block(&pair_claims(claims, &evaluations));

        Ok((evaluations, block))
    }

    /// Every claim in one prompt
    async fn verify_combined(
        &self,
        image: &ImageRef,
        claims: &[Claim]
    ) -> AnnotatorResult<(Vec<Evaluation>, String)> {
        let prompt = self.prompts.build_batch_verification_prompt(claims);
        let response = self.gateway.respond(image, &prompt).await?;
        let evaluations = parse_annotation_block(&response, claims.len());

        Ok((evaluations, response.trim().to_string()))
    }
}

#[async_trait]
impl<G: ModelGateway> ClaimAnnotator for HallucinationAnnotator<G> {
    async fn extract_claims(&self, description: &str) -> AnnotatorResult<Vec<Claim>> {
        let prompt = self.prompts.build_claim_extraction_prompt(description);
        let response = self.gateway.respond_text(&prompt).await?;

        let claims: Vec<Claim> = parse_facts(&response).into_iter().map(Claim::new).collect();
        debug!("Extracted {} claims from a {} character description", claims.len(), description.len());

        Ok(claims)
    }

    async fn verify_claims(
        &self,
        image: &ImageRef,
        claims: &[Claim]
    ) -> AnnotatorResult<VerificationOutcome> {
        if claims.is_empty() {
            debug!("No claims to verify for {}", image);
            return Ok(VerificationOutcome {
                evaluations: Vec::new(),
                annotations: String::new(),
                initial_annotations: None,
            });
        }

        info!("Verifying {} claims ({} mode)", claims.len(), self.options.verification_mode);
        let (evaluations, annotations) = match self.options.verification_mode {
            VerificationMode::PerClaim => self.verify_per_claim(image, claims).await?,
            VerificationMode::Combined => self.verify_combined(image, claims).await?,
        };

        if !self.options.double_check {
            return Ok(VerificationOutcome { evaluations, annotations, initial_annotations: None });
        }

        debug!("Double-checking annotation block of {} characters", annotations.len());
        let prompt = self.prompts.build_reverification_prompt(&annotations);
        let reviewed = self.gateway.respond(image, &prompt).await?;
        let merged = merge_review(&evaluations, parse_annotation_block(&reviewed, claims.len()));

        let changed = evaluations
            .iter()
            .zip(&merged)
            .filter(|(before, after)| before.label != after.label)
            .count();
        if changed > 0 {
            info!("Double check changed {} of {} verdicts", changed, claims.len());
        }

        Ok(VerificationOutcome {
            annotations: render_annotation_block(&pair_claims(claims, &merged)),
            evaluations: merged,
            initial_annotations: Some(annotations),
        })
    }

    async fn correct_description(
        &self,
        image: &ImageRef,
        description: &str,
        annotations: &str
    ) -> AnnotatorResult<String> {
        let prompt = self.prompts.build_correction_prompt(description, annotations);
        let response = self.gateway.respond(image, &prompt).await?;
        Ok(response.trim().to_string())
    }

    async fn annotate_sample(&self, sample: &Sample) -> AnnotatorResult<ResultRecord> {
        let image = self.image_for(sample);
        info!("Annotating {}", image);

        let claims = self.extract_claims(&sample.initial_response).await?;
        if claims.is_empty() {
            warn!("No claims extracted for {}", sample.image);
        }

        let outcome = self.verify_claims(&image, &claims).await?;
        if outcome.evaluations.len() != claims.len() {
            return Err(AnnotatorError::BatchMismatch {
                expected: claims.len(),
                actual: outcome.evaluations.len(),
            });
        }

        let refined_response = self.correct_description(
            &image,
            &sample.initial_response,
            &outcome.annotations
        ).await?;

        let evaluated_claims = pair_claims(&claims, &outcome.evaluations);
        info!(
            "Finished {}: {} claims, {} hallucinations",
            sample.image,
            evaluated_claims.len(),
            evaluated_claims
                .iter()
                .filter(|c| c.is_hallucination())
                .count()
        );

        Ok(ResultRecord {
            image: sample.image.clone(),
            prompt: sample.prompt.clone(),
            initial_response: sample.initial_response.clone(),
            initial_annotations: outcome.initial_annotations,
            annotations: outcome.annotations,
            evaluated_claims,
            refined_response,
        })
    }
}

/// Reviewed verdicts win; claims the review left unreadable keep their first verdict
fn merge_review(first_pass: &[Evaluation], reviewed: Vec<Evaluation>) -> Vec<Evaluation> {
    let kept = reviewed
        .iter()
        .filter(|e| !e.label.is_found())
        .count();
    if kept > 0 {
        warn!("Double check gave no verdict for {} claims; keeping the first pass for them", kept);
    }

    first_pass
        .iter()
        .zip(reviewed)
        .map(|(before, after)| if after.label.is_found() { after } else { before.clone() })
        .collect()
}

/// Zip claims with their evaluations, position by position
fn pair_claims(claims: &[Claim], evaluations: &[Evaluation]) -> Vec<EvaluatedClaim> {
    claims
        .iter()
        .zip(evaluations.iter().cloned())
        .map(|(claim, evaluation)| EvaluatedClaim::new(claim, evaluation))
        .collect()
}
