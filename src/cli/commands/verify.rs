use anyhow::Result;

use hal_annotator::traits::ClaimAnnotator;
use hal_annotator::{
    ChatGateway,
    Claim,
    EvaluatedClaim,
    GatewayConfig,
    HallucinationAnnotator,
    ImageRef,
    PipelineOptions,
    PromptBuilder,
};

use crate::cli::ui;

/// Verify one claim against one image and print the verdict
pub async fn execute(config: GatewayConfig, image: &str, claim: &str, no_subjective: bool) -> Result<()> {
    ui::print_header("Claim Verification");
    ui::print_result("Image", image);

    let options = PipelineOptions { allow_subjective: !no_subjective, ..PipelineOptions::default() };
    let prompts = PromptBuilder::with_overrides(&config.prompt_templates, options.allow_subjective)?;
    let annotator = HallucinationAnnotator::with_prompts(ChatGateway::new(config)?, prompts, options);

    let claims = vec![Claim::new(claim)];
    let spinner = ui::spinner_with_message("Verifying claim...");
    let outcome = annotator.verify_claims(&ImageRef::new(image), &claims).await?;
    spinner.finish_and_clear();

    let evaluated: Vec<EvaluatedClaim> = claims
        .iter()
        .zip(outcome.evaluations)
        .map(|(claim, evaluation)| EvaluatedClaim::new(claim, evaluation))
        .collect();
    ui::print_evaluated_claims(&evaluated);
    Ok(())
}
