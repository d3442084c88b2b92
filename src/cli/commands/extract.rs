use anyhow::Result;

use hal_annotator::implementations::response_parser::format_facts;
use hal_annotator::traits::ClaimAnnotator;
use hal_annotator::{ ChatGateway, GatewayConfig, HallucinationAnnotator, PipelineOptions, PromptBuilder };

use crate::cli::ui;

/// Split a description into atomic claims and print them
pub async fn execute(config: GatewayConfig, description: &str) -> Result<()> {
    ui::print_header("Claim Extraction");
    ui::print_text(description);

    let options = PipelineOptions::default();
    let prompts = PromptBuilder::with_overrides(&config.prompt_templates, options.allow_subjective)?;
    let annotator = HallucinationAnnotator::with_prompts(ChatGateway::new(config)?, prompts, options);

    let spinner = ui::spinner_with_message("Extracting claims...");
    let claims = annotator.extract_claims(description).await?;
    spinner.finish_and_clear();

    if claims.is_empty() {
        ui::print_warning("The model returned no claims.");
        return Ok(());
    }

    let facts: Vec<String> = claims.into_iter().map(|claim| claim.text).collect();
    ui::print_success(&format!("Extracted {} claims", facts.len()));
    println!("{}", format_facts(&facts));
    Ok(())
}
