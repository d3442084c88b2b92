use anyhow::{ anyhow, Result };
use std::path::PathBuf;

use hal_annotator::implementations::dataset::{ failures_path, load_samples };
use hal_annotator::{
    annotate_dataset,
    ChatGateway,
    GatewayConfig,
    HallucinationAnnotator,
    PipelineOptions,
    PromptBuilder,
    RunOptions,
    SampleOutcome,
    VerificationMode,
};

use crate::cli::ui;

/// Arguments of the annotate command
pub struct AnnotateArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    pub image_root: Option<PathBuf>,
    pub verification_mode: String,
    pub double_check: bool,
    pub no_subjective: bool,
    pub limit: Option<usize>,
    pub checkpoint_every: Option<usize>,
    pub fail_fast: bool,
    pub force: bool,
}

/// Run the whole pipeline over an input dataset and write the output dataset
pub async fn execute(config: GatewayConfig, args: AnnotateArgs) -> Result<()> {
    ui::print_header("Hallucination Annotation");

    let verification_mode: VerificationMode = args.verification_mode
        .parse()
        .map_err(|e: String| anyhow!(e))?;

    if args.output.exists() && !args.force {
        let prompt = format!("{} already exists. Overwrite it?", args.output.display());
        if !ui::confirm_action(&prompt)? {
            ui::print_info("Aborted; nothing was written.");
            return Ok(());
        }
    }

    let samples = load_samples(&args.input)?;
    ui::print_info(&format!("Loaded {} samples from {}", samples.len(), args.input.display()));

    let options = PipelineOptions {
        verification_mode,
        double_check: args.double_check,
        allow_subjective: !args.no_subjective,
    };
    ui::print_result("Verification mode", &options.verification_mode.to_string());
    ui::print_result("Double check", if options.double_check { "on" } else { "off" });

    let prompts = PromptBuilder::with_overrides(&config.prompt_templates, options.allow_subjective)?;
    ui::print_result("Prompt templates", &prompts.template_version());
    let gateway = ChatGateway::new(config)?;
    let annotator = HallucinationAnnotator::with_prompts(gateway, prompts, options).with_image_root(
        args.image_root
    );

    let run_options = RunOptions {
        limit: args.limit,
        checkpoint_every: args.checkpoint_every,
        fail_fast: args.fail_fast,
    };

    let total = run_options.limit.map_or(samples.len(), |limit| limit.min(samples.len()));
    let progress = ui::create_progress_bar(total as u64, "annotating");

    let result = annotate_dataset(&annotator, &samples, &run_options, &args.output, |_, outcome| {
        match outcome {
            SampleOutcome::Completed(record) => {
                progress.set_message(record.image.clone());
            }
            SampleOutcome::Failed(failure) => {
                progress.println(format!("failed: {} ({})", failure.image, failure.error));
            }
        }
        progress.inc(1);
    }).await;
    progress.finish_and_clear();

    match result {
        Ok((assembler, summary)) => {
            ui::print_run_summary(&summary);
            if !assembler.failures().is_empty() {
                ui::print_warning(
                    &format!("Failure markers written to {}", failures_path(&args.output).display())
                );
            }
            ui::print_success(&format!("Saved dataset to {}", args.output.display()));
            Ok(())
        }
        Err(e) => {
            ui::print_error(&format!("Run stopped: {}", e));
            ui::print_info(
                &format!("Samples completed before the error were saved to {}", args.output.display())
            );
            Err(e.into())
        }
    }
}
