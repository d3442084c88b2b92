use colored::*;
use console::Term;
use dialoguer::{ theme::ColorfulTheme, Confirm };
use indicatif::{ ProgressBar, ProgressStyle };
use std::time::Duration;
use textwrap::wrap;

use hal_annotator::{ EvaluatedClaim, EvaluationLabel, RunSummary };

/// UI theme for consistent appearance
pub fn get_theme() -> ColorfulTheme {
    ColorfulTheme::default()
}

fn terminal_width() -> usize {
    Term::stdout().size().1 as usize
}

/// Print a section header
pub fn print_header(title: &str) {
    let title = format!(" {} ", title);
    println!("\n{}\n", title.bold().white().on_blue());
}

/// Print text with proper wrapping
pub fn print_text(text: &str) {
    let width = terminal_width().max(40);
    for line in text.lines() {
        for wrapped_line in wrap(line, width.saturating_sub(10)) {
            println!("{}", wrapped_line);
        }
    }
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "ERROR:".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "WARNING:".yellow().bold(), message);
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "SUCCESS:".green().bold(), message);
}

/// Print information
pub fn print_info(message: &str) {
    println!("{} {}", "INFO:".blue().bold(), message);
}

/// Print a formatted result
pub fn print_result(label: &str, value: &str) {
    println!("{}: {}", label.bold(), value);
}

/// Create a new progress bar
pub fn create_progress_bar(length: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(length);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}"
    ) {
        pb.set_style(style.progress_chars("##-"));
    }
    pb.set_message(message.to_string());
    pb
}

/// Spinner for a single long model call
pub fn spinner_with_message(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Ask for confirmation
pub fn confirm_action(prompt: &str) -> std::io::Result<bool> {
    Confirm::with_theme(&get_theme())
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
}

/// Colored verdict label
pub fn label_text(label: EvaluationLabel) -> ColoredString {
    match label {
        EvaluationLabel::NonHallucination => label.as_str().green().bold(),
        EvaluationLabel::Hallucination => label.as_str().red().bold(),
        EvaluationLabel::Subjective => label.as_str().yellow().bold(),
        EvaluationLabel::NotFound => label.as_str().dimmed(),
    }
}

/// Print claims with their verdicts and reasons
pub fn print_evaluated_claims(claims: &[EvaluatedClaim]) {
    if claims.is_empty() {
        print_info("No claims were extracted.");
        return;
    }

    for (i, claim) in claims.iter().enumerate() {
        println!("{:>3}. {}", i + 1, claim.claim);
        println!("     {} {}", "Evaluation:".bold(), label_text(claim.evaluation));
        if !claim.reason.is_empty() {
            println!("     {} {}", "Reason:".bold(), claim.reason);
        }
    }
}

/// Print the totals of a dataset run
pub fn print_run_summary(summary: &RunSummary) {
    print_result("Completed samples", &summary.completed.to_string());
    print_result("Failed samples", &summary.failed.to_string());
    print_result("Claims", &summary.claims.to_string());
    print_result("Hallucinations", &summary.hallucinations.to_string());
    if summary.unparsed > 0 {
        print_warning(&format!("{} claims have no parseable evaluation", summary.unparsed));
    }
}
