//! Recovers structured data from free-text model replies.
//!
//! Replies are expected to follow the tagged templates the prompts ask for, but
//! models drift: bold markers, echoed labels, missing numbers. Nothing here
//! fails. A reply that cannot be read yields the `Not Found` sentinel or an
//! empty fact list, and the pipeline records that and moves on.

use std::collections::HashMap;
use std::sync::OnceLock;

use log::{ debug, warn };
use regex::Regex;

use crate::models::claim::{ Evaluation, EvaluationLabel };

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Statement,
    Evaluation,
    Reason,
}

/// One `[KIND n]:` tag and the text up to the next tag
#[derive(Debug)]
struct Tag<'a> {
    kind: TagKind,
    index: Option<usize>,
    body: &'a str,
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?im)^[ \t>#*-]*\[?[ \t]*\**(statement|evaluation|reason)\**(?:[ \t]*#?[ \t]*(\d+))?[ \t]*\]?[ \t]*\**[ \t]*:"
        ).expect("tag pattern is valid")
    })
}

fn label_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)\b(not[ \t]+(?:an?[ \t]+)?hallucination|non[ \t_-]?hallucination|hallucination|subjective)\b"
        ).expect("label pattern is valid")
    })
}

fn fact_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?im)^[ \t]*(?:[-*•]|\d+[.)])[ \t]+(?:\[?FACT[ \t-]?\d+\]?[:.]?[ \t]*)?(.+?)[ \t]*$"
        ).expect("fact pattern is valid")
    })
}

fn bare_marker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)^\[?FACT[ \t-]?\d+\]?$").expect("marker pattern is valid"))
}

fn blank_line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\r?\n[ \t]*\r?\n").expect("blank line pattern is valid"))
}

fn reason_echo_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)^(?:reason|non[ \t_-]?hallucination|hallucination|subjective)\**(?:[ \t]*:|\.[ \t]|[ \t]+-[ \t])[ \t]*"
        ).expect("echo pattern is valid")
    })
}

fn scan_tags(text: &str) -> Vec<Tag<'_>> {
    let matches: Vec<_> = tag_pattern().captures_iter(text).collect();

    matches
        .iter()
        .enumerate()
        .filter_map(|(i, caps)| {
            let whole = caps.get(0)?;
            let kind = match caps[1].to_lowercase().as_str() {
                "statement" => TagKind::Statement,
                "evaluation" => TagKind::Evaluation,
                _ => TagKind::Reason,
            };
            let index = caps.get(2).and_then(|n| n.as_str().parse::<usize>().ok());
            let body_end = matches
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map(|m| m.start())
                .unwrap_or(text.len());

            Some(Tag { kind, index, body: &text[whole.end()..body_end] })
        })
        .collect()
}

/// Strip markup noise around a tag body
fn clean_markup(body: &str) -> &str {
    body.trim_start_matches(|c: char| c.is_whitespace() || c == '*' || c == ':' || c == '_')
        .trim_end_matches(|c: char| c.is_whitespace() || c == '*' || c == '_')
}

/// Label from the first non-empty line of an evaluation tag body
fn label_from_body(body: &str) -> EvaluationLabel {
    let first_line = clean_markup(body)
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default();

    label_pattern()
        .captures(first_line)
        .map(|caps| EvaluationLabel::from_keyword(&caps[1]))
        .unwrap_or(EvaluationLabel::NotFound)
}

fn reason_from_body(body: &str) -> String {
    let mut reason = clean_markup(body);

    // Models often restate the label or the tag name before the actual reason
    while let Some(echo) = reason_echo_pattern().find(reason) {
        reason = clean_markup(&reason[echo.end()..]);
    }

    // The reason is one paragraph; anything after a blank line is chatter
    if let Some(gap) = blank_line_pattern().find(reason) {
        reason = clean_markup(&reason[..gap.start()]);
    }

    reason.to_string()
}

/// Extract bullet-style facts, in order.
///
/// Accepts `- [FACT-n] text`, plain `- text`, `* text` and `1. text` lines.
/// An empty result is a valid answer: the description had no facts.
pub fn parse_facts(response: &str) -> Vec<String> {
    let facts: Vec<String> = fact_pattern()
        .captures_iter(response)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|fact| !fact.is_empty() && !bare_marker_pattern().is_match(fact))
        .collect();

    if facts.is_empty() && !response.trim().is_empty() {
        warn!("No facts found in a {} character extraction reply", response.len());
    } else {
        debug!("Parsed {} facts", facts.len());
    }

    facts
}

/// Render facts in the bullet format the extraction prompt asks for
pub fn format_facts(facts: &[String]) -> String {
    facts
        .iter()
        .enumerate()
        .map(|(i, fact)| format!("- [FACT-{}] {}", i + 1, fact))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Read the verdict for a single claim.
///
/// The label is taken only from the evaluation tag, so category names the
/// model mentions in its reasoning never count. Without an evaluation tag the
/// label is [`EvaluationLabel::NotFound`].
pub fn parse_evaluation(response: &str) -> Evaluation {
    let tags = scan_tags(response);

    let label = tags
        .iter()
        .find(|tag| tag.kind == TagKind::Evaluation)
        .map(|tag| label_from_body(tag.body))
        .unwrap_or(EvaluationLabel::NotFound);

    let reason = tags
        .iter()
        .find(|tag| tag.kind == TagKind::Reason)
        .map(|tag| reason_from_body(tag.body))
        .unwrap_or_default();

    if !label.is_found() {
        warn!("No evaluation label found in verification reply");
    }

    Evaluation { label, reason }
}

/// Read a multi-claim annotation block into exactly `claim_count` evaluations.
///
/// Numbered tags map to their claim; unnumbered tags are matched by order of
/// appearance. Claims the block says nothing about get the sentinel.
pub fn parse_annotation_block(response: &str, claim_count: usize) -> Vec<Evaluation> {
    let mut labels: HashMap<usize, EvaluationLabel> = HashMap::new();
    let mut reasons: HashMap<usize, String> = HashMap::new();
    let (mut evaluations_seen, mut reasons_seen) = (0, 0);

    for tag in scan_tags(response) {
        match tag.kind {
            TagKind::Evaluation => {
                evaluations_seen += 1;
                let index = tag.index.unwrap_or(evaluations_seen);
                labels.entry(index).or_insert_with(|| label_from_body(tag.body));
            }
            TagKind::Reason => {
                reasons_seen += 1;
                let index = tag.index.unwrap_or(reasons_seen);
                reasons.entry(index).or_insert_with(|| reason_from_body(tag.body));
            }
            TagKind::Statement => {}
        }
    }

    let evaluations: Vec<Evaluation> = (1..=claim_count)
        .map(|i| Evaluation {
            label: labels.get(&i).copied().unwrap_or(EvaluationLabel::NotFound),
            reason: reasons.remove(&i).unwrap_or_default(),
        })
        .collect();

    let missing = evaluations
        .iter()
        .filter(|e| !e.label.is_found())
        .count();
    if missing > 0 {
        warn!("{} of {} claims have no evaluation in the annotation block", missing, claim_count);
    }

    evaluations
}
