use std::fs;
use std::path::{ Path, PathBuf };

use log::{ debug, error, info, warn };
use serde::Serialize;

use crate::config::RunOptions;
use crate::errors::{ AnnotatorError, AnnotatorResult, RecoverableError };
use crate::models::record::{ FailedSample, ResultRecord };
use crate::models::sample::Sample;
use crate::traits::claim_annotator::ClaimAnnotator;

/// Collects result records in input order and persists them as one JSON array
#[derive(Debug, Default)]
pub struct DatasetAssembler {
    records: Vec<ResultRecord>,
    failures: Vec<FailedSample>,
}

impl DatasetAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ResultRecord) {
        self.records.push(record);
    }

    pub fn record_failure(&mut self, failure: FailedSample) {
        self.failures.push(failure);
    }

    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    pub fn failures(&self) -> &[FailedSample] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Dataset as an indented JSON array
    pub fn to_json(&self) -> AnnotatorResult<String> {
        to_indented_json(&self.records)
    }

    /// Write the dataset to `path`.
    ///
    /// The array is written to a sibling temp file and renamed over `path`, so
    /// readers never see a half-written file.
    pub fn write_to(&self, path: &Path) -> AnnotatorResult<()> {
        write_atomically(path, &self.to_json()?)?;
        info!("Saved {} records to {}", self.records.len(), path.display());
        Ok(())
    }

    /// Write failure markers next to the dataset, if there are any
    pub fn write_failures(&self, output: &Path) -> AnnotatorResult<Option<PathBuf>> {
        if self.failures.is_empty() {
            return Ok(None);
        }

        let path = failures_path(output);
        write_atomically(&path, &to_indented_json(&self.failures)?)?;
        warn!("{} samples failed; markers saved to {}", self.failures.len(), path.display());
        Ok(Some(path))
    }
}

/// `<output>.failures.json`
pub fn failures_path(output: &Path) -> PathBuf {
    let mut name = output.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".failures.json");
    output.with_file_name(name)
}

/// Read the input dataset: a JSON array of samples
pub fn load_samples(path: &Path) -> AnnotatorResult<Vec<Sample>> {
    let contents = fs::read_to_string(path)?;
    let samples: Vec<Sample> = serde_json
        ::from_str(&contents)
        .map_err(|e| AnnotatorError::DatasetError(format!("{}: {}", path.display(), e)))?;

    debug!("Loaded {} samples from {}", samples.len(), path.display());
    Ok(samples)
}

fn to_indented_json<T: Serialize>(value: &T) -> AnnotatorResult<String> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;

    String::from_utf8(buffer).map_err(|e| AnnotatorError::DatasetError(e.to_string()))
}

fn write_atomically(path: &Path, contents: &str) -> AnnotatorResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    fs::write(&tmp_path, contents)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// What happened to one sample during a dataset run
#[derive(Debug)]
pub enum SampleOutcome<'a> {
    Completed(&'a ResultRecord),
    Failed(&'a FailedSample),
}

/// Totals for a dataset run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub completed: usize,
    pub failed: usize,
    pub claims: usize,
    pub hallucinations: usize,
    pub unparsed: usize,
}

/// Annotate samples one at a time, in input order, and write the dataset.
///
/// A sample whose pipeline fails with a recoverable error is recorded as a
/// failure marker and skipped, unless `fail_fast` is set. Whatever completed is
/// written to `output` before any error is returned.
pub async fn annotate_dataset<A, F>(
    annotator: &A,
    samples: &[Sample],
    options: &RunOptions,
    output: &Path,
    mut on_sample: F
) -> AnnotatorResult<(DatasetAssembler, RunSummary)>
    where A: ClaimAnnotator + Sync, F: FnMut(usize, SampleOutcome<'_>)
{
    let total = options.limit.map_or(samples.len(), |limit| limit.min(samples.len()));
    let mut assembler = DatasetAssembler::new();
    let mut summary = RunSummary::default();

    info!("Annotating {} of {} samples", total, samples.len());

    for (index, sample) in samples.iter().take(total).enumerate() {
        match annotator.annotate_sample(sample).await {
            Ok(record) => {
                summary.completed += 1;
                summary.claims += record.evaluated_claims.len();
                summary.hallucinations += record.hallucination_count();
                summary.unparsed += record.evaluated_claims
                    .iter()
                    .filter(|c| !c.evaluation.is_found())
                    .count();

                assembler.push(record);
                if let Some(last) = assembler.records().last() {
                    on_sample(index, SampleOutcome::Completed(last));
                }

                if let Some(every) = options.checkpoint_every.filter(|n| *n > 0) {
                    if summary.completed % every == 0 {
                        debug!("Checkpoint after {} samples", summary.completed);
                        assembler.write_to(output)?;
                    }
                }
            }
            Err(e) if e.is_recoverable() && !options.fail_fast => {
                warn!("Sample {} ({}) failed: {}", index, sample.image, e);
                if let Some(hint) = e.recovery_strategy() {
                    warn!("  {}", hint);
                }

                summary.failed += 1;
                assembler.record_failure(FailedSample::new(index, sample, &e));
                if let Some(last) = assembler.failures().last() {
                    on_sample(index, SampleOutcome::Failed(last));
                }
            }
            Err(e) => {
                error!("Stopping at sample {} ({}): {}", index, sample.image, e);
                assembler.record_failure(FailedSample::new(index, sample, &e));
                assembler.write_to(output)?;
                assembler.write_failures(output)?;
                return Err(e);
            }
        }
    }

    assembler.write_to(output)?;
    assembler.write_failures(output)?;

    Ok((assembler, summary))
}
