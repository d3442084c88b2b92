use crate::models::common::VerificationMode;

/// Policy knobs for the per-sample pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    pub verification_mode: VerificationMode,

    /// Resubmit the combined annotation block once for a consistency review
    pub double_check: bool,

    /// Offer `subjective` as a verdict in verification prompts
    pub allow_subjective: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            verification_mode: VerificationMode::PerClaim,
            double_check: false,
            allow_subjective: true,
        }
    }
}

/// Options for a whole dataset run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Process at most this many samples
    pub limit: Option<usize>,

    /// Rewrite the output file after every N completed samples
    pub checkpoint_every: Option<usize>,

    /// Stop at the first failed sample instead of recording it and moving on
    pub fail_fast: bool,
}
