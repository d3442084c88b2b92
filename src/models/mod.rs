pub mod common;
pub mod claim;
pub mod sample;
pub mod record;

// Re-export common model types
pub use common::{ ImageRef, ModelRole, VerificationMode };
pub use claim::{ Claim, EvaluatedClaim, Evaluation, EvaluationLabel };
pub use sample::Sample;
pub use record::{ FailedSample, ResultRecord };
