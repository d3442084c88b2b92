pub mod models;
pub mod traits;
pub mod errors;
pub mod config;
pub mod implementations;
#[cfg(test)]
pub mod tests;

// Re-export core components
pub use config::{ PipelineOptions, RunOptions };
pub use errors::{ AnnotatorError, AnnotatorResult, ErrorSeverity, RecoverableError };
pub use implementations::chat_gateway::ChatGateway;
pub use implementations::config::{ ApiConfig, GatewayConfig, Provider };
pub use implementations::dataset::{ annotate_dataset, DatasetAssembler, RunSummary, SampleOutcome };
pub use implementations::pipeline::HallucinationAnnotator;
pub use implementations::prompt_builder::PromptBuilder;
pub use models::{
    claim::{ Claim, EvaluatedClaim, Evaluation, EvaluationLabel },
    common::{ ImageRef, ModelRole, VerificationMode },
    record::{ FailedSample, ResultRecord },
    sample::Sample,
};
pub use traits::{ ClaimAnnotator, ModelGateway, VerificationOutcome };
