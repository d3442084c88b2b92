pub mod model_gateway;
pub mod claim_annotator;

// Re-export traits
pub use model_gateway::ModelGateway;
pub use claim_annotator::{ ClaimAnnotator, VerificationOutcome };
