use std::fmt;
use std::path::Path;

use serde::{ Deserialize, Serialize };

/// Reference to the image a sample is about.
///
/// Either a local path or an `http(s)` URL. The pipeline never opens the image
/// itself; resolving it is the model gateway's job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRef {
    pub location: String,
}

impl ImageRef {
    pub fn new(location: impl Into<String>) -> Self {
        Self { location: location.into() }
    }

    /// Resolve a dataset image name against an optional root directory
    pub fn resolve(image: &str, root: Option<&Path>) -> Self {
        let candidate = Self::new(image);
        match root {
            Some(root) if !candidate.is_remote() && !Path::new(image).is_absolute() =>
                Self::new(root.join(image).to_string_lossy().into_owned()),
            _ => candidate,
        }
    }

    pub fn is_remote(&self) -> bool {
        self.location.starts_with("http://") || self.location.starts_with("https://")
    }

    /// Media type inferred from the file extension
    pub fn media_type(&self) -> &'static str {
        let ext = Path::new(&self.location)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("png") => "image/png",
            Some("gif") => "image/gif",
            Some("webp") => "image/webp",
            Some("bmp") => "image/bmp",
            _ => "image/jpeg",
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.location)
    }
}

/// Capability role a model plays in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    /// Text-only reasoning model (claim extraction)
    Text,
    /// Image+text model (verification and correction)
    Vision,
}

impl fmt::Display for ModelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelRole::Text => write!(f, "text"),
            ModelRole::Vision => write!(f, "vision"),
        }
    }
}

/// How claims are submitted to the vision model for verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum VerificationMode {
    /// One prompt per claim, all prompts of a sample sent as one batch
    #[default]
    PerClaim,
    /// Every claim of a sample in a single prompt
    Combined,
}

impl std::str::FromStr for VerificationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "per-claim" | "per_claim" | "perclaim" => Ok(VerificationMode::PerClaim),
            "combined" | "batch" => Ok(VerificationMode::Combined),
            other => Err(format!("Unknown verification mode: {}", other)),
        }
    }
}

impl fmt::Display for VerificationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationMode::PerClaim => write!(f, "per-claim"),
            VerificationMode::Combined => write!(f, "combined"),
        }
    }
}
