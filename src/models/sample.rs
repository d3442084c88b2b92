use serde::{ Deserialize, Serialize };

/// One entry of the input dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Image name or path as written in the dataset
    pub image: String,

    /// Prompt the description was originally generated for
    #[serde(default)]
    pub prompt: String,

    /// Model-generated description that may contain hallucinations
    pub initial_response: String,
}

impl Sample {
    pub fn new(
        image: impl Into<String>,
        prompt: impl Into<String>,
        initial_response: impl Into<String>
    ) -> Self {
        Self {
            image: image.into(),
            prompt: prompt.into(),
            initial_response: initial_response.into(),
        }
    }
}
