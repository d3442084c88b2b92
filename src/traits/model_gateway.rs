use async_trait::async_trait;

use crate::errors::{ AnnotatorError, AnnotatorResult };
use crate::models::common::ImageRef;

/// Access to the text and image+text models.
///
/// Implementations are constructed once and shared by every sample of a run.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Text-only completion (reasoning role)
    async fn respond_text(&self, prompt: &str) -> AnnotatorResult<String>;

    /// Image+text completion (vision role)
    async fn respond(&self, image: &ImageRef, prompt: &str) -> AnnotatorResult<String>;

    /// Batched image+text completion.
    ///
    /// `response[i]` answers `(images[i], prompts[i])`. The default runs the
    /// requests one after another.
    async fn respond_batch(
        &self,
        images: &[ImageRef],
        prompts: &[String],
    ) -> AnnotatorResult<Vec<String>> {
        check_batch_shape(images, prompts)?;

        let mut responses = Vec::with_capacity(prompts.len());
        for (image, prompt) in images.iter().zip(prompts) {
            responses.push(self.respond(image, prompt).await?);
        }
        Ok(responses)
    }
}

/// Reject batches whose image and prompt lists differ in length
pub fn check_batch_shape(images: &[ImageRef], prompts: &[String]) -> AnnotatorResult<()> {
    if images.len() != prompts.len() {
        return Err(AnnotatorError::InvalidInput(
            format!("Batch has {} images but {} prompts", images.len(), prompts.len())
        ));
    }
    Ok(())
}
