use std::sync::Mutex;

use async_trait::async_trait;
use log::info;

use crate::errors::{ AnnotatorError, AnnotatorResult };
use crate::models::common::ImageRef;
use crate::traits::model_gateway::{ check_batch_shape, ModelGateway };

type Reply = Box<dyn Fn(&str) -> String + Send + Sync>;

/// In-memory gateway that answers from closures and records every call
pub struct ScriptedGateway {
    text_reply: Reply,
    vision_reply: Reply,
    reverse_batches: bool,
    drop_last_batch_reply: bool,
    fail_when: Option<String>,
    pub text_prompts: Mutex<Vec<String>>,
    pub vision_calls: Mutex<Vec<(ImageRef, String)>>,
    pub batch_sizes: Mutex<Vec<usize>>,
}

impl ScriptedGateway {
    pub fn new(
        text_reply: impl Fn(&str) -> String + Send + Sync + 'static,
        vision_reply: impl Fn(&str) -> String + Send + Sync + 'static
    ) -> Self {
        Self {
            text_reply: Box::new(text_reply),
            vision_reply: Box::new(vision_reply),
            reverse_batches: false,
            drop_last_batch_reply: false,
            fail_when: None,
            text_prompts: Mutex::new(Vec::new()),
            vision_calls: Mutex::new(Vec::new()),
            batch_sizes: Mutex::new(Vec::new()),
        }
    }

    /// Return batch replies in reverse order, breaking the batch contract
    pub fn reversing_batches(mut self) -> Self {
        self.reverse_batches = true;
        self
    }

    /// Return one reply fewer than requested in every batch
    pub fn dropping_batch_replies(mut self) -> Self {
        self.drop_last_batch_reply = true;
        self
    }

    /// Fail every call whose prompt contains `needle`
    pub fn failing_when(mut self, needle: &str) -> Self {
        self.fail_when = Some(needle.to_string());
        self
    }

    pub fn vision_prompts(&self) -> Vec<String> {
        self.vision_calls
            .lock()
            .map(|calls| calls.iter().map(|(_, prompt)| prompt.clone()).collect())
            .unwrap_or_default()
    }

    fn check_failure(&self, prompt: &str) -> AnnotatorResult<()> {
        match &self.fail_when {
            Some(needle) if prompt.contains(needle.as_str()) =>
                Err(AnnotatorError::GatewayError {
                    role: "scripted".to_string(),
                    message: format!("scripted failure for '{}'", needle),
                }),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl ModelGateway for ScriptedGateway {
    async fn respond_text(&self, prompt: &str) -> AnnotatorResult<String> {
        self.check_failure(prompt)?;
        self.text_prompts.lock().unwrap().push(prompt.to_string());
        Ok((self.text_reply)(prompt))
    }

    async fn respond(&self, image: &ImageRef, prompt: &str) -> AnnotatorResult<String> {
        self.check_failure(prompt)?;
        self.vision_calls.lock().unwrap().push((image.clone(), prompt.to_string()));
        Ok((self.vision_reply)(prompt))
    }

    async fn respond_batch(
        &self,
        images: &[ImageRef],
        prompts: &[String]
    ) -> AnnotatorResult<Vec<String>> {
        check_batch_shape(images, prompts)?;
        self.batch_sizes.lock().unwrap().push(prompts.len());

        let mut replies = Vec::with_capacity(prompts.len());
        for (image, prompt) in images.iter().zip(prompts) {
            replies.push(self.respond(image, prompt).await?);
        }

        if self.reverse_batches {
            replies.reverse();
        }
        if self.drop_last_batch_reply {
            replies.pop();
        }
        Ok(replies)
    }
}

/// Initialize logging once for the test binary
pub fn setup() {
    if env_logger::builder().is_test(true).try_init().is_ok() {
        info!("Logger initialized");
    }
}

/// Claim text of the last statement slot in a verification prompt
pub fn last_statement(prompt: &str) -> String {
    prompt
        .rsplit("[STATEMENT 1]: ")
        .next()
        .and_then(|tail| tail.lines().next())
        .unwrap_or_default()
        .trim()
        .to_string()
}

pub fn is_correction_prompt(prompt: &str) -> bool {
    prompt.contains("The annotations are as follows:")
}

pub fn is_reverification_prompt(prompt: &str) -> bool {
    prompt.contains("Now, verify the following annotations:")
}

/// The part of a correction prompt holding the annotation block
pub fn correction_annotations(prompt: &str) -> String {
    prompt
        .rsplit("The annotations are as follows:")
        .next()
        .unwrap_or_default()
        .trim()
        .trim_matches('-')
        .trim()
        .to_string()
}

/// The initial description embedded in a correction prompt
pub fn correction_description(prompt: &str) -> String {
    let head = prompt.rsplit("The annotations are as follows:").nth(1).unwrap_or_default();
    let parts: Vec<&str> = head.split("---").collect();
    if parts.len() >= 2 {
        parts[parts.len() - 2].trim().to_string()
    } else {
        String::new()
    }
}
