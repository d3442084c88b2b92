use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::future::join_all;
use log::{ debug, info, warn };
use serde::{ Deserialize, Serialize };
use serde_json::{ json, Value };
use thiserror::Error;

use crate::errors::{ AnnotatorError, AnnotatorResult };
use crate::implementations::config::{ ApiConfig, ConfigError, GatewayConfig, Provider };
use crate::models::common::{ ImageRef, ModelRole };
use crate::traits::model_gateway::{ check_batch_shape, ModelGateway };

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("API error: {0}")] ApiError(String),

    #[error("Configuration error: {0}")] ConfigError(#[from] ConfigError),

    #[error("Failed to parse API response: {0}")] ParseError(String),

    #[error("Network error: {0}")] NetworkError(String),

    #[error("Failed to load image {path}: {message}")] ImageError {
        path: String,
        message: String,
    },

    #[error("HTTP error: {status} - {message}")] HttpError {
        status: u16,
        message: String,
    },
}

impl GatewayError {
    fn into_annotator_error(self, role: ModelRole) -> AnnotatorError {
        match self {
            GatewayError::ApiError(message) =>
                AnnotatorError::GatewayError { role: role.to_string(), message },
            GatewayError::ConfigError(err) => AnnotatorError::from(err),
            GatewayError::ParseError(msg) => AnnotatorError::ResponseFormatError(msg),
            GatewayError::NetworkError(msg) => AnnotatorError::NetworkError(msg),
            GatewayError::ImageError { path, message } => AnnotatorError::ImageError { path, message },
            GatewayError::HttpError { status, message } =>
                AnnotatorError::HttpError { status, message },
        }
    }
}

/// Image content ready to be embedded in a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagePayload {
    Url(String),
    Inline {
        media_type: String,
        data: String,
    },
}

impl ImagePayload {
    fn data_url(&self) -> String {
        match self {
            ImagePayload::Url(url) => url.clone(),
            ImagePayload::Inline { media_type, data } => format!("data:{};base64,{}", media_type, data),
        }
    }
}

/// OpenAI-compatible chat message
#[derive(Debug, Serialize, Deserialize, Clone)]
struct ChatMessage {
    role: String,
    content: Value,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: usize,
}

/// Model gateway over HTTP chat-completion endpoints.
///
/// Speaks the OpenAI chat completions format (vLLM, TGI, OpenAI) or the
/// Anthropic messages format, chosen per role in [`GatewayConfig`]. Local
/// images are read and sent inline as base64; URLs are passed through.
#[derive(Clone)]
pub struct ChatGateway {
    config: GatewayConfig,
    http_client: reqwest::Client,
    text_api_key: Option<String>,
    vision_api_key: Option<String>,
}

impl ChatGateway {
    /// Create a gateway, resolving API keys up front
    pub fn new(config: GatewayConfig) -> AnnotatorResult<Self> {
        config.validate()?;

        let http_client = reqwest::Client
            ::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AnnotatorError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        let text_api_key = config.get_api_key(ModelRole::Text)?;
        let vision_api_key = config.get_api_key(ModelRole::Vision)?;

        info!(
            "Model gateway ready: text model {} at {}, vision model {} at {}",
            config.text_model.model,
            config.text_model.api_endpoint,
            config.vision_model.model,
            config.vision_model.api_endpoint
        );

        Ok(Self { config, http_client, text_api_key, vision_api_key })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Read an image into a request payload
    pub async fn load_image(image: &ImageRef) -> Result<ImagePayload, GatewayError> {
        if image.is_remote() {
            return Ok(ImagePayload::Url(image.location.clone()));
        }

        let bytes = tokio::fs::read(&image.location).await.map_err(|e| GatewayError::ImageError {
            path: image.location.clone(),
            message: e.to_string(),
        })?;
        debug!("Loaded image {} ({} bytes)", image, bytes.len());

        Ok(ImagePayload::Inline {
            media_type: image.media_type().to_string(),
            data: STANDARD.encode(bytes),
        })
    }

    /// Request body in the OpenAI chat completions format
    pub fn build_openai_request(
        api: &ApiConfig,
        prompt: &str,
        image: Option<&ImagePayload>,
        max_tokens: usize,
        temperature: f32
    ) -> Value {
        let mut messages = Vec::new();
        if let Some(system) = &api.system_prompt {
            messages.push(ChatMessage { role: "system".to_string(), content: json!(system) });
        }

        let content = match image {
            Some(image) =>
                json!([
                { "type": "image_url", "image_url": { "url": image.data_url() } },
                { "type": "text", "text": prompt }
            ]),
            None => json!(prompt),
        };
        messages.push(ChatMessage { role: "user".to_string(), content });

        let request = ChatRequest {
            model: api.model.clone(),
            messages,
            temperature,
            max_tokens,
        };

        serde_json::to_value(&request).unwrap_or_else(|_| json!({}))
    }

    /// Request body in the Anthropic messages format
    pub fn build_anthropic_request(
        api: &ApiConfig,
        prompt: &str,
        image: Option<&ImagePayload>,
        max_tokens: usize,
        temperature: f32
    ) -> Value {
        let mut content = Vec::new();
        match image {
            Some(ImagePayload::Url(url)) => {
                content.push(json!({ "type": "image", "source": { "type": "url", "url": url } }));
            }
            Some(ImagePayload::Inline { media_type, data }) => {
                content.push(
                    json!({
                    "type": "image",
                    "source": { "type": "base64", "media_type": media_type, "data": data }
                })
                );
            }
            None => {}
        }
        content.push(json!({ "type": "text", "text": prompt }));

        let mut request =
            json!({
            "model": api.model,
            "max_tokens": max_tokens,
            "temperature": temperature,
            "messages": [{ "role": "user", "content": content }]
        });
        if let Some(system) = &api.system_prompt {
            request["system"] = json!(system);
        }
        request
    }

    /// Pull the completion text out of an OpenAI-style response
    pub fn extract_openai_content(response: &Value) -> Result<String, GatewayError> {
        let choices = response["choices"]
            .as_array()
            .ok_or_else(|| GatewayError::ParseError("Missing choices in response".to_string()))?;

        let first = choices
            .first()
            .ok_or_else(|| GatewayError::ApiError("API returned empty choices array".to_string()))?;

        first["message"]["content"]
            .as_str()
            .or_else(|| first["text"].as_str())
            .map(str::to_string)
            .ok_or_else(|| GatewayError::ParseError("Missing message content in first choice".to_string()))
    }

    /// Pull the completion text out of an Anthropic-style response
    pub fn extract_anthropic_content(response: &Value) -> Result<String, GatewayError> {
        if let Some(blocks) = response["content"].as_array() {
            let text: Vec<&str> = blocks
                .iter()
                .filter(|block| block["type"].as_str().unwrap_or("text") == "text")
                .filter_map(|block| block["text"].as_str())
                .collect();

            if text.is_empty() {
                return Err(GatewayError::ParseError("No text blocks in Anthropic response".to_string()));
            }
            return Ok(text.join(""));
        }

        response["completion"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| GatewayError::ParseError("Unable to find content in Anthropic response".to_string()))
    }

    /// Send one prompt (and optional image) to the model behind `role`
    async fn call_model(
        &self,
        role: ModelRole,
        prompt: &str,
        image: Option<&ImagePayload>
    ) -> Result<String, GatewayError> {
        let api = self.config.api_for(role);
        let api_key = match role {
            ModelRole::Text => self.text_api_key.as_deref(),
            ModelRole::Vision => self.vision_api_key.as_deref(),
        };

        debug!("Calling {} model {} at {}", role, api.model, api.api_endpoint);
        debug!("Prompt length: {} characters, image: {}", prompt.len(), image.is_some());

        let mut request_builder = self.http_client
            .post(&api.api_endpoint)
            .header("Content-Type", "application/json");

        let body = match api.provider {
            Provider::OpenAI => {
                if let Some(key) = api_key {
                    request_builder = request_builder.header("Authorization", format!("Bearer {}", key));
                }
                Self::build_openai_request(
                    api,
                    prompt,
                    image,
                    self.config.max_tokens,
                    self.config.temperature
                )
            }
            Provider::Anthropic => {
                let key = api_key.ok_or_else(||
                    GatewayError::ConfigError(
                        ConfigError::MissingApiKey("ANTHROPIC_API_KEY is not set".to_string())
                    )
                )?;
                request_builder = request_builder
                    .header("x-api-key", key)
                    .header("anthropic-version", "2023-06-01");
                Self::build_anthropic_request(
                    api,
                    prompt,
                    image,
                    self.config.max_tokens,
                    self.config.temperature
                )
            }
        };

        let response = request_builder
            .json(&body)
            .send().await
            .map_err(|e| {
                let error_msg = format!("Network error when calling {} model: {}", role, e);
                warn!("{}", error_msg);
                if e.is_timeout() {
                    warn!("Request timed out");
                }
                if e.is_connect() {
                    warn!("Connection error - check that {} is reachable", api.api_endpoint);
                }
                GatewayError::NetworkError(error_msg)
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response
                .text().await
                .unwrap_or_else(|_| "Failed to get error message".to_string());

            warn!("API error: HTTP {} - {}", status, error_text);
            return Err(GatewayError::HttpError { status, message: error_text });
        }

        let response_text = response.text().await.map_err(|e| {
            warn!("Failed to get response text: {}", e);
            GatewayError::ParseError(e.to_string())
        })?;

        let response_json: Value = serde_json::from_str(&response_text).map_err(|e| {
            warn!("JSON parsing error: {}", e);
            GatewayError::ParseError(format!("Invalid JSON response: {}", e))
        })?;

        let content = match api.provider {
            Provider::OpenAI => Self::extract_openai_content(&response_json)?,
            Provider::Anthropic => Self::extract_anthropic_content(&response_json)?,
        };

        debug!("Response length: {} characters", content.len());
        Ok(content)
    }
}

#[async_trait]
impl ModelGateway for ChatGateway {
    async fn respond_text(&self, prompt: &str) -> AnnotatorResult<String> {
        self.call_model(ModelRole::Text, prompt, None).await.map_err(|e|
            e.into_annotator_error(ModelRole::Text)
        )
    }

    async fn respond(&self, image: &ImageRef, prompt: &str) -> AnnotatorResult<String> {
        let payload = Self::load_image(image).await.map_err(|e|
            e.into_annotator_error(ModelRole::Vision)
        )?;

        self.call_model(ModelRole::Vision, prompt, Some(&payload)).await.map_err(|e|
            e.into_annotator_error(ModelRole::Vision)
        )
    }

    /// Requests run `batch_concurrency` at a time; results keep request order
    async fn respond_batch(
        &self,
        images: &[ImageRef],
        prompts: &[String]
    ) -> AnnotatorResult<Vec<String>> {
        check_batch_shape(images, prompts)?;

        // Per-claim batches usually repeat one image, so each file is read once
        let mut payloads: HashMap<&str, ImagePayload> = HashMap::new();
        for image in images {
            if !payloads.contains_key(image.location.as_str()) {
                let payload = Self::load_image(image).await.map_err(|e|
                    e.into_annotator_error(ModelRole::Vision)
                )?;
                payloads.insert(image.location.as_str(), payload);
            }
        }

        let requests: Vec<(&ImagePayload, &str)> = images
            .iter()
            .zip(prompts)
            .filter_map(|(image, prompt)| {
                payloads.get(image.location.as_str()).map(|payload| (payload, prompt.as_str()))
            })
            .collect();

        let concurrency = self.config.batch_concurrency.max(1);
        let mut responses = Vec::with_capacity(requests.len());

        for (chunk_index, chunk) in requests.chunks(concurrency).enumerate() {
            debug!("Sending batch chunk {} with {} requests", chunk_index + 1, chunk.len());

            let futures: Vec<_> = chunk
                .iter()
                .map(|&(payload, prompt)| self.call_model(ModelRole::Vision, prompt, Some(payload)))
                .collect();

            for result in join_all(futures).await {
                responses.push(result.map_err(|e| e.into_annotator_error(ModelRole::Vision))?);
            }
        }

        Ok(responses)
    }
}
