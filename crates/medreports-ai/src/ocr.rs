//! Report text extraction via a vision-capable chat-completions API.
//!
//! Sends the uploaded image as a base64 `data:` URL inside a multimodal
//! user message and asks for a plain transcription.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::read_json;
use crate::error::AiError;

pub const DEFAULT_BASE_URL: &str = "https://api.together.xyz";
pub const DEFAULT_MODEL: &str = "meta-llama/Llama-Vision-Free";

const MAX_TOKENS: u32 = 1024;

const OCR_INSTRUCTION: &str = "\
You are a helpful assistant that extracts text from images. \
Please extract all text from this image and return it in markdown format. \
If you cannot read the text clearly, please say so.";

/// An uploaded report image.
#[derive(Debug, Clone)]
pub struct ReportImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: String,
}

impl ReportImage {
    /// `data:<mime>;base64,<payload>`. Non-image MIME types are sent as JPEG.
    pub fn data_url(&self) -> String {
        let mime = if self.mime_type.starts_with("image/") {
            self.mime_type.as_str()
        } else {
            "image/jpeg"
        };
        format!("data:{mime};base64,{}", BASE64_STANDARD.encode(&self.bytes))
    }
}

/// Turns an image into text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, image: &ReportImage) -> Result<String, AiError>;
}

#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

/// Chat-completions OCR client (Together AI).
#[derive(Clone)]
pub struct TogetherOcr {
    http: reqwest::Client,
    config: OcrConfig,
}

impl TogetherOcr {
    pub fn new(http: reqwest::Client, mut config: OcrConfig) -> Self {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        Self { http, config }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.config.base_url)
    }
}

#[async_trait]
impl TextExtractor for TogetherOcr {
    async fn extract_text(&self, image: &ReportImage) -> Result<String, AiError> {
        let request = build_ocr_request(&self.config.model, image);

        info!(
            model = %self.config.model,
            file_name = %image.file_name,
            bytes = image.bytes.len(),
            "extracting text from report image"
        );

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let body: ChatCompletionResponse = read_json(response).await?;
        let text = completion_text(body)?;

        info!(
            file_name = %image.file_name,
            text_len = text.len(),
            "report text extraction complete"
        );

        Ok(text)
    }
}

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    pub content: Option<String>,
}

/// Build the single-message OCR request for `image`.
pub fn build_ocr_request(model: &str, image: &ReportImage) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: model.to_string(),
        messages: vec![ChatMessage {
            role: "user",
            content: vec![
                ContentPart::Text {
                    text: OCR_INSTRUCTION.to_string(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image.data_url(),
                    },
                },
            ],
        }],
        max_tokens: MAX_TOKENS,
    }
}

/// The first choice's message content. Missing or empty content is an error.
pub fn completion_text(response: ChatCompletionResponse) -> Result<String, AiError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .filter(|text| !text.is_empty())
        .ok_or_else(|| AiError::ResponseShape("no message content in first choice".to_string()))
}
