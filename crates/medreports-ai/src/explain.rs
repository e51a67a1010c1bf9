//! Lay-language explanation of extracted report text via the Gemini
//! `generateContent` API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::read_json;
use crate::error::AiError;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemma-3-27b-it";

/// Fixed instruction. The extracted report text is appended after it.
const EXPLANATION_PROMPT: &str = r#"You are a medical assistant AI that explains medical reports in simple terms for regular people. Please analyze the following medical report and provide a structured analysis. For each test result, output a JSON array with the following fields for each test:

[
  {
    "name": "Test name (with a simple explanation in parentheses)",
    "value": "Test value and unit",
    "status": "NORMAL" | "CONCERNING" | "ABNORMAL",
    "explanation": "Brief explanation in simple, non-medical language. Explain what this means for the person's health."
  },
  ...
]

Do not include any markdown, headings, or extra formatting. Only output the JSON array for test results. After the array, output a short patient summary in plain text (not JSON). Here is the medical report:

"#;

/// Turns extracted report text into the model's raw explanation.
#[async_trait]
pub trait Explainer: Send + Sync {
    async fn explain(&self, report_text: &str) -> Result<String, AiError>;
}

#[derive(Debug, Clone)]
pub struct ExplanationConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

#[derive(Clone)]
pub struct GeminiExplainer {
    http: reqwest::Client,
    config: ExplanationConfig,
}

impl GeminiExplainer {
    pub fn new(http: reqwest::Client, mut config: ExplanationConfig) -> Self {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        Self { http, config }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, self.config.model
        )
    }
}

#[async_trait]
impl Explainer for GeminiExplainer {
    async fn explain(&self, report_text: &str) -> Result<String, AiError> {
        let request = build_explanation_request(report_text);

        info!(
            model = %self.config.model,
            input_len = report_text.len(),
            "requesting report explanation"
        );

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let body: GenerateContentResponse = read_json(response).await?;
        let text = response_text(body)?;

        info!(output_len = text.len(), "report explanation complete");

        Ok(text)
    }
}

pub fn build_prompt(report_text: &str) -> String {
    format!("{EXPLANATION_PROMPT}{report_text}")
}

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
}

pub fn build_explanation_request(report_text: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts: vec![Part {
                text: Some(build_prompt(report_text)),
            }],
        }],
    }
}

/// Concatenated text parts of the first candidate.
pub fn response_text(response: GenerateContentResponse) -> Result<String, AiError> {
    let content = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .ok_or_else(|| AiError::ResponseShape("no candidate content in response".to_string()))?;

    let text = content
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect::<Vec<_>>()
        .join("");

    Ok(text)
}
