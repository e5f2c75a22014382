//! OpenAI-compatible multimodal assessment client.
//!
//! Sends one system message and one user message made of a text block plus
//! a base64 JPEG data URL, and returns whatever free text the model answers
//! with. Extracting JSON from that text is the validator's job, not ours.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use base64::Engine;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::{AssessmentModel, VisionRequest};

const TEMPERATURE: f32 = 0.2;

#[derive(Debug, Clone)]
pub struct OpenAiVisionModel {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
}

impl OpenAiVisionModel {
    pub fn new(api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub(crate) fn to_api_request(request: &VisionRequest) -> ApiRequest {
        let data_url = format!(
            "data:image/jpeg;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&request.image_jpeg)
        );
        ApiRequest {
            model: request.model.clone(),
            temperature: TEMPERATURE,
            messages: vec![
                ApiMessage {
                    role: "system".to_string(),
                    content: ApiContent::Text(request.system.clone()),
                },
                ApiMessage {
                    role: "user".to_string(),
                    content: ApiContent::Parts(vec![
                        ApiPart::Text {
                            text: request.text.clone(),
                        },
                        ApiPart::ImageUrl {
                            image_url: ApiImageUrl { url: data_url },
                        },
                    ]),
                },
            ],
        }
    }
}

#[async_trait]
impl AssessmentModel for OpenAiVisionModel {
    async fn assess(&self, request: VisionRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.api_base);
        let payload = Self::to_api_request(&request);

        let resp = match self
            .client
            .post(url)
            .header("authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&payload)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                return Err(anyhow!(
                    "assessment api error (timeout) [retryable]: request timed out"
                ));
            }
            Err(e) if e.is_connect() => {
                return Err(anyhow!("assessment api error (connect) [retryable]: {e}"));
            }
            Err(e) => return Err(e.into()),
        };

        let status = resp.status();
        if status != StatusCode::OK {
            let text = resp.text().await?;
            return Err(format_api_error(status, &text));
        }

        let body: ApiResponse = resp.json().await?;
        let choice = body
            .choices
            .first()
            .ok_or_else(|| anyhow!("assessment api error: empty choices"))?;
        Ok(choice.message.content.clone().unwrap_or_default())
    }
}

fn format_api_error(status: StatusCode, text: &str) -> anyhow::Error {
    let retryable = match status.as_u16() {
        429 | 500..=599 => " [retryable]",
        _ => "",
    };
    anyhow!("assessment api error ({status}){retryable}: {text}")
}

// ============================================================
// Chat Completions API Types
// ============================================================

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ApiRequest {
    pub model: String,
    pub messages: Vec<ApiMessage>,
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ApiMessage {
    pub role: String,
    pub content: ApiContent,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub(crate) enum ApiContent {
    Text(String),
    Parts(Vec<ApiPart>),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ApiPart {
    Text { text: String },
    ImageUrl { image_url: ApiImageUrl },
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ApiImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiResponse {
    pub choices: Vec<ApiChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiChoice {
    pub message: ApiAssistantMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiAssistantMessage {
    #[serde(default)]
    pub content: Option<String>,
}
