//! HTTP client for the Gemini `generateContent` endpoint.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use watchman_core::{AnalysisResult, Frame, WatchmanConfig};

use crate::ClassifyError;
use crate::classifier::JudgementService;
use crate::prompt::response_schema;

const JPEG_MIME: &str = "image/jpeg";

// ── Wire types ──

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text { text: String },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

// ── Client ──

/// Client for a Gemini-compatible vision model.
pub struct GeminiClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    /// Create a client for `endpoint` (no trailing slash needed) and `model`.
    pub fn new(endpoint: &str, model: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn from_config(config: &WatchmanConfig) -> Self {
        Self::new(&config.endpoint, &config.model, &config.api_key)
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl JudgementService for GeminiClient {
    async fn judge(
        &self,
        instruction: &str,
        frame: &Frame,
    ) -> Result<AnalysisResult, ClassifyError> {
        let url = self.url();
        let body = build_request(instruction, frame);

        debug!(url = %url, bytes = frame.jpeg.len(), "requesting frame judgement");
        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClassifyError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let raw = resp.text().await?;
        parse_response(&raw)
    }
}

fn build_request(instruction: &str, frame: &Frame) -> GenerateRequest {
    GenerateRequest {
        contents: vec![Content {
            parts: vec![
                RequestPart::Text {
                    text: instruction.to_string(),
                },
                RequestPart::Inline {
                    inline_data: InlineData {
                        mime_type: JPEG_MIME,
                        data: STANDARD.encode(&frame.jpeg),
                    },
                },
            ],
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json",
            response_schema: response_schema(),
        },
    }
}

/// Extract the judgement from a raw `generateContent` response body.
///
/// The first candidate's text parts are concatenated and decoded strictly
/// as an [`AnalysisResult`].
fn parse_response(raw: &str) -> Result<AnalysisResult, ClassifyError> {
    let response: GenerateResponse = serde_json::from_str(raw)?;
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(ClassifyError::EmptyResponse);
    }
    Ok(serde_json::from_str(&text)?)
}
