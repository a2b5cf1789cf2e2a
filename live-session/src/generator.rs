//! Non-streaming text generation used by compaction cycles.
//!
//! Compaction runs outside the live duplex channel so summarization never
//! interleaves synthetic turns with real audio output.

use async_trait::async_trait;
use live_common::config::{ApiAuth, ApiConfig};
use live_common::{Error, Result, ResultExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One-shot generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub max_output_tokens: u32,
}

/// Text generation backend.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Backend name (e.g., "gemini").
    fn name(&self) -> &str;

    /// Generate text for a single prompt. An empty string is a valid reply
    /// that callers treat as "nothing generated".
    async fn generate(&self, request: GenerateRequest) -> Result<String>;
}

// ══════════════════════════════════════════════════════════════════════════════
// GEMINI REST TYPES
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    role: String,
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
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

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

const DEVELOPER_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Gemini `generateContent` client.
///
/// Credentials are resolved on every call, so a missing key surfaces as a
/// configuration error for that call only and a later call can succeed once
/// the configuration is fixed.
pub struct GeminiGenerator {
    api: ApiConfig,
    base_url: Option<String>,
    client: Client,
}

impl GeminiGenerator {
    pub fn new(api: ApiConfig) -> Self {
        Self {
            base_url: None,
            client: Client::builder()
                .timeout(Duration::from_secs(api.request_timeout_secs))
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api,
        }
    }

    /// Override the API host (used for regional gateways and tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    fn request_builder(&self, auth: &ApiAuth, model: &str) -> reqwest::RequestBuilder {
        let model = model.trim_start_matches("models/");
        match auth {
            ApiAuth::ApiKey(key) => {
                let base = self.base_url.as_deref().unwrap_or(DEVELOPER_API_BASE);
                let url = format!("{base}/v1beta/models/{model}:generateContent");
                self.client.post(url).query(&[("key", key.as_str())])
            }
            ApiAuth::Vertex {
                project_id,
                location,
                access_token,
            } => {
                let base = self
                    .base_url
                    .clone()
                    .unwrap_or_else(|| format!("https://{location}-aiplatform.googleapis.com"));
                let url = format!(
                    "{base}/v1/projects/{project_id}/locations/{location}/publishers/google/models/{model}:generateContent"
                );
                self.client.post(url).bearer_auth(access_token)
            }
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, request: GenerateRequest) -> Result<String> {
        let auth = self.api.resolve_auth()?;

        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user".into(),
                parts: vec![RequestPart {
                    text: request.prompt,
                }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: request.max_output_tokens,
            },
        };

        let response = self
            .request_builder(&auth, &request.model)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout
                } else {
                    Error::External(format!("[gemini:{}] Request failed: {e}", request.model))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::External(format!(
                "[gemini:{}] API error ({}): {}",
                request.model,
                status.as_u16(),
                error_text
            )));
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout
            } else {
                Error::External(format!("[gemini:{}] Failed to read response: {e}", request.model))
            }
        })?;
        let result: GenerateContentResponse = serde_json::from_str::<GenerateContentResponse>(&body)
            .context(format!("[gemini:{}] Failed to parse response", request.model))?;

        if let Some(err) = result.error {
            return Err(Error::External(format!(
                "[gemini:{}] API error: {}",
                request.model, err.message
            )));
        }

        let text = result
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        Ok(text)
    }
}
