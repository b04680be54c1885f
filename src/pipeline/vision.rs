//! Vision API interaction: build the chat-completion request and call it.
//!
//! This module is intentionally thin — prompt text lives in
//! [`crate::prompts`] so it can be changed without touching request assembly
//! or error mapping here.
//!
//! One request per extraction, no retries: a failure is terminal for the
//! attempt and the user re-triggers explicitly. (Backoff-and-retry would be a
//! reasonable addition but is deliberately absent; see DESIGN.md.)
//!
//! The API credential travels only in the `Authorization` header. It is never
//! logged, serialized, or echoed in error messages.

use crate::config::ExtractionConfig;
use crate::error::Img2TexError;
use crate::pipeline::encode::EncodedImage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// A completed vision call: the model's text plus token accounting.
#[derive(Debug, Clone)]
pub struct VisionResponse {
    /// The first completion choice's message content, verbatim.
    pub content: String,
    /// Prompt tokens reported by the API (0 when the `usage` object is absent).
    pub prompt_tokens: u32,
    /// Completion tokens reported by the API (0 when absent).
    pub completion_tokens: u32,
}

/// Seam for the external vision-language model.
///
/// The production implementation is [`GroqVisionClient`]; tests and callers
/// needing middleware inject their own via
/// [`ExtractionConfig::provider`](crate::config::ExtractionConfig::provider).
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Extract text from the encoded image using the given instruction
    /// prompt and the sampling parameters in `config`.
    async fn extract_latex(
        &self,
        image: &EncodedImage,
        prompt: &str,
        config: &ExtractionConfig,
    ) -> Result<VisionResponse, Img2TexError>;
}

// ── Wire types ───────────────────────────────────────────────────────────────
//
// OpenAI-compatible chat-completion body. One user message whose content is a
// two-part list: the text instruction block and the image block carrying the
// base64 data URI.

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: usize,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrlPart },
}

#[derive(Debug, Serialize)]
struct ImageUrlPart {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// Assemble the request body for one extraction call.
fn build_request<'a>(
    image: &EncodedImage,
    prompt: &'a str,
    config: &'a ExtractionConfig,
) -> ChatRequest<'a> {
    ChatRequest {
        model: &config.model,
        messages: vec![ChatMessage {
            role: "user",
            content: vec![
                ContentPart::Text { text: prompt },
                ContentPart::ImageUrl {
                    image_url: ImageUrlPart {
                        url: image.data_uri(),
                    },
                },
            ],
        }],
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    }
}

/// Parse a response body into a [`VisionResponse`].
fn parse_response(body: &str) -> Result<VisionResponse, Img2TexError> {
    let chat: ChatResponse =
        serde_json::from_str(body).map_err(|e| Img2TexError::MalformedResponse {
            detail: format!("invalid JSON: {e}"),
        })?;

    let usage = chat.usage.unwrap_or_default();
    let content = chat
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| Img2TexError::MalformedResponse {
            detail: "response contained no completion choices".to_string(),
        })?;

    Ok(VisionResponse {
        content,
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
    })
}

/// Map a non-success HTTP status to the matching error kind.
fn status_error(
    status: reqwest::StatusCode,
    retry_after_secs: Option<u64>,
    body: &str,
) -> Img2TexError {
    use reqwest::StatusCode;
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Img2TexError::AuthFailed {
            detail: snippet(body),
        },
        StatusCode::TOO_MANY_REQUESTS => Img2TexError::RateLimited { retry_after_secs },
        _ => Img2TexError::RequestFailed {
            reason: format!("HTTP {}: {}", status.as_u16(), snippet(body)),
        },
    }
}

/// Truncate an error body to keep messages readable.
fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }
    let mut s: String = trimmed.chars().take(200).collect();
    if s.len() < trimmed.len() {
        s.push('…');
    }
    s
}

// ── Production client ────────────────────────────────────────────────────────

/// Vision client for Groq's OpenAI-compatible chat-completion endpoint.
///
/// Works against any endpoint speaking the same dialect; the URL and model
/// are plain config fields.
pub struct GroqVisionClient {
    http: reqwest::Client,
    api_url: String,
    api_key: crate::config::ApiKey,
}

impl GroqVisionClient {
    /// Build a client from the config's endpoint, credential, and timeout.
    ///
    /// The credential falls back to the environment
    /// ([`ApiKey::from_env`](crate::config::ApiKey::from_env)) when the
    /// config carries none.
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, Img2TexError> {
        let api_key = config
            .api_key
            .clone()
            .or_else(crate::config::ApiKey::from_env)
            .ok_or(Img2TexError::MissingApiKey)?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| Img2TexError::RequestFailed {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl VisionProvider for GroqVisionClient {
    async fn extract_latex(
        &self,
        image: &EncodedImage,
        prompt: &str,
        config: &ExtractionConfig,
    ) -> Result<VisionResponse, Img2TexError> {
        let request = build_request(image, prompt, config);
        debug!(
            model = %config.model,
            payload_b64_bytes = image.base64.len(),
            "Sending extraction request"
        );

        let started = Instant::now();
        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(self.api_key.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Img2TexError::ApiTimeout {
                        elapsed_ms: started.elapsed().as_millis() as u64,
                    }
                } else {
                    Img2TexError::RequestFailed {
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let body = response
            .text()
            .await
            .map_err(|e| Img2TexError::MalformedResponse {
                detail: format!("failed to read response body: {e}"),
            })?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "Vision API returned an error");
            return Err(status_error(status, retry_after, &body));
        }

        let parsed = parse_response(&body)?;
        debug!(
            prompt_tokens = parsed.prompt_tokens,
            completion_tokens = parsed.completion_tokens,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Extraction response received"
        );
        Ok(parsed)
    }
}
