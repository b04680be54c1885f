//! Configuration types for LaTeX extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share a config between the CLI, the web server, and tests,
//! and to diff two runs to understand why their outputs differ.
//!
//! The API credential is wrapped in [`ApiKey`], whose `Debug` output is
//! redacted. The config's own `Debug` impl never exposes the key either, so
//! a config can be logged safely.

use crate::error::Img2TexError;
use crate::pipeline::vision::VisionProvider;
use std::fmt;
use std::sync::Arc;

/// Default chat-completion endpoint (Groq's OpenAI-compatible API).
pub const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Default vision model identifier.
pub const DEFAULT_MODEL: &str = "llama-3.2-11b-vision-preview";

/// An API credential that refuses to print itself.
///
/// There is intentionally no `Display` impl and no `Serialize` impl; the raw
/// value is only reachable through [`ApiKey::expose`], which the HTTP client
/// uses to build the `Authorization` header.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap an explicit key value.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Read the credential from the environment, once, at startup.
    ///
    /// Checks `IMG2TEX_API_KEY` first, then `GROQ_API_KEY`. Empty values are
    /// treated as absent.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        ["IMG2TEX_API_KEY", "GROQ_API_KEY"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|v| !v.is_empty())
            .map(Self)
    }

    /// The raw credential, for building the `Authorization` header only.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// Configuration for a LaTeX extraction.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use img2tex::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .model("llama-3.2-90b-vision-preview")
///     .temperature(0.2)
///     .max_tokens(512)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Vision model identifier sent in the request body. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Chat-completion endpoint URL. Default: [`DEFAULT_API_URL`].
    ///
    /// Any OpenAI-compatible endpoint that accepts `image_url` content parts
    /// works here (Groq, OpenAI, vLLM, LiteLLM, ...).
    pub api_url: String,

    /// API credential. If `None`, [`ApiKey::from_env`] is consulted at call
    /// time; a missing key fails the extraction with
    /// [`Img2TexError::MissingApiKey`].
    pub api_key: Option<ApiKey>,

    /// Sampling temperature for the completion. Range 0.0–2.0. Default: 0.7.
    ///
    /// Carried from the original deployment; lower values make transcription
    /// more deterministic and are worth trying for noisy images.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 1024.
    ///
    /// A full-page derivation can exceed 500 output tokens; setting this too
    /// low truncates the LaTeX mid-expression.
    pub max_tokens: usize,

    /// Custom instruction prompt. If `None`, uses
    /// [`crate::prompts::DEFAULT_EXTRACTION_PROMPT`].
    pub prompt: Option<String>,

    /// Per-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Pre-constructed provider. Takes precedence over `api_url`/`api_key`.
    ///
    /// Lets tests inject a stub and callers wrap the real client with
    /// middleware (caching, rate limiting).
    pub provider: Option<Arc<dyn VisionProvider>>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            temperature: 0.7,
            max_tokens: 1024,
            prompt: None,
            api_timeout_secs: 60,
            provider: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("model", &self.model)
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("prompt", &self.prompt.as_ref().map(|p| p.len()))
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn VisionProvider>"))
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_url = url.into();
        self
    }

    pub fn api_key(mut self, key: ApiKey) -> Self {
        self.config.api_key = Some(key);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = Some(prompt.into());
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn provider(mut self, provider: Arc<dyn VisionProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, Img2TexError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(Img2TexError::InvalidConfig(
                "Model identifier must not be empty".into(),
            ));
        }
        if c.api_url.trim().is_empty() {
            return Err(Img2TexError::InvalidConfig(
                "API URL must not be empty".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(Img2TexError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}
