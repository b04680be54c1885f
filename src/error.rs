//! Error types for the img2tex library.
//!
//! One enum covers the three failure families of the pipeline:
//!
//! * **Decode** — the uploaded bytes are not a supported image. The upload is
//!   rejected and session state is left untouched.
//! * **Encode** — preparing the request payload failed. Unexpected and
//!   treated as fatal for the attempt; never retried.
//! * **Api** — the vision service call failed (network, auth, rate limit,
//!   malformed response). Surfaced to the caller so the user can re-trigger;
//!   the previously shown image/result stay intact.
//!
//! No failure is fatal to the process — every error leaves the session in a
//! state from which the user can retry or upload a different image.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the img2tex library.
#[derive(Debug, Error)]
pub enum Img2TexError {
    // ── Upload / decode errors ────────────────────────────────────────────
    /// The filename extension is not one of png / jpg / jpeg.
    #[error("Unsupported image file '{name}': expected a .png, .jpg or .jpeg file")]
    UnsupportedFormat { name: String },

    /// The bytes could not be decoded as a PNG or JPEG image.
    #[error("Could not decode image: {detail}\nOnly PNG and JPEG images are supported.")]
    DecodeFailed { detail: String },

    // ── Payload encoding errors ───────────────────────────────────────────
    /// PNG re-encoding of the bitmap failed while preparing the request.
    #[error("Failed to encode image for the API request: {detail}")]
    EncodeFailed { detail: String },

    // ── Vision API errors ─────────────────────────────────────────────────
    /// No API credential was found in the configuration or environment.
    #[error(
        "No API key configured.\nSet IMG2TEX_API_KEY or GROQ_API_KEY, or pass a key explicitly."
    )]
    MissingApiKey,

    /// The HTTP request failed or the service returned a non-success status.
    #[error("Vision API request failed: {reason}")]
    RequestFailed { reason: String },

    /// The service rejected the credential (401/403).
    #[error("Vision API authentication failed: {detail}\nCheck that the API key is valid.")]
    AuthFailed { detail: String },

    /// The service returned HTTP 429 — caller should slow down and re-trigger.
    #[error("Vision API rate limit exceeded")]
    RateLimited { retry_after_secs: Option<u64> },

    /// The call exceeded the configured timeout.
    #[error(
        "Vision API call timed out after {elapsed_ms}ms\nIncrease --api-timeout to allow more time."
    )]
    ApiTimeout { elapsed_ms: u64 },

    /// The response body could not be parsed, or carried no completion.
    #[error("Vision API returned an unexpected response: {detail}")]
    MalformedResponse { detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── File entry point (CLI) ────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// The input file exists but could not be read.
    #[error("Failed to read image file '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Img2TexError {
    /// Whether this error came from the vision API boundary.
    ///
    /// API failures retain the prior session state so the user can retry the
    /// same image; decode failures instead mean the upload itself was bad.
    #[must_use]
    pub const fn is_api_error(&self) -> bool {
        matches!(
            self,
            Self::MissingApiKey
                | Self::RequestFailed { .. }
                | Self::AuthFailed { .. }
                | Self::RateLimited { .. }
                | Self::ApiTimeout { .. }
                | Self::MalformedResponse { .. }
        )
    }
}
