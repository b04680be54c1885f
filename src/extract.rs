//! Extraction entry points.
//!
//! Wires the pipeline stages together: decode → encode → vision call →
//! post-process. One image in, one [`ExtractionOutput`] out; the caller (CLI,
//! web handler, or a library user) decides where the result lives.

use crate::config::ExtractionConfig;
use crate::error::Img2TexError;
use crate::output::{ExtractionOutput, ExtractionStats};
use crate::pipeline::vision::{GroqVisionClient, VisionProvider};
use crate::pipeline::{encode, ingest, postprocess};
use crate::prompts::DEFAULT_EXTRACTION_PROMPT;
use image::DynamicImage;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Resolve the vision provider, most-specific first.
///
/// 1. **Pre-built provider** (`config.provider`) — the caller constructed and
///    configured the provider entirely; used as-is. This is how tests inject
///    a stub and how callers add middleware.
/// 2. **Production client** — built from the config's endpoint and
///    credential, falling back to the environment for the key.
pub fn resolve_provider(
    config: &ExtractionConfig,
) -> Result<Arc<dyn VisionProvider>, Img2TexError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }
    Ok(Arc::new(GroqVisionClient::from_config(config)?))
}

/// Run one extraction against an already-resolved provider.
///
/// Used by the web server, which resolves its provider once at startup.
pub async fn run_extraction(
    provider: &Arc<dyn VisionProvider>,
    bitmap: &DynamicImage,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Img2TexError> {
    let encoded = encode::encode_image(bitmap)?;
    let prompt = config.prompt.as_deref().unwrap_or(DEFAULT_EXTRACTION_PROMPT);

    let started = Instant::now();
    let response = provider.extract_latex(&encoded, prompt, config).await?;
    let duration_ms = started.elapsed().as_millis() as u64;

    debug!(
        latex_len = response.content.len(),
        duration_ms, "Extraction succeeded"
    );

    let cleaned = postprocess::clean_latex(&response.content);
    Ok(ExtractionOutput {
        latex: response.content,
        cleaned,
        model: config.model.clone(),
        stats: ExtractionStats {
            duration_ms,
            input_tokens: response.prompt_tokens,
            output_tokens: response.completion_tokens,
        },
    })
}

/// Extract LaTeX from a decoded bitmap.
pub async fn extract_image(
    bitmap: &DynamicImage,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Img2TexError> {
    let provider = resolve_provider(config)?;
    run_extraction(&provider, bitmap, config).await
}

/// Extract LaTeX from raw PNG/JPEG bytes.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// [`Img2TexError::DecodeFailed`] when the bytes are not a supported image;
/// the API error kinds when the vision call fails. No retries — a failure is
/// terminal for the attempt.
pub async fn extract_bytes(
    bytes: &[u8],
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Img2TexError> {
    let bitmap = ingest::decode_image(bytes)?;
    extract_image(&bitmap, config).await
}

/// Extract LaTeX from an image file on disk.
///
/// Validates the filename extension (png/jpg/jpeg) before reading, matching
/// the upload surface of the web UI.
pub async fn extract_file(
    path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Img2TexError> {
    let path = path.as_ref();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    ingest::ensure_supported_filename(&name)?;

    if !path.exists() {
        return Err(Img2TexError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    info!("Extracting LaTeX from {}", path.display());
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| Img2TexError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    extract_bytes(&bytes, config).await
}

/// Synchronous wrapper around [`extract_bytes`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    bytes: &[u8],
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Img2TexError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Img2TexError::RequestFailed {
            reason: format!("failed to create tokio runtime: {e}"),
        })?
        .block_on(extract_bytes(bytes, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::encode::EncodedImage;
    use crate::pipeline::vision::VisionResponse;
    use async_trait::async_trait;
    use image::{Rgba, RgbaImage};

    struct StubProvider {
        reply: String,
    }

    #[async_trait]
    impl VisionProvider for StubProvider {
        async fn extract_latex(
            &self,
            _image: &EncodedImage,
            _prompt: &str,
            _config: &ExtractionConfig,
        ) -> Result<VisionResponse, Img2TexError> {
            Ok(VisionResponse {
                content: self.reply.clone(),
                prompt_tokens: 12,
                completion_tokens: 5,
            })
        }
    }

    fn stub_config(reply: &str) -> ExtractionConfig {
        ExtractionConfig::builder()
            .provider(Arc::new(StubProvider {
                reply: reply.to_string(),
            }))
            .build()
            .unwrap()
    }

    fn test_bitmap() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255])))
    }

    #[tokio::test]
    async fn raw_and_cleaned_diverge_on_wrapped_output() {
        let config = stub_config("\\[x^2+y^2=z^2\\]");
        let out = extract_image(&test_bitmap(), &config).await.unwrap();
        assert_eq!(out.latex, "\\[x^2+y^2=z^2\\]", "raw text must stay verbatim");
        assert_eq!(out.cleaned, "x^2+y^2=z^2");
    }

    #[tokio::test]
    async fn stats_carry_usage_and_model() {
        let config = stub_config("E=mc^2");
        let out = extract_image(&test_bitmap(), &config).await.unwrap();
        assert_eq!(out.model, config.model);
        assert_eq!(out.stats.input_tokens, 12);
        assert_eq!(out.stats.output_tokens, 5);
    }

    #[tokio::test]
    async fn extract_bytes_rejects_garbage() {
        let config = stub_config("unused");
        let err = extract_bytes(b"not an image", &config).await.unwrap_err();
        assert!(matches!(err, Img2TexError::DecodeFailed { .. }));
    }

    #[tokio::test]
    async fn extract_file_rejects_unsupported_extension() {
        let config = stub_config("unused");
        let err = extract_file("/tmp/equation.webp", &config).await.unwrap_err();
        assert!(matches!(err, Img2TexError::UnsupportedFormat { .. }));
    }

    #[tokio::test]
    async fn extract_file_missing_path() {
        let config = stub_config("unused");
        let err = extract_file("/definitely/not/here.png", &config)
            .await
            .unwrap_err();
        assert!(matches!(err, Img2TexError::FileNotFound { .. }));
    }
}
