//! End-to-end integration tests for img2tex.
//!
//! Everything here runs against a stub `VisionProvider` — no network, no API
//! key. One optional live smoke test at the bottom is gated behind the
//! `E2E_ENABLED` environment variable plus a user-supplied image path, so it
//! never runs in CI unless explicitly requested.
//!
//! Run with:
//!   cargo test --test e2e
//!
//! Live smoke test:
//!   E2E_ENABLED=1 E2E_IMAGE=equation.png GROQ_API_KEY=... cargo test --test e2e live_

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use img2tex::pipeline::encode::{encode_image, EncodedImage};
use img2tex::pipeline::ingest::decode_image;
use img2tex::server::{create_router, AppState, ErrorResponse, SessionView};
use img2tex::{
    extract_bytes, ExtractionConfig, ExtractionOutput, Img2TexError, SessionPhase, VisionProvider,
    VisionResponse,
};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// A 10×10 solid-colour PNG, the spec's canonical upload.
fn solid_png() -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([40, 90, 200, 255])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .expect("test PNG encode");
    buf
}

fn solid_jpeg() -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(12, 8, Rgb([200, 40, 90])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Jpeg)
        .expect("test JPEG encode");
    buf
}

/// Stub provider returning a fixed reply, optionally failing the first
/// `fail_first` calls.
struct StubProvider {
    reply: String,
    fail_first: usize,
    calls: AtomicUsize,
}

impl StubProvider {
    fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            fail_first: 0,
            calls: AtomicUsize::new(0),
        })
    }

    fn flaky(reply: &str, fail_first: usize) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            fail_first,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl VisionProvider for StubProvider {
    async fn extract_latex(
        &self,
        _image: &EncodedImage,
        _prompt: &str,
        _config: &ExtractionConfig,
    ) -> Result<VisionResponse, Img2TexError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.fail_first {
            return Err(Img2TexError::RequestFailed {
                reason: "simulated transport failure".to_string(),
            });
        }
        Ok(VisionResponse {
            content: self.reply.clone(),
            prompt_tokens: 21,
            completion_tokens: 7,
        })
    }
}

fn stub_config(provider: Arc<StubProvider>) -> ExtractionConfig {
    ExtractionConfig::builder()
        .provider(provider)
        .build()
        .expect("valid config")
}

// ── Encode round-trip properties ─────────────────────────────────────────────

#[test]
fn png_round_trips_to_identical_pixels() {
    let bitmap = decode_image(&solid_png()).expect("decode PNG");
    let encoded = encode_image(&bitmap).expect("encode");

    let uri = encoded.data_uri();
    let payload = uri
        .strip_prefix("data:image/png;base64,")
        .expect("data URI prefix");
    let bytes = STANDARD.decode(payload).expect("valid base64 payload");
    let round_tripped = image::load_from_memory(&bytes).expect("payload decodes");

    assert_eq!(round_tripped.to_rgba8(), bitmap.to_rgba8());
}

#[test]
fn jpeg_round_trips_to_identical_pixels() {
    // The payload is a PNG re-encoding of the *decoded* bitmap, so it must be
    // pixel-identical to that bitmap even though the original file was lossy.
    let bitmap = decode_image(&solid_jpeg()).expect("decode JPEG");
    let encoded = encode_image(&bitmap).expect("encode");

    let bytes = STANDARD.decode(&encoded.base64).expect("valid base64");
    let round_tripped = image::load_from_memory(&bytes).expect("payload decodes");

    assert_eq!(round_tripped.to_rgba8(), bitmap.to_rgba8());
}

#[test]
fn non_image_bytes_fail_decode() {
    for junk in [
        &b"plain text"[..],
        &b"%PDF-1.7 not an image"[..],
        &[0u8; 64][..],
        &[][..],
    ] {
        let err = decode_image(junk).expect_err("junk must not decode");
        assert!(matches!(err, Img2TexError::DecodeFailed { .. }), "got: {err}");
    }
}

// ── Library end-to-end with stub provider ────────────────────────────────────

#[tokio::test]
async fn end_to_end_solid_png_with_stub() {
    let config = stub_config(StubProvider::replying("E=mc^2"));
    let output = extract_bytes(&solid_png(), &config)
        .await
        .expect("extraction succeeds");

    assert_eq!(output.latex, "E=mc^2", "code view shows the verbatim text");
    assert_eq!(output.cleaned, "E=mc^2", "rendered view typesets the same text");
    assert_eq!(output.stats.input_tokens, 21);
    assert_eq!(output.stats.output_tokens, 7);
}

#[tokio::test]
async fn raw_kept_verbatim_while_cleaned_strips_delimiters() {
    let config = stub_config(StubProvider::replying("\\[x^2+y^2=z^2\\]"));
    let output = extract_bytes(&solid_png(), &config)
        .await
        .expect("extraction succeeds");

    assert_eq!(output.latex, "\\[x^2+y^2=z^2\\]");
    assert_eq!(output.cleaned, "x^2+y^2=z^2");
}

#[tokio::test]
async fn api_failure_surfaces_without_retry() {
    let provider = StubProvider::flaky("never seen", 10);
    let config = stub_config(Arc::clone(&provider));

    let err = extract_bytes(&solid_png(), &config)
        .await
        .expect_err("stubbed failure must surface");
    assert!(matches!(err, Img2TexError::RequestFailed { .. }));
    assert_eq!(
        provider.calls.load(Ordering::SeqCst),
        1,
        "exactly one attempt — no automatic retries"
    );
}

// ── Full session journey through the web layer ───────────────────────────────

mod web {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request, Response, StatusCode};
    use tower::util::ServiceExt;

    const BOUNDARY: &str = "e2e-test-boundary";

    fn upload_request(filename: &str, bytes: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; \
                 filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method(Method::POST)
            .uri("/api/upload")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request")
    }

    fn post(uri: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .body(Body::empty())
            .expect("request")
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).expect("request")
    }

    async fn json<T: serde::de::DeserializeOwned>(response: Response<Body>) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn upload_extract_reset_journey() {
        let state = AppState::with_provider(
            ExtractionConfig::default(),
            StubProvider::replying("\\frac{a}{b}"),
        );
        let router = create_router(state);

        // Upload
        let response = router
            .clone()
            .oneshot(upload_request("equation.png", &solid_png()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let view: SessionView = json(response).await;
        assert_eq!(view.phase, SessionPhase::ImageLoaded);

        // Extract
        let response = router.clone().oneshot(post("/api/extract")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let output: ExtractionOutput = json(response).await;
        assert_eq!(output.latex, "\\frac{a}{b}");

        // Session reflects the result
        let view: SessionView =
            json(router.clone().oneshot(get("/api/session")).await.unwrap()).await;
        assert_eq!(view.phase, SessionPhase::ResultShown);
        assert!(view.has_image, "a result never exists without its image");
        assert_eq!(view.latex.as_deref(), Some("\\frac{a}{b}"));

        // Reset
        let view: SessionView =
            json(router.clone().oneshot(post("/api/reset")).await.unwrap()).await;
        assert_eq!(view.phase, SessionPhase::Idle);
        assert!(!view.has_image);
        assert!(view.latex.is_none());

        // Image gone too
        let response = router.oneshot(get("/api/image")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn failed_attempt_then_successful_retry() {
        let provider = StubProvider::flaky("E=mc^2", 1);
        let state = AppState::with_provider(ExtractionConfig::default(), provider);
        let session = Arc::clone(&state.session);
        let router = create_router(state);

        router
            .clone()
            .oneshot(upload_request("equation.png", &solid_png()))
            .await
            .unwrap();

        // First attempt fails; state rolls back to ImageLoaded.
        let response = router.clone().oneshot(post("/api/extract")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let err: ErrorResponse = json(response).await;
        assert!(err.error.contains("simulated transport failure"));
        {
            let guard = session.lock().await;
            assert_eq!(guard.phase(), SessionPhase::ImageLoaded);
            assert!(guard.latex().is_none());
            assert!(guard.image().is_some());
        }

        // Explicit re-trigger succeeds; the session stayed usable.
        let response = router.clone().oneshot(post("/api/extract")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let output: ExtractionOutput = json(response).await;
        assert_eq!(output.cleaned, "E=mc^2");
        assert_eq!(session.lock().await.phase(), SessionPhase::ResultShown);
    }

    #[tokio::test]
    async fn repeated_extract_is_idempotent_safe() {
        let provider = StubProvider::replying("a+b");
        let state = AppState::with_provider(
            ExtractionConfig::default(),
            Arc::clone(&provider) as Arc<dyn VisionProvider>,
        );
        let router = create_router(state);

        router
            .clone()
            .oneshot(upload_request("equation.png", &solid_png()))
            .await
            .unwrap();

        for _ in 0..3 {
            let response = router.clone().oneshot(post("/api/extract")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3, "each trigger re-runs the call");
    }
}

// ── Optional live smoke test ─────────────────────────────────────────────────

#[tokio::test]
async fn live_extract_smoke() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP — set E2E_ENABLED=1 to run live e2e tests");
        return;
    }
    let Ok(path) = std::env::var("E2E_IMAGE") else {
        println!("SKIP — set E2E_IMAGE to an equation image path");
        return;
    };

    let config = ExtractionConfig::default();
    let output = img2tex::extract_file(&path, &config)
        .await
        .expect("live extraction should succeed");

    assert!(!output.cleaned.trim().is_empty(), "model returned empty LaTeX");
    println!("live result: {}", output.cleaned);
}
