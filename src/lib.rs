//! # img2tex
//!
//! Extract LaTeX source from images of mathematical equations using Vision
//! Language Models (VLMs).
//!
//! ## Why this crate?
//!
//! Classic OCR engines read prose, not math — superscripts, fraction bars,
//! and matrix brackets come out as soup. Instead this crate hands the
//! equation image to a vision-language model and asks for the LaTeX directly,
//! then cleans up the wrapper artefacts models tend to add despite
//! instructions not to.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image (PNG/JPEG)
//!  │
//!  ├─ 1. Ingest       sniff magic bytes, decode to a bitmap
//!  ├─ 2. Encode       PNG → base64 data URI
//!  ├─ 3. Vision       one chat-completion call with a fixed prompt
//!  ├─ 4. Postprocess  strip \[ \] delimiters and code fences
//!  └─ 5. Output       raw LaTeX (verbatim) + cleaned variant (for typesetting)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use img2tex::{extract_file, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Credential read from IMG2TEX_API_KEY / GROQ_API_KEY
//!     let config = ExtractionConfig::default();
//!     let output = extract_file("equation.png", &config).await?;
//!     println!("{}", output.cleaned);
//!     eprintln!("tokens: {} in / {} out",
//!         output.stats.input_tokens,
//!         output.stats.output_tokens);
//!     Ok(())
//! }
//! ```
//!
//! ## Web UI
//!
//! The [`server`] module serves an interactive page (upload → extract →
//! rendered math) around a per-session state machine; `img2tex serve` starts
//! it from the CLI.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `img2tex` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! img2tex = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod server;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ApiKey, ExtractionConfig, ExtractionConfigBuilder, DEFAULT_API_URL, DEFAULT_MODEL};
pub use error::Img2TexError;
pub use extract::{extract_bytes, extract_file, extract_image, extract_sync};
pub use output::{ExtractionOutput, ExtractionStats};
pub use pipeline::vision::{VisionProvider, VisionResponse};
pub use session::{Session, SessionError, SessionPhase, UploadedImage};
