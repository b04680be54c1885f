//! Pipeline stages for image-to-LaTeX extraction.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. point at a different vision endpoint) without
//! touching other stages.
//!
//! ## Data Flow
//!
//! ```text
//! upload ──▶ ingest ──▶ encode ──▶ vision ──▶ postprocess
//! (bytes)   (bitmap)   (base64)   (VLM call)  (cleanup)
//! ```
//!
//! 1. [`ingest`]      — validate and decode the uploaded PNG/JPEG bytes
//! 2. [`encode`]      — PNG-encode and base64-wrap the bitmap as a data URI
//!    for the multimodal API request body
//! 3. [`vision`]      — issue the single chat-completion call; the only
//!    stage with network I/O
//! 4. [`postprocess`] — deterministic text cleanup producing the variant
//!    used for typesetting (the raw text is kept verbatim alongside it)

pub mod encode;
pub mod ingest;
pub mod postprocess;
pub mod vision;
