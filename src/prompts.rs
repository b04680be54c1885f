//! Instruction prompt for vision-based LaTeX extraction.
//!
//! Centralising the prompt here serves two purposes:
//!
//! 1. **Single source of truth** — tightening a rule (e.g. how delimiters are
//!    handled) requires editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect the prompt without spinning up
//!    a real vision model, making prompt regressions easy to catch.
//!
//! Callers can override the default via
//! [`crate::config::ExtractionConfig::prompt`]; the constant here is used
//! only when no override is provided.

/// Default instruction prompt sent alongside the equation image.
///
/// The model is asked for bare LaTeX: no delimiters, no preamble, no prose.
/// In practice models still occasionally wrap the output in `\[ ... \]` or a
/// code fence; [`crate::pipeline::postprocess`] cleans those up after the
/// fact rather than piling more rules onto the prompt.
pub const DEFAULT_EXTRACTION_PROMPT: &str = r#"Understand the mathematical equation in the provided image and output the corresponding LaTeX code.

Follow these rules precisely:

1. Output ONLY the LaTeX code corresponding to the mathematical equations in the image.
2. NEVER include any additional text or explanations.
3. DO NOT add dollar signs ($) or any other delimiters around the LaTeX code.
4. DO NOT extract simplified versions of the equations — transcribe exactly what is shown.
5. NEVER add \documentclass, \usepackage or \begin{document}.
6. DO NOT explain the symbols used in the equation."#;
