//! Output types returned by the extraction entry points.

use serde::{Deserialize, Serialize};

/// Result of a single extraction.
///
/// Carries both the verbatim model output and the cleaned variant. The two
/// deliberately diverge: the code view shows the user exactly what the model
/// returned, while typesetting uses the cleaned text so it renders correctly
/// even when the model wrapped the equation in display-math delimiters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    /// The model's output, verbatim.
    pub latex: String,

    /// The cleaned variant used for typesetting (delimiters and fences
    /// stripped, outer whitespace trimmed).
    pub cleaned: String,

    /// The model that produced the result.
    pub model: String,

    /// Timing and token accounting for the call.
    pub stats: ExtractionStats,
}

/// Timing and token usage for one extraction call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Wall-clock duration of the API call in milliseconds.
    pub duration_ms: u64,

    /// Prompt tokens reported by the API `usage` object (0 when absent).
    pub input_tokens: u32,

    /// Completion tokens reported by the API `usage` object (0 when absent).
    pub output_tokens: u32,
}
