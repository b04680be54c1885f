//! Post-processing: deterministic cleanup of the model's LaTeX output.
//!
//! Even well-prompted vision models occasionally wrap their answer despite
//! the instruction not to — most commonly in `\[ ... \]` display-math
//! delimiters, sometimes in a ```latex code fence. Delimiters break
//! downstream typesetting (the renderer adds its own math environment), so a
//! cleaned variant is produced for rendering while the raw text is shown to
//! the user verbatim.
//!
//! The rules are intentionally conservative: exactly the wrappers models are
//! known to emit, nothing speculative. `\[` inside an equation body is rare
//! but possible (line-break spacing like `\\[2pt]` shares the prefix), so
//! stripping beyond these two literal markers risks mangling valid LaTeX.
//! Stray characters beyond them are a known rough edge, surfaced as-is.

use once_cell::sync::Lazy;
use regex::Regex;

/// Produce the cleaned variant of raw model output used for typesetting.
///
/// Rules (applied in order):
/// 1. Strip a code fence wrapping the whole output (```latex / ```tex / ```)
/// 2. Remove literal `\[` and `\]` display-math delimiter markers
/// 3. Trim outer whitespace
///
/// The caller keeps the raw text unchanged for the code view; only the
/// rendered view uses the result of this function.
#[must_use]
pub fn clean_latex(input: &str) -> String {
    let s = strip_latex_fence(input);
    let s = strip_display_delimiters(&s);
    s.trim().to_string()
}

// ── Rule 1: Strip an outer code fence ────────────────────────────────────────

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:latex|tex)?\n(.*?)\n?```\s*$").unwrap());

fn strip_latex_fence(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCE.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 2: Remove display-math delimiters ───────────────────────────────────

fn strip_display_delimiters(input: &str) -> String {
    input.replace("\\[", "").replace("\\]", "")
}
