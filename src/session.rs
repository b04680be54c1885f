//! Per-session state: the uploaded image, the extraction result, and the
//! presentation-layer state machine.
//!
//! One [`Session`] exists per interactive user session. It is an explicit
//! object handed to the presentation layer (never a process-wide global), and
//! all mutation goes through transition methods so the state invariants hold
//! by construction:
//!
//! - a stored result always belongs to the image that was active when its
//!   extraction began (completions arriving after an upload or reset are
//!   discarded);
//! - reads after a reset behave as "absent", never as stale values;
//! - at most one extraction is in flight at a time.

use crate::error::Img2TexError;
use crate::pipeline::ingest;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

// ============================================================================
// SessionPhase
// ============================================================================

/// Presentation-layer phase of a session.
///
/// The phase transitions through these states:
/// - `Idle` -> `ImageLoaded` (upload)
/// - `ImageLoaded` / `ResultShown` -> `Extracting` (extract trigger)
/// - `Extracting` -> `ResultShown` (success) or back to the prior phase
///   (failure, with the error surfaced transiently)
/// - any -> `ImageLoaded` (new upload) or `Idle` (reset)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No image uploaded, no result. Initial state.
    #[default]
    Idle,
    /// Image present, no result yet.
    ImageLoaded,
    /// Extraction request in flight.
    Extracting,
    /// Image and result both present.
    ResultShown,
}

impl SessionPhase {
    /// Whether an extraction may be triggered from this phase.
    #[must_use]
    pub const fn can_extract(&self) -> bool {
        matches!(self, Self::ImageLoaded | Self::ResultShown)
    }

    /// Whether an extraction call is currently in flight.
    #[must_use]
    pub const fn is_extracting(&self) -> bool {
        matches!(self, Self::Extracting)
    }
}

// ============================================================================
// SessionError
// ============================================================================

/// Invalid transition attempted at the presentation boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Extract was triggered with no image uploaded.
    #[error("No image uploaded — upload an equation image first")]
    NoImage,

    /// Extract was triggered while a previous extraction is still in flight.
    #[error("An extraction is already in progress")]
    ExtractionInFlight,
}

// ============================================================================
// UploadedImage
// ============================================================================

/// The current session's image: original bytes plus the decoded bitmap.
///
/// Replaced wholesale on the next upload; dropped on reset. The raw bytes are
/// kept for display, the bitmap for encoding at extraction time.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    /// The bytes exactly as uploaded, for serving back to the UI.
    pub raw: Vec<u8>,
    /// Decoded pixel data.
    pub bitmap: DynamicImage,
    /// MIME type sniffed from the raw bytes.
    pub mime_type: &'static str,
    /// Original filename, when the upload surface provided one.
    pub filename: Option<String>,
}

impl UploadedImage {
    /// Validate and decode uploaded bytes.
    ///
    /// When a filename is provided its extension is checked first
    /// (png/jpg/jpeg); the content is then sniffed and decoded regardless of
    /// what the name claimed. Fails without side effects.
    pub fn from_bytes(raw: Vec<u8>, filename: Option<String>) -> Result<Self, Img2TexError> {
        if let Some(ref name) = filename {
            ingest::ensure_supported_filename(name)?;
        }
        let mime_type = ingest::image_mime(&raw)?;
        let bitmap = ingest::decode_image(&raw)?;
        Ok(Self {
            raw,
            bitmap,
            mime_type,
            filename,
        })
    }

    /// Pixel width of the decoded bitmap.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.bitmap.width()
    }

    /// Pixel height of the decoded bitmap.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.bitmap.height()
    }
}

// ============================================================================
// Session
// ============================================================================

/// State for one interactive session: two slots plus the phase.
///
/// The slots are "current image" and "current result". Last write wins within
/// the session; there is exactly one user acting on one session timeline.
#[derive(Debug, Default)]
pub struct Session {
    phase: SessionPhase,
    image: Option<UploadedImage>,
    latex: Option<String>,
}

impl Session {
    /// Create an empty session in the `Idle` phase.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// The "current image" slot. `None` after reset or before first upload.
    #[must_use]
    pub const fn image(&self) -> Option<&UploadedImage> {
        self.image.as_ref()
    }

    /// The "current result" slot (raw model output, verbatim).
    #[must_use]
    pub fn latex(&self) -> Option<&str> {
        self.latex.as_deref()
    }

    /// Store a newly uploaded image.
    ///
    /// Valid from any phase. Replaces the prior image and clears any prior
    /// result; an extraction in flight for the old image will find the phase
    /// changed and discard its result on completion.
    pub fn load_image(&mut self, image: UploadedImage) {
        if self.phase.is_extracting() {
            warn!("Image replaced while an extraction is in flight; that result will be discarded");
        }
        self.image = Some(image);
        self.latex = None;
        self.phase = SessionPhase::ImageLoaded;
    }

    /// Begin an extraction attempt, returning the image to extract from.
    ///
    /// Valid from `ImageLoaded` and `ResultShown` (re-running is
    /// idempotent-safe). Rejected from `Idle` (nothing to extract) and from
    /// `Extracting` (one call at a time per session). Returning the held
    /// image here is what ties the eventual result to the image that was
    /// active at trigger time.
    pub fn begin_extraction(&mut self) -> Result<&UploadedImage, SessionError> {
        match self.phase {
            SessionPhase::Idle => Err(SessionError::NoImage),
            SessionPhase::Extracting => Err(SessionError::ExtractionInFlight),
            SessionPhase::ImageLoaded | SessionPhase::ResultShown => {
                if self.image.is_none() {
                    return Err(SessionError::NoImage);
                }
                self.phase = SessionPhase::Extracting;
                self.image.as_ref().ok_or(SessionError::NoImage)
            }
        }
    }

    /// Record a successful extraction.
    ///
    /// Writes the result and moves to `ResultShown` only if the session is
    /// still in `Extracting` phase. Otherwise the image was replaced or the
    /// session reset while the call was in flight, and the result is
    /// discarded — a stale result must never be shown against a different
    /// image. Returns whether the result was stored.
    pub fn complete_extraction(&mut self, latex: String) -> bool {
        if !self.phase.is_extracting() {
            warn!("Discarding extraction result: session state changed while the call was in flight");
            return false;
        }
        self.latex = Some(latex);
        self.phase = SessionPhase::ResultShown;
        true
    }

    /// Record a failed extraction.
    ///
    /// Nothing is written; the phase returns to where the attempt started
    /// (`ResultShown` if a prior result survives, else `ImageLoaded`) so the
    /// user can retry. No-op unless an extraction was in flight.
    pub fn fail_extraction(&mut self) {
        if !self.phase.is_extracting() {
            return;
        }
        self.phase = if self.latex.is_some() {
            SessionPhase::ResultShown
        } else {
            SessionPhase::ImageLoaded
        };
    }

    /// Clear both slots and return to `Idle`.
    ///
    /// Idempotent: resetting an already-empty session is not an error.
    /// Subsequent reads behave as "absent".
    pub fn reset(&mut self) {
        self.image = None;
        self.latex = None;
        self.phase = SessionPhase::Idle;
    }
}

// ============================================================================
// Tests
// ============================================================================
