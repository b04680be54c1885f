//! Image encoding: `DynamicImage` → base64 PNG data URI.
//!
//! Vision APIs accept images as base64 data-URIs embedded in the JSON request
//! body. PNG is used regardless of the upload format because it is lossless —
//! glyph crispness matters far more than payload size when the model has to
//! read subscripts and exponents.

use crate::error::Img2TexError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// A base64-encoded image payload ready for the request body.
///
/// Ephemeral: computed at extraction time from the currently held bitmap and
/// never stored in session state.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    /// Base64 payload (standard alphabet, padded).
    pub base64: String,
    /// Declared MIME type of the encoded bytes.
    pub mime_type: &'static str,
}

impl EncodedImage {
    /// Compose the `data:<mime>;base64,<payload>` string carried in the
    /// request's `image_url` block.
    #[must_use]
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

/// Encode a bitmap as a base64 PNG ready for the vision API.
///
/// Deterministic for identical pixel input. Fails with
/// [`Img2TexError::EncodeFailed`] only on internal I/O failure, which is
/// unexpected and not retried.
pub fn encode_image(img: &DynamicImage) -> Result<EncodedImage, Img2TexError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| Img2TexError::EncodeFailed {
            detail: e.to_string(),
        })?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded image → {} bytes base64", b64.len());

    Ok(EncodedImage {
        base64: b64,
        mime_type: "image/png",
    })
}
