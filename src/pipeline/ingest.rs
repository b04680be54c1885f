//! Image ingestion: uploaded bytes → decoded bitmap.
//!
//! Validation happens before any state changes: the format is sniffed from
//! magic bytes (never trusted from the filename), and only PNG and JPEG are
//! accepted. A failed decode leaves the caller's session untouched — the
//! decoded bitmap is returned to the caller, which stores it.

use crate::error::Img2TexError;
use image::{DynamicImage, ImageFormat};
use tracing::debug;

/// Filename extensions accepted by the upload surface.
const SUPPORTED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Whether a filename carries a supported image extension.
#[must_use]
pub fn supported_extension(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Reject filenames without a png/jpg/jpeg extension.
pub fn ensure_supported_filename(name: &str) -> Result<(), Img2TexError> {
    if supported_extension(name) {
        Ok(())
    } else {
        Err(Img2TexError::UnsupportedFormat {
            name: name.to_string(),
        })
    }
}

/// Sniff the image format from magic bytes; PNG and JPEG only.
fn sniff_format(bytes: &[u8]) -> Result<ImageFormat, Img2TexError> {
    let format = image::guess_format(bytes).map_err(|e| Img2TexError::DecodeFailed {
        detail: e.to_string(),
    })?;
    match format {
        ImageFormat::Png | ImageFormat::Jpeg => Ok(format),
        other => Err(Img2TexError::DecodeFailed {
            detail: format!("unsupported image format {other:?}"),
        }),
    }
}

/// The MIME type of the uploaded bytes, for serving the image back to the UI.
pub fn image_mime(bytes: &[u8]) -> Result<&'static str, Img2TexError> {
    match sniff_format(bytes)? {
        ImageFormat::Png => Ok("image/png"),
        // sniff_format admits exactly two formats
        _ => Ok("image/jpeg"),
    }
}

/// Decode uploaded bytes into an in-memory bitmap.
///
/// Fails with [`Img2TexError::DecodeFailed`] when the bytes are not a valid
/// PNG or JPEG image. No side effects.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, Img2TexError> {
    let format = sniff_format(bytes)?;
    let bitmap = image::load_from_memory_with_format(bytes, format).map_err(|e| {
        Img2TexError::DecodeFailed {
            detail: e.to_string(),
        }
    })?;
    debug!(
        "Decoded {:?} image: {}x{}",
        format,
        bitmap.width(),
        bitmap.height()
    );
    Ok(bitmap)
}
