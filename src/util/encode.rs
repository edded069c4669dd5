//! Image encoding for terminal captures
//!
//! Captures are always returned as PNG: terminal text is mostly flat colour
//! and sharp glyph edges, which lossless compression handles well.
//!
//! # Examples
//!
//! ```
//! use pwsh_mcp::{automation::ImageBuffer, util::encode::{encode_png, to_base64}};
//!
//! let img = ImageBuffer::from_test_pattern(64, 32);
//! let png = encode_png(&img).unwrap();
//! assert!(to_base64(&png).starts_with("iVBORw0KGgo"));
//! ```

use std::io::Cursor;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::{
    ImageEncoder,
    codecs::png::{CompressionType, FilterType, PngEncoder},
};

use crate::{
    automation::ImageBuffer,
    error::{ToolError, ToolResult},
};

/// MIME type of encoded captures
pub const PNG_MIME_TYPE: &str = "image/png";

/// Encodes an image as PNG with default compression
///
/// Uses adaptive filtering, which picks a filter per scanline.
pub fn encode_png(buffer: &ImageBuffer) -> ToolResult<Vec<u8>> {
    encode_png_with_compression(buffer, CompressionType::Default)
}

/// Encodes an image as PNG with the given compression level
pub fn encode_png_with_compression(
    buffer: &ImageBuffer,
    compression: CompressionType,
) -> ToolResult<Vec<u8>> {
    let mut output = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(Cursor::new(&mut output), compression, FilterType::Adaptive);

    let rgba = buffer.to_rgba8();
    let (width, height) = rgba.dimensions();

    encoder
        .write_image(rgba.as_raw(), width, height, image::ExtendedColorType::Rgba8)
        .map_err(|e| ToolError::Encoding {
            reason: e.to_string(),
        })?;

    tracing::debug!("Encoded {}x{} capture as {} PNG bytes", width, height, output.len());
    Ok(output)
}

/// Standard (padded) base64 of `bytes`
pub fn to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}
