//! Raster decode/encode at the edges of the filter pipeline.
//!
//! Output is always PNG: posterized bands and edge lines have to stay
//! pixel-exact, so no lossy format is ever produced here.

use crate::error::SketchError;
use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;

/// Decode uploaded bytes (PNG, JPEG, GIF, BMP, WebP, TIFF, ...) into a raster
pub fn decode(data: &[u8]) -> Result<DynamicImage, SketchError> {
    if data.is_empty() {
        return Err(SketchError::InvalidImage("empty upload".to_string()));
    }

    image::load_from_memory(data).map_err(|e| SketchError::InvalidImage(e.to_string()))
}

/// Encode an output raster as PNG bytes
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, SketchError> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| SketchError::ProcessingError(format!("Failed to encode PNG: {}", e)))?;
    Ok(buffer.into_inner())
}
