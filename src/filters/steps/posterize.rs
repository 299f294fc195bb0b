use crate::error::SketchError;
use image::{GrayImage, Luma};

pub const MIN_LEVELS: u32 = 2;
pub const MAX_LEVELS: u32 = 256;

/// Quantize gray values into `levels` evenly spaced bands anchored at 0
///
/// Each band maps to one pencil grade, lightest to darkest. The band width is
/// `256 / levels` (floor division), so every output value is a multiple of it.
pub fn apply(image: &GrayImage, levels: u32) -> Result<GrayImage, SketchError> {
    let factor = band_width(levels)?;
    let mut output = image.clone();
    for pixel in output.pixels_mut() {
        let v = pixel.0[0] as u32;
        *pixel = Luma([((v / factor) * factor) as u8]);
    }
    Ok(output)
}

/// Width of one tone band for the given level count
pub fn band_width(levels: u32) -> Result<u32, SketchError> {
    if !(MIN_LEVELS..=MAX_LEVELS).contains(&levels) {
        return Err(SketchError::InvalidParameter(format!(
            "levels must be between {} and {}, got {}",
            MIN_LEVELS, MAX_LEVELS, levels
        )));
    }
    Ok(256 / levels)
}
