use image::GrayImage;
use imageproc::edges::canny;

/// Mask value for edge pixels
pub const EDGE: u8 = 255;

// Hysteresis compares with >=, so a zero threshold would mark flat regions.
const MIN_THRESHOLD: f32 = 1e-3;

/// Detect edges with hysteresis thresholds `low` and `high`
///
/// Gradient magnitude, non-maximum suppression and double-threshold
/// hysteresis, so the result is thin connected curves. Output is a binary
/// mask: `EDGE` on edges, 0 elsewhere.
pub fn detect(image: &GrayImage, low: f32, high: f32) -> GrayImage {
    let low = low.max(MIN_THRESHOLD);
    let high = high.max(low);
    canny(image, low, high)
}

/// Sketch-style thresholds: low = `threshold`, high = twice that
pub fn thresholds(threshold: u8) -> (f32, f32) {
    let low = threshold as f32;
    (low, low * 2.0)
}
