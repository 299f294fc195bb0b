use image::GrayImage;
use imageproc::contrast::{threshold, ThresholdType};

/// Binarize: 255 where the pixel is strictly above `cutoff`, 0 elsewhere
pub fn apply(image: &GrayImage, cutoff: u8) -> GrayImage {
    threshold(image, cutoff, ThresholdType::Binary)
}
