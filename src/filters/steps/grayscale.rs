use image::{DynamicImage, GrayImage, Luma};

// BT.601 luma weights in 14-bit fixed point (sum = 1 << 14).
const WEIGHT_R: u32 = 4899;
const WEIGHT_G: u32 = 9617;
const WEIGHT_B: u32 = 1868;
const SHIFT: u32 = 14;

/// Convert image to single-channel luminance
/// Every later step works on the result of this one
pub fn apply(image: &DynamicImage) -> GrayImage {
    let rgb = image.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        Luma([luma(r, g, b)])
    })
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    let weighted = r as u32 * WEIGHT_R + g as u32 * WEIGHT_G + b as u32 * WEIGHT_B;
    ((weighted + (1 << (SHIFT - 1))) >> SHIFT) as u8
}
