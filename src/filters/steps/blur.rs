use crate::error::SketchError;
use image::{GrayImage, Luma};

/// Largest kernel the pipeline will run
pub const MAX_KERNEL_SIZE: u32 = 255;

/// Force a kernel size to be odd and at least 1
pub fn normalize_kernel_size(kernel_size: u32) -> u32 {
    if kernel_size == 0 {
        1
    } else if kernel_size % 2 == 0 {
        kernel_size + 1
    } else {
        kernel_size
    }
}

/// Reject kernels above `MAX_KERNEL_SIZE`, returning the odd size that runs
pub fn check_kernel_size(kernel_size: u32) -> Result<u32, SketchError> {
    if kernel_size > MAX_KERNEL_SIZE {
        return Err(SketchError::InvalidParameter(format!(
            "blur kernel must be at most {}, got {}",
            MAX_KERNEL_SIZE, kernel_size
        )));
    }
    Ok(normalize_kernel_size(kernel_size))
}

/// Apply a Gaussian blur with a square `kernel_size` x `kernel_size` window
///
/// Even sizes are bumped to the next odd size. A size of 1 leaves the image
/// untouched. The horizontal pass stays in f32 and borders mirror with
/// reflect-101, neither of which `imageproc::filter::separable_filter` does.
pub fn apply(image: &GrayImage, kernel_size: u32) -> GrayImage {
    let kernel = gaussian_kernel(normalize_kernel_size(kernel_size));
    if kernel.len() == 1 {
        return image.clone();
    }

    let (width, height) = image.dimensions();
    let half = (kernel.len() / 2) as i64;

    // Horizontal pass, kept in f32 until the vertical pass rounds
    let mut temp = vec![0.0f32; (width * height) as usize];
    for y in 0..height {
        for x in 0..width {
            let mut sum = 0.0f32;
            for (ki, &kv) in kernel.iter().enumerate() {
                let sx = reflect_101(x as i64 + ki as i64 - half, width);
                sum += image.get_pixel(sx, y).0[0] as f32 * kv;
            }
            temp[(y * width + x) as usize] = sum;
        }
    }

    // Vertical pass
    GrayImage::from_fn(width, height, |x, y| {
        let mut sum = 0.0f32;
        for (ki, &kv) in kernel.iter().enumerate() {
            let sy = reflect_101(y as i64 + ki as i64 - half, height);
            sum += temp[(sy * width + x) as usize] * kv;
        }
        Luma([sum.round().clamp(0.0, 255.0) as u8])
    })
}

/// Normalized 1D Gaussian weights for an odd kernel size
///
/// Small sizes use the fixed binomial-style tables; larger sizes derive
/// sigma from the size.
fn gaussian_kernel(size: u32) -> Vec<f32> {
    match size {
        1 => vec![1.0],
        3 => vec![0.25, 0.5, 0.25],
        5 => vec![0.0625, 0.25, 0.375, 0.25, 0.0625],
        7 => vec![
            0.03125, 0.109375, 0.21875, 0.28125, 0.21875, 0.109375, 0.03125,
        ],
        _ => {
            let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
            let half = (size / 2) as i32;
            let weights: Vec<f32> = (-half..=half)
                .map(|i| (-((i * i) as f32) / (2.0 * sigma * sigma)).exp())
                .collect();
            let total: f32 = weights.iter().sum();
            weights.into_iter().map(|w| w / total).collect()
        }
    }
}

/// Mirror an out-of-range index without repeating the border pixel
fn reflect_101(index: i64, len: u32) -> u32 {
    let len = len as i64;
    if len == 1 {
        return 0;
    }
    let mut i = index;
    while i < 0 || i >= len {
        if i < 0 {
            i = -i;
        }
        if i >= len {
            i = 2 * len - 2 - i;
        }
    }
    i as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noisy_image() -> GrayImage {
        GrayImage::from_fn(24, 16, |x, y| Luma([((x * 97 + y * 61) % 256) as u8]))
    }

    #[test]
    fn test_even_kernel_is_bumped_to_odd() {
        assert_eq!(normalize_kernel_size(0), 1);
        assert_eq!(normalize_kernel_size(4), 5);
        assert_eq!(normalize_kernel_size(5), 5);
        assert_eq!(normalize_kernel_size(20), 21);
    }

    #[test]
    fn test_oversized_kernel_is_rejected() {
        assert_eq!(check_kernel_size(254).unwrap(), 255);
        assert!(matches!(
            check_kernel_size(4_000_000_000),
            Err(SketchError::InvalidParameter(_))
        ));
        assert!(check_kernel_size(MAX_KERNEL_SIZE + 1).is_err());
    }

    #[test]
    fn test_blur_four_matches_blur_five() {
        let img = noisy_image();
        assert_eq!(apply(&img, 4), apply(&img, 5));
    }

    #[test]
    fn test_blur_keeps_uniform_image() {
        let img = GrayImage::from_pixel(12, 12, Luma([130]));
        for size in [3, 5, 9, 21] {
            let result = apply(&img, size);
            assert!(result.pixels().all(|p| p.0[0] == 130), "size {}", size);
        }
    }

    #[test]
    fn test_blur_size_one_is_identity() {
        let img = noisy_image();
        assert_eq!(apply(&img, 1), img);
    }

    #[test]
    fn test_blur_reduces_variance() {
        let img = noisy_image();
        let result = apply(&img, 7);
        assert!(variance(&result) < variance(&img));
    }

    #[test]
    fn test_kernels_are_normalized() {
        for size in [1, 3, 5, 7, 9, 15, 21] {
            let kernel = gaussian_kernel(size);
            assert_eq!(kernel.len(), size as usize);
            let total: f32 = kernel.iter().sum();
            assert!((total - 1.0).abs() < 1e-5, "size {} sums to {}", size, total);
        }
    }

    #[test]
    fn test_reflect_101_mirrors_borders() {
        assert_eq!(reflect_101(-1, 5), 1);
        assert_eq!(reflect_101(-2, 5), 2);
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(6, 5), 2);
        assert_eq!(reflect_101(3, 1), 0);
    }

    #[test]
    fn test_blur_handles_kernel_wider_than_image() {
        let img = GrayImage::from_fn(3, 2, |x, _| Luma([(x * 100) as u8]));
        let result = apply(&img, 21);
        assert_eq!(result.dimensions(), (3, 2));
    }

    fn variance(img: &GrayImage) -> f64 {
        let pixels: Vec<f64> = img.pixels().map(|p| p.0[0] as f64).collect();
        let mean = pixels.iter().sum::<f64>() / pixels.len() as f64;
        pixels.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / pixels.len() as f64
    }
}
