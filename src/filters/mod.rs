//! Sketch filter pipeline
//!
//! Grayscale, blur, posterize, threshold and edge stages composed into a
//! black-and-white drawing reference.

pub mod pipeline;
pub mod presets;
pub mod steps;

pub use pipeline::{Pipeline, StepTiming};
pub use presets::{CompositeConfig, EdgeStyle, FilterType, Mode, Preset, SingleFilterConfig};

use crate::codec;
use crate::error::SketchError;

/// PNG output of one processing request
#[derive(Debug, Clone)]
pub struct RenderedImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub total_time_ms: u64,
    pub steps: Vec<StepTiming>,
}

/// Decode `data`, run the preset's stages and encode the result as PNG
pub fn render_png(data: &[u8], preset: &Preset) -> Result<RenderedImage, SketchError> {
    let pipeline = Pipeline::from_preset(preset)?;
    let image = codec::decode(data)?;
    let result = pipeline.process(&image)?;
    let png = codec::encode_png(&result.image)?;

    tracing::debug!(
        preset = preset.name(),
        width = result.image.width(),
        height = result.image.height(),
        "Rendered sketch in {}ms",
        result.total_time_ms
    );

    Ok(RenderedImage {
        png,
        width: result.image.width(),
        height: result.image.height(),
        total_time_ms: result.total_time_ms,
        steps: result.steps,
    })
}
