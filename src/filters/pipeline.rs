use crate::error::SketchError;
use image::{DynamicImage, GrayImage, RgbImage};
use serde::Serialize;
use std::time::Instant;

use super::presets::Preset;
use super::steps;
use super::steps::compose::{Composition, Polarity};

/// One named step of the canonical sketch pipeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stage {
    Grayscale,
    Blur { kernel_size: u32 },
    Posterize { levels: u32 },
    DetectEdges { low: f32, high: f32 },
    Threshold { cutoff: u8 },
    Compose {
        composition: Composition,
        polarity: Polarity,
    },
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Grayscale => "grayscale",
            Stage::Blur { .. } => "blur",
            Stage::Posterize { .. } => "posterize",
            Stage::DetectEdges { .. } => "edges",
            Stage::Threshold { .. } => "threshold",
            Stage::Compose { .. } => "compose",
        }
    }
}

/// Timing information for a single pipeline stage
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// Result of running a pipeline including timing stats
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    /// Rendered image (not serialized)
    #[serde(skip)]
    pub image: RgbImage,
    /// Total pipeline time in milliseconds
    pub total_time_ms: u64,
    /// Individual stage timings
    pub steps: Vec<StepTiming>,
}

/// Working state threaded through the stages
struct Frame {
    tone: GrayImage,
    edges: Option<GrayImage>,
}

/// Ordered, validated list of stages
#[derive(Debug, Clone)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Validate stage order: grayscale first and only once, compose last,
    /// edge compositions after an edge detection stage.
    pub fn new(stages: Vec<Stage>) -> Result<Self, SketchError> {
        if stages.first() != Some(&Stage::Grayscale) {
            return Err(SketchError::InvalidParameter(
                "pipeline must start with grayscale".to_string(),
            ));
        }

        let mut has_edges = false;
        for (i, stage) in stages.iter().enumerate().skip(1) {
            match stage {
                Stage::Grayscale => {
                    return Err(SketchError::InvalidParameter(
                        "grayscale may only appear once".to_string(),
                    ))
                }
                Stage::DetectEdges { .. } => has_edges = true,
                Stage::Compose { composition, .. } => {
                    if i != stages.len() - 1 {
                        return Err(SketchError::InvalidParameter(
                            "compose must be the last stage".to_string(),
                        ));
                    }
                    if composition.needs_edges() && !has_edges {
                        return Err(SketchError::InvalidParameter(format!(
                            "{:?} needs an edge detection stage",
                            composition
                        )));
                    }
                }
                Stage::Posterize { levels } => {
                    steps::posterize::band_width(*levels)?;
                }
                Stage::Blur { kernel_size } => {
                    steps::blur::check_kernel_size(*kernel_size)?;
                }
                Stage::Threshold { .. } => {}
            }
        }

        Ok(Self { stages })
    }

    /// Build the stage list for a preset
    pub fn from_preset(preset: &Preset) -> Result<Self, SketchError> {
        Self::new(preset.stages())
    }

    /// Run every stage over the image and render the output raster
    pub fn process(&self, image: &DynamicImage) -> Result<PipelineResult, SketchError> {
        let start = Instant::now();
        let mut timings = Vec::with_capacity(self.stages.len());

        // Stage 0 is always grayscale (checked in `new`)
        let tone = self.run_step(Stage::Grayscale, &mut timings, || {
            Ok(steps::grayscale::apply(image))
        })?;
        let mut frame = Frame { tone, edges: None };
        let mut output = None;

        for &stage in &self.stages[1..] {
            match stage {
                // Only valid as stage 0
                Stage::Grayscale => {}
                Stage::Blur { kernel_size } => {
                    frame.tone = self.run_step(stage, &mut timings, || {
                        Ok(steps::blur::apply(&frame.tone, kernel_size))
                    })?;
                }
                Stage::Posterize { levels } => {
                    frame.tone = self.run_step(stage, &mut timings, || {
                        steps::posterize::apply(&frame.tone, levels)
                    })?;
                }
                Stage::DetectEdges { low, high } => {
                    let mask = self.run_step(stage, &mut timings, || {
                        Ok(steps::edges::detect(&frame.tone, low, high))
                    })?;
                    frame.edges = Some(mask);
                }
                Stage::Threshold { cutoff } => {
                    frame.tone = self.run_step(stage, &mut timings, || {
                        Ok(steps::threshold::apply(&frame.tone, cutoff))
                    })?;
                }
                Stage::Compose {
                    composition,
                    polarity,
                } => {
                    let rendered = self.run_step(stage, &mut timings, || {
                        Ok(steps::compose::render(
                            &frame.tone,
                            frame.edges.as_ref(),
                            composition,
                            polarity,
                        ))
                    })?;
                    output = Some(rendered);
                }
            }
        }

        let image = output.unwrap_or_else(|| {
            steps::compose::render(&frame.tone, None, Composition::Tone, Polarity::Ink)
        });

        Ok(PipelineResult {
            image,
            total_time_ms: start.elapsed().as_millis() as u64,
            steps: timings,
        })
    }

    fn run_step<T, F>(
        &self,
        stage: Stage,
        timings: &mut Vec<StepTiming>,
        step_fn: F,
    ) -> Result<T, SketchError>
    where
        F: FnOnce() -> Result<T, SketchError>,
    {
        let step_start = Instant::now();
        let result = step_fn()?;
        let elapsed = step_start.elapsed();
        tracing::debug!(?stage, "{} took {:?}", stage.name(), elapsed);
        timings.push(StepTiming {
            name: stage.name().to_string(),
            time_ms: elapsed.as_millis() as u64,
        });
        Ok(result)
    }
}
