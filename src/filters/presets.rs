//! The two request shapes the service accepts, translated into stage lists.
//!
//! Composite requests carry several parameters and always posterize; single
//! filter requests name one filter and one numeric parameter.

use crate::error::SketchError;
use std::str::FromStr;

use super::pipeline::Stage;
use super::steps::compose::{Composition, Polarity, EDGE_HIGHLIGHT};
use super::steps::{blur, edges};

/// Level range accepted by single-filter posterize
pub const SINGLE_LEVELS_RANGE: (i64, i64) = (2, 8);
/// Kernel range accepted by single-filter blur
pub const SINGLE_BLUR_RANGE: (i64, i64) = (1, 21);
/// Kernel applied before edge detection by `EdgeStyle::Smoothed`
pub const SMOOTHED_EDGE_KERNEL: u32 = 5;

/// Output mode of a composite request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Posterize,
    Edges,
    Both,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Posterize, Mode::Edges, Mode::Both];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Posterize => "posterize",
            Self::Edges => "edges",
            Self::Both => "both",
        }
    }
}

impl FromStr for Mode {
    type Err = SketchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "posterize" => Ok(Self::Posterize),
            "edges" => Ok(Self::Edges),
            "both" => Ok(Self::Both),
            _ => Err(SketchError::InvalidFilterType(s.to_string())),
        }
    }
}

/// Multi-parameter request: grayscale, optional blur, posterize, then render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeConfig {
    pub levels: u32,
    /// Blur kernel size, 0 disables blurring
    pub blur_radius: u32,
    pub threshold: u8,
    pub mode: Mode,
    /// Ink-on-white output when set, negative otherwise
    pub invert: bool,
}

impl Default for CompositeConfig {
    fn default() -> Self {
        Self {
            levels: 4,
            blur_radius: 5,
            threshold: 100,
            mode: Mode::Posterize,
            invert: true,
        }
    }
}

impl CompositeConfig {
    /// Validate raw request values. Nothing is clamped here.
    pub fn from_raw(
        levels: i64,
        blur_radius: i64,
        threshold: i64,
        mode: &str,
        invert: bool,
    ) -> Result<Self, SketchError> {
        let mode = mode.parse()?;

        let levels = u32::try_from(levels)
            .ok()
            .filter(|l| (2..=256).contains(l))
            .ok_or_else(|| {
                SketchError::InvalidParameter(format!(
                    "levels must be between 2 and 256, got {}",
                    levels
                ))
            })?;

        let blur_radius = u32::try_from(blur_radius)
            .ok()
            .filter(|r| *r <= blur::MAX_KERNEL_SIZE)
            .ok_or_else(|| {
                SketchError::InvalidParameter(format!(
                    "blur_radius must be between 0 and {}, got {}",
                    blur::MAX_KERNEL_SIZE,
                    blur_radius
                ))
            })?;

        let threshold = u8::try_from(threshold).map_err(|_| {
            SketchError::InvalidParameter(format!(
                "threshold must be between 0 and 255, got {}",
                threshold
            ))
        })?;

        Ok(Self {
            levels,
            blur_radius,
            threshold,
            mode,
            invert,
        })
    }

    pub fn stages(&self) -> Vec<Stage> {
        let mut stages = vec![Stage::Grayscale];

        if self.blur_radius > 0 {
            stages.push(Stage::Blur {
                kernel_size: blur::normalize_kernel_size(self.blur_radius),
            });
        }

        stages.push(Stage::Posterize {
            levels: self.levels,
        });

        let composition = match self.mode {
            Mode::Posterize => Composition::Tone,
            Mode::Edges => Composition::EdgeLines,
            Mode::Both => Composition::ToneWithEdgeHighlight(EDGE_HIGHLIGHT),
        };

        if composition.needs_edges() {
            let (low, high) = edges::thresholds(self.threshold);
            stages.push(Stage::DetectEdges { low, high });
        }

        stages.push(Stage::Compose {
            composition,
            polarity: if self.invert {
                Polarity::Ink
            } else {
                Polarity::Negative
            },
        });

        stages
    }
}

/// Filter named by a single-filter request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    Posterize,
    Edges,
    Blur,
    Threshold,
}

impl FilterType {
    pub const ALL: [FilterType; 4] = [
        FilterType::Posterize,
        FilterType::Edges,
        FilterType::Blur,
        FilterType::Threshold,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Posterize => "posterize",
            Self::Edges => "edges",
            Self::Blur => "blur",
            Self::Threshold => "threshold",
        }
    }
}

impl FromStr for FilterType {
    type Err = SketchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "posterize" => Ok(Self::Posterize),
            "edges" => Ok(Self::Edges),
            "blur" => Ok(Self::Blur),
            "threshold" => Ok(Self::Threshold),
            _ => Err(SketchError::InvalidFilterType(s.to_string())),
        }
    }
}

/// How single-filter edges are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeStyle {
    /// Edges of the unblurred gray image painted black on white
    #[default]
    Painted,
    /// 5x5 blur before detection, then the inverted mask
    Smoothed,
}

impl EdgeStyle {
    pub const ALL: [EdgeStyle; 2] = [EdgeStyle::Painted, EdgeStyle::Smoothed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Painted => "painted",
            Self::Smoothed => "smoothed",
        }
    }
}

impl FromStr for EdgeStyle {
    type Err = SketchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "painted" => Ok(Self::Painted),
            "smoothed" => Ok(Self::Smoothed),
            other => Err(SketchError::InvalidParameter(format!(
                "edge_style must be 'painted' or 'smoothed', got '{}'",
                other
            ))),
        }
    }
}

/// One filter, one parameter; out-of-range values are clamped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleFilterConfig {
    pub filter: FilterType,
    pub param_value: i64,
    pub edge_style: EdgeStyle,
}

impl Default for SingleFilterConfig {
    fn default() -> Self {
        Self::new(FilterType::Posterize, 4)
    }
}

impl SingleFilterConfig {
    pub fn new(filter: FilterType, param_value: i64) -> Self {
        Self {
            filter,
            param_value,
            edge_style: EdgeStyle::default(),
        }
    }

    pub fn with_edge_style(mut self, edge_style: EdgeStyle) -> Self {
        self.edge_style = edge_style;
        self
    }

    fn clamped(&self, (min, max): (i64, i64)) -> i64 {
        self.param_value.clamp(min, max)
    }

    fn byte_param(&self) -> u8 {
        self.clamped((0, 255)) as u8
    }

    pub fn stages(&self) -> Vec<Stage> {
        let mut stages = vec![Stage::Grayscale];

        let composition = match self.filter {
            FilterType::Posterize => {
                stages.push(Stage::Posterize {
                    levels: self.clamped(SINGLE_LEVELS_RANGE) as u32,
                });
                Composition::Tone
            }
            FilterType::Edges => {
                if self.edge_style == EdgeStyle::Smoothed {
                    stages.push(Stage::Blur {
                        kernel_size: SMOOTHED_EDGE_KERNEL,
                    });
                }
                let (low, high) = edges::thresholds(self.byte_param());
                stages.push(Stage::DetectEdges { low, high });
                Composition::EdgeLines
            }
            FilterType::Blur => {
                stages.push(Stage::Blur {
                    kernel_size: blur::normalize_kernel_size(
                        self.clamped(SINGLE_BLUR_RANGE) as u32,
                    ),
                });
                Composition::Tone
            }
            FilterType::Threshold => {
                stages.push(Stage::Threshold {
                    cutoff: self.byte_param(),
                });
                Composition::Tone
            }
        };

        stages.push(Stage::Compose {
            composition,
            polarity: Polarity::Ink,
        });

        stages
    }
}

/// Either request shape, ready to become a `Pipeline`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preset {
    Composite(CompositeConfig),
    SingleFilter(SingleFilterConfig),
}

impl Preset {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Composite(_) => "composite",
            Self::SingleFilter(_) => "single-filter",
        }
    }

    pub fn stages(&self) -> Vec<Stage> {
        match self {
            Self::Composite(config) => config.stages(),
            Self::SingleFilter(config) => config.stages(),
        }
    }
}
