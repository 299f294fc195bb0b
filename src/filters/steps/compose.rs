//! Final rendering of a filtered frame into a 3-channel output raster.

use super::edges::EDGE;
use image::{GrayImage, Rgb, RgbImage};

/// Highlight used for edges drawn over tone bands
pub const EDGE_HIGHLIGHT: Rgb<u8> = Rgb([255, 255, 0]);

/// What ends up in the output image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Composition {
    /// The gray tone buffer
    Tone,
    /// Edge lines drawn on a blank canvas
    EdgeLines,
    /// Tone buffer with edge pixels painted in a highlight color
    ToneWithEdgeHighlight(Rgb<u8>),
}

impl Composition {
    pub fn needs_edges(&self) -> bool {
        !matches!(self, Composition::Tone)
    }
}

/// Output polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Polarity {
    /// Dark marks on light paper: tones as-is, black lines on white
    #[default]
    Ink,
    /// Every gray value inverted; highlight colors are left alone
    Negative,
}

/// Render the tone buffer and optional edge mask into RGB
///
/// Callers guarantee `edges` is present for compositions that need it; a
/// missing mask renders as "no edges".
pub fn render(
    tone: &GrayImage,
    edges: Option<&GrayImage>,
    composition: Composition,
    polarity: Polarity,
) -> RgbImage {
    let is_edge = |x: u32, y: u32| edges.is_some_and(|mask| mask.get_pixel(x, y).0[0] == EDGE);
    let ink = |v: u8| match polarity {
        Polarity::Ink => v,
        Polarity::Negative => 255 - v,
    };

    RgbImage::from_fn(tone.width(), tone.height(), |x, y| match composition {
        Composition::Tone => gray(ink(tone.get_pixel(x, y).0[0])),
        Composition::EdgeLines => {
            if is_edge(x, y) {
                gray(ink(0))
            } else {
                gray(ink(255))
            }
        }
        Composition::ToneWithEdgeHighlight(color) => {
            if is_edge(x, y) {
                color
            } else {
                gray(ink(tone.get_pixel(x, y).0[0]))
            }
        }
    })
}

fn gray(v: u8) -> Rgb<u8> {
    Rgb([v, v, v])
}
