//! Individual filter steps

pub mod blur;
pub mod compose;
pub mod edges;
pub mod grayscale;
pub mod posterize;
pub mod threshold;
