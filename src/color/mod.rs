//! Color model, conversion, difference metrics and sampling
//!
//! This module holds the pixel/frame/region primitives, the reference
//! sRGB → Lab conversion, ΔE metrics and the region color sampler.

pub mod types;
pub mod conversion;
pub mod difference;
pub mod sampling;

pub use types::{Frame, LabColor, Pixel, Region};
pub use conversion::{srgb_to_lab, ColorConverter};
pub use difference::{delta_e2000, delta_e76};
pub use sampling::{ColorSample, ColorSampler};
