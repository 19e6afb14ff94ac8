//! Color space conversion utilities
//!
//! Provides the reference sRGB → CIE L*a*b* (D65) conversion used by the
//! whole pipeline, plus interop with the `palette` crate for display
//! representations (LCh, hex).
//!
//! The conversion is written out step by step with fixed constants so that
//! the same pixel always yields bit-identical Lab values on every platform
//! that implements IEEE 754 `powf`/`cbrt` the same way.

use palette::white_point::D65;
use palette::{FromColor, Lab, Lch};

use super::types::{LabColor, Pixel};
use crate::constants::{lab, srgb, D65_WHITE_POINT_XYZ};

/// Color converter anchored to the D65 white point
#[derive(Debug, Clone, Copy)]
pub struct ColorConverter {
    white_point: [f64; 3],
}

impl Default for ColorConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorConverter {
    /// Create a new color converter with D65 as reference white
    pub fn new() -> Self {
        Self {
            white_point: D65_WHITE_POINT_XYZ,
        }
    }

    /// Convert an 8-bit sRGB pixel to Lab
    pub fn pixel_to_lab(&self, pixel: Pixel) -> LabColor {
        self.rgb_to_lab(pixel.r, pixel.g, pixel.b)
    }

    /// Convert RGB (0-255) to Lab color space
    pub fn rgb_to_lab(&self, r: u8, g: u8, b: u8) -> LabColor {
        let linear = [
            srgb_to_linear(f64::from(r) / 255.0),
            srgb_to_linear(f64::from(g) / 255.0),
            srgb_to_linear(f64::from(b) / 255.0),
        ];

        let m = &srgb::TO_XYZ;
        let xyz = [
            m[0][0] * linear[0] + m[0][1] * linear[1] + m[0][2] * linear[2],
            m[1][0] * linear[0] + m[1][1] * linear[1] + m[1][2] * linear[2],
            m[2][0] * linear[0] + m[2][1] * linear[1] + m[2][2] * linear[2],
        ];

        let fx = lab_f(xyz[0] / self.white_point[0]);
        let fy = lab_f(xyz[1] / self.white_point[1]);
        let fz = lab_f(xyz[2] / self.white_point[2]);

        LabColor::new(116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz))
    }

    /// Convert Lab to LCh (cylindrical representation)
    pub fn lab_to_lch(&self, lab: LabColor) -> Lch<D65, f64> {
        Lch::from_color(Lab::<D65, f64>::from(lab))
    }

    /// Hex representation of a pixel (e.g., "#D29E60")
    pub fn pixel_to_hex(&self, pixel: Pixel) -> String {
        format!("#{:02X}{:02X}{:02X}", pixel.r, pixel.g, pixel.b)
    }
}

/// Inverse sRGB companding
fn srgb_to_linear(c: f64) -> f64 {
    if c <= srgb::LINEAR_THRESHOLD {
        c / srgb::LINEAR_SLOPE
    } else {
        ((c + 0.055) / 1.055).powf(srgb::GAMMA)
    }
}

/// CIE Lab companding function
fn lab_f(t: f64) -> f64 {
    if t > lab::EPSILON {
        t.cbrt()
    } else {
        (lab::KAPPA * t + 16.0) / 116.0
    }
}

/// Convert a pixel to Lab with the default D65 converter
pub fn srgb_to_lab(pixel: Pixel) -> LabColor {
    ColorConverter::new().pixel_to_lab(pixel)
}

impl From<LabColor> for Lab<D65, f64> {
    fn from(color: LabColor) -> Self {
        Lab::new(color.l, color.a, color.b)
    }
}

impl From<Lab<D65, f64>> for LabColor {
    fn from(color: Lab<D65, f64>) -> Self {
        LabColor::new(color.l, color.a, color.b)
    }
}
