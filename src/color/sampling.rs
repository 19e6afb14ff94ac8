//! Representative color extraction from a region of interest
//!
//! Extracts a single Lab color from the strip pad:
//! - Clipped and underexposed pixels are discarded as outliers
//! - Remaining channels are averaged independently and rounded
//! - The averaged pixel is converted to Lab (D65)
//!
//! When every pixel is discarded the average falls back to black and
//! `kept_pixels` is zero; the pipeline's kept-ratio gate rejects it.

use serde::{Deserialize, Serialize};

use super::conversion::ColorConverter;
use super::types::{Frame, LabColor, Pixel, Region};
use crate::constants::quality;

/// Sampled color with filter statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorSample {
    /// Representative Lab color
    pub lab: LabColor,
    /// Averaged pixel the Lab color was derived from
    pub mean_pixel: Pixel,
    /// Hex code of `mean_pixel`, for display
    pub hex: String,
    /// Pixels that passed the outlier filter
    pub kept_pixels: u64,
    /// Pixels discarded as clipped or underexposed
    pub rejected_pixels: u64,
}

impl ColorSample {
    /// Fraction of the region that survived filtering
    pub fn kept_ratio(&self) -> f64 {
        let total = self.kept_pixels + self.rejected_pixels;
        if total == 0 {
            0.0
        } else {
            self.kept_pixels as f64 / total as f64
        }
    }
}

/// Color sampler implementing clipped/dark pixel rejection
#[derive(Debug, Clone)]
pub struct ColorSampler {
    converter: ColorConverter,
    saturation_channel_min: u8,
    underexposure_channel_max: u8,
}

impl Default for ColorSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorSampler {
    /// Create a new sampler with the v1 pixel predicates
    pub fn new() -> Self {
        Self::with_params(
            quality::SATURATION_CHANNEL_MIN,
            quality::UNDEREXPOSURE_CHANNEL_MAX,
        )
    }

    /// Create a sampler with custom pixel predicates
    pub fn with_params(saturation_channel_min: u8, underexposure_channel_max: u8) -> Self {
        Self {
            converter: ColorConverter::new(),
            saturation_channel_min,
            underexposure_channel_max,
        }
    }

    /// Sample the region's representative color
    ///
    /// `region` must already have been validated against `frame`.
    pub fn sample(&self, frame: &Frame, region: &Region) -> ColorSample {
        let mut sums = [0u64; 3];
        let mut kept = 0u64;
        let mut rejected = 0u64;

        for pixel in region.pixels(frame) {
            if self.is_outlier(pixel) {
                rejected += 1;
                continue;
            }
            sums[0] += u64::from(pixel.r);
            sums[1] += u64::from(pixel.g);
            sums[2] += u64::from(pixel.b);
            kept += 1;
        }

        let mean_pixel = if kept == 0 {
            Pixel::BLACK
        } else {
            Pixel::new(
                rounded_mean(sums[0], kept),
                rounded_mean(sums[1], kept),
                rounded_mean(sums[2], kept),
            )
        };

        ColorSample {
            lab: self.converter.pixel_to_lab(mean_pixel),
            hex: self.converter.pixel_to_hex(mean_pixel),
            mean_pixel,
            kept_pixels: kept,
            rejected_pixels: rejected,
        }
    }

    fn is_outlier(&self, pixel: Pixel) -> bool {
        pixel.is_saturated(self.saturation_channel_min)
            || pixel.is_underexposed(self.underexposure_channel_max)
    }
}

/// Mean of 8-bit values rounded half away from zero
fn rounded_mean(sum: u64, count: u64) -> u8 {
    let mean = (sum as f64 / count as f64).round();
    mean.clamp(0.0, 255.0) as u8
}
