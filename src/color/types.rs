//! Pixel, frame, region and Lab primitives
//!
//! Frames are always fully validated on construction; regions are plain
//! values that are checked against a frame before any sampling.

use serde::{Deserialize, Serialize};

use crate::{AnalysisError, Result};

/// 8-bit sRGB pixel without alpha
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Pixel {
    /// Pure black, the sampler's fallback when every pixel was discarded
    pub const BLACK: Pixel = Pixel::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Rec. 709 weighted luminance on the encoded 0-255 scale
    pub fn relative_luminance(&self) -> f64 {
        0.2126 * f64::from(self.r) + 0.7152 * f64::from(self.g) + 0.0722 * f64::from(self.b)
    }

    /// True if any channel is at or above `threshold`
    pub fn is_saturated(&self, threshold: u8) -> bool {
        self.r >= threshold || self.g >= threshold || self.b >= threshold
    }

    /// True if every channel is at or below `threshold`
    pub fn is_underexposed(&self, threshold: u8) -> bool {
        self.r <= threshold && self.g <= threshold && self.b <= threshold
    }
}

/// Row-major RGB frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<Pixel>,
}

impl Frame {
    /// Create a frame, failing unless `pixels.len() == width * height` and
    /// both dimensions are positive
    pub fn new(width: u32, height: u32, pixels: Vec<Pixel>) -> Result<Self> {
        if width == 0 {
            return Err(AnalysisError::invalid_parameter("frame.width", width));
        }
        if height == 0 {
            return Err(AnalysisError::invalid_parameter("frame.height", height));
        }

        let expected = u64::from(width) * u64::from(height);
        if pixels.len() as u64 != expected {
            return Err(AnalysisError::invalid_parameter(
                "frame.pixels",
                format!("{} pixels for a {}x{} frame", pixels.len(), width, height),
            ));
        }

        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Frame filled with a single color
    pub fn uniform(width: u32, height: u32, pixel: Pixel) -> Result<Self> {
        let count = (u64::from(width) * u64::from(height)) as usize;
        Self::new(width, height, vec![pixel; count])
    }

    /// Build a frame from an interleaved RGB8 buffer
    pub fn from_rgb8(width: u32, height: u32, raw: &[u8]) -> Result<Self> {
        if raw.len() % 3 != 0 {
            return Err(AnalysisError::invalid_parameter(
                "frame.raw",
                format!("{} bytes is not a whole number of RGB pixels", raw.len()),
            ));
        }

        let pixels = raw
            .chunks_exact(3)
            .map(|px| Pixel::new(px[0], px[1], px[2]))
            .collect();
        Self::new(width, height, pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    /// Pixel at column `x`, row `y`
    pub fn pixel(&self, x: u32, y: u32) -> Option<Pixel> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y as usize * self.width as usize + x as usize;
        self.pixels.get(idx).copied()
    }

    /// Length of the shorter side
    pub fn shorter_side(&self) -> u32 {
        self.width.min(self.height)
    }
}

/// Rectangular region of interest in frame coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    /// Create a region with positive dimensions
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(AnalysisError::invalid_parameter(
                "region.size",
                format!("{}x{}", width, height),
            ));
        }
        Ok(Self {
            x,
            y,
            width,
            height,
        })
    }

    /// Number of pixels covered
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Exclusive right edge
    pub fn right(&self) -> u64 {
        u64::from(self.x) + u64::from(self.width)
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> u64 {
        u64::from(self.y) + u64::from(self.height)
    }

    /// True if the region is non-empty and fully contained in `frame`
    pub fn fits_within(&self, frame: &Frame) -> bool {
        self.width > 0
            && self.height > 0
            && self.right() <= u64::from(frame.width())
            && self.bottom() <= u64::from(frame.height())
    }

    /// Fail with an invalid-input error unless the region fits `frame`
    pub fn validate_against(&self, frame: &Frame) -> Result<()> {
        if self.fits_within(frame) {
            Ok(())
        } else {
            Err(AnalysisError::invalid_parameter(
                "region",
                format!(
                    "({}, {}, {}x{}) outside {}x{} frame",
                    self.x,
                    self.y,
                    self.width,
                    self.height,
                    frame.width(),
                    frame.height()
                ),
            ))
        }
    }

    /// Iterate the region's pixels in row-major order
    ///
    /// The region must already have been validated against `frame`.
    pub fn pixels<'a>(&self, frame: &'a Frame) -> impl Iterator<Item = Pixel> + 'a {
        let region = *self;
        let stride = frame.width() as usize;
        (region.y..region.y + region.height).flat_map(move |row| {
            let start = row as usize * stride + region.x as usize;
            frame.pixels()[start..start + region.width as usize]
                .iter()
                .copied()
        })
    }
}

/// CIE L*a*b* color (D65)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabColor {
    pub l: f64,
    pub a: f64,
    pub b: f64,
}

impl LabColor {
    pub const fn new(l: f64, a: f64, b: f64) -> Self {
        Self { l, a, b }
    }

    /// Chroma C*ab
    pub fn chroma(&self) -> f64 {
        self.a.hypot(self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_rejects_pixel_count_mismatch() {
        let result = Frame::new(2, 2, vec![Pixel::BLACK; 3]);
        assert!(matches!(result, Err(AnalysisError::InvalidParameter { .. })));
    }

    #[test]
    fn test_frame_rejects_zero_dimensions() {
        assert!(Frame::new(0, 2, vec![]).is_err());
        assert!(Frame::new(2, 0, vec![]).is_err());
    }

    #[test]
    fn test_frame_row_major_access() {
        let pixels = (0..6).map(|i| Pixel::new(i, 0, 0)).collect();
        let frame = Frame::new(3, 2, pixels).unwrap();
        assert_eq!(frame.pixel(0, 0), Some(Pixel::new(0, 0, 0)));
        assert_eq!(frame.pixel(2, 0), Some(Pixel::new(2, 0, 0)));
        assert_eq!(frame.pixel(0, 1), Some(Pixel::new(3, 0, 0)));
        assert_eq!(frame.pixel(3, 0), None);
    }

    #[test]
    fn test_from_rgb8() {
        let frame = Frame::from_rgb8(2, 1, &[255, 0, 0, 0, 0, 255]).unwrap();
        assert_eq!(frame.pixel(0, 0), Some(Pixel::new(255, 0, 0)));
        assert_eq!(frame.pixel(1, 0), Some(Pixel::new(0, 0, 255)));
        assert!(Frame::from_rgb8(2, 1, &[1, 2, 3, 4]).is_err());
    }

    #[test]
    fn test_region_containment() {
        let frame = Frame::uniform(8, 8, Pixel::BLACK).unwrap();
        assert!(Region::new(2, 2, 4, 4).unwrap().fits_within(&frame));
        assert!(Region::new(0, 0, 8, 8).unwrap().fits_within(&frame));
        assert!(!Region::new(5, 5, 4, 4).unwrap().fits_within(&frame));
        assert!(Region::new(5, 5, 4, 4).unwrap().validate_against(&frame).is_err());
        assert!(Region::new(0, 0, 0, 4).is_err());
    }

    #[test]
    fn test_region_pixels_iterates_subrect() {
        let pixels = (0..16).map(|i| Pixel::new(i, 0, 0)).collect();
        let frame = Frame::new(4, 4, pixels).unwrap();
        let region = Region::new(1, 1, 2, 2).unwrap();
        let reds: Vec<u8> = region.pixels(&frame).map(|p| p.r).collect();
        assert_eq!(reds, vec![5, 6, 9, 10]);
        assert_eq!(region.area(), 4);
    }

    #[test]
    fn test_pixel_predicates() {
        assert!(Pixel::new(255, 10, 10).is_saturated(250));
        assert!(!Pixel::new(249, 10, 10).is_saturated(250));
        assert!(Pixel::new(5, 20, 0).is_underexposed(20));
        assert!(!Pixel::new(5, 21, 0).is_underexposed(20));
        assert!((Pixel::new(255, 255, 255).relative_luminance() - 255.0).abs() < 1e-9);
    }
}
