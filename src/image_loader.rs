//! Frame decoding and region selection
//!
//! The analysis core never touches files or raw image bytes: a
//! [`FrameDecoder`] turns an image reference into a [`Frame`] and a
//! [`RegionProvider`] picks the area to sample. File decoding goes through
//! the `image` crate and currently accepts JPEG and PNG, which is what
//! capture devices produce.
//!
//! EXIF orientation is not applied: the region is chosen on the pixels as
//! stored.

use std::path::Path;

use image::ImageReader;

use crate::color::{Frame, Region};
use crate::error::{AnalysisError, Result};

/// Supported image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Detect format from file extension
    pub fn from_extension(path: &Path) -> Option<ImageFormat> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            _ => None,
        }
    }
}

/// Turns an image reference into a frame
pub trait FrameDecoder: Send + Sync {
    /// # Errors
    ///
    /// Returns `AnalysisError::FrameDecodeError` if the reference is
    /// unreadable.
    fn decode(&self, image_ref: &str) -> Result<Frame>;
}

/// Decodes image files from disk; the image reference is a file path
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageFileDecoder;

impl ImageFileDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl FrameDecoder for ImageFileDecoder {
    fn decode(&self, image_ref: &str) -> Result<Frame> {
        load_frame(Path::new(image_ref))
    }
}

/// Load an image file as an RGB frame
///
/// # Errors
///
/// Returns `AnalysisError::FrameDecodeError` if:
/// - The extension is not a supported format
/// - The file cannot be opened
/// - Decoding fails
///
/// # Example
///
/// ```rust,no_run
/// use peroxide_scan::image_loader::load_frame;
/// use std::path::Path;
///
/// let frame = load_frame(Path::new("strip.jpg"))?;
/// println!("Loaded frame: {}x{}", frame.width(), frame.height());
/// # Ok::<(), peroxide_scan::AnalysisError>(())
/// ```
pub fn load_frame(path: &Path) -> Result<Frame> {
    if ImageFormat::from_extension(path).is_none() {
        return Err(AnalysisError::FrameDecodeError {
            message: format!("Unsupported image format for file: {}", path.display()),
            source: None,
        });
    }

    let reader = ImageReader::open(path).map_err(|e| {
        AnalysisError::image_load(format!("Failed to open image file: {}", path.display()), e)
    })?;
    let img = reader.decode().map_err(|e| {
        AnalysisError::image_load(format!("Failed to decode image: {}", path.display()), e)
    })?;

    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    Frame::from_rgb8(width, height, rgb.as_raw())
}

/// Picks the region of a frame to sample
pub trait RegionProvider: Send + Sync {
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidParameter` if no valid region fits.
    fn provide(&self, frame: &Frame) -> Result<Region>;
}

/// Region centred in the frame, sized as a fraction of each dimension
#[derive(Debug, Clone, Copy)]
pub struct CenteredRegionProvider {
    fraction: f64,
}

impl Default for CenteredRegionProvider {
    fn default() -> Self {
        Self { fraction: 0.5 }
    }
}

impl CenteredRegionProvider {
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidParameter` unless `0 < fraction <= 1`.
    pub fn new(fraction: f64) -> Result<Self> {
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(AnalysisError::invalid_parameter("region.fraction", fraction));
        }
        Ok(Self { fraction })
    }
}

impl RegionProvider for CenteredRegionProvider {
    fn provide(&self, frame: &Frame) -> Result<Region> {
        let span = |side: u32| ((f64::from(side) * self.fraction).floor() as u32).clamp(1, side);
        let width = span(frame.width());
        let height = span(frame.height());
        Region::new(
            (frame.width() - width) / 2,
            (frame.height() - height) / 2,
            width,
            height,
        )
    }
}

/// Always returns the same region
#[derive(Debug, Clone, Copy)]
pub struct FixedRegionProvider {
    region: Region,
}

impl FixedRegionProvider {
    pub fn new(region: Region) -> Self {
        Self { region }
    }
}

impl RegionProvider for FixedRegionProvider {
    fn provide(&self, frame: &Frame) -> Result<Region> {
        self.region.validate_against(frame)?;
        Ok(self.region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Pixel;

    #[test]
    fn test_format_detection() {
        assert_eq!(
            ImageFormat::from_extension(Path::new("strip.JPEG")),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(
            ImageFormat::from_extension(Path::new("strip.png")),
            Some(ImageFormat::Png)
        );
        assert_eq!(
            ImageFormat::from_extension(Path::new("strip.JPG")),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(ImageFormat::from_extension(Path::new("strip.heic")), None);
        assert_eq!(ImageFormat::from_extension(Path::new("strip.tiff")), None);
    }

    #[test]
    fn test_decode_png_to_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strip.png");
        let mut img = image::RgbImage::from_pixel(3, 2, image::Rgb([200, 140, 80]));
        img.put_pixel(2, 1, image::Rgb([1, 2, 3]));
        img.save(&path).unwrap();

        let frame = ImageFileDecoder::new()
            .decode(path.to_str().unwrap())
            .unwrap();
        assert_eq!((frame.width(), frame.height()), (3, 2));
        assert_eq!(frame.pixel(0, 0), Some(Pixel::new(200, 140, 80)));
        assert_eq!(frame.pixel(2, 1), Some(Pixel::new(1, 2, 3)));
    }

    #[test]
    fn test_missing_file_is_decode_error() {
        let result = ImageFileDecoder::new().decode("/nonexistent/strip.jpg");
        assert!(matches!(result, Err(AnalysisError::FrameDecodeError { .. })));
    }

    #[test]
    fn test_unsupported_extension_is_decode_error() {
        let result = load_frame(Path::new("strip.bmp"));
        assert!(matches!(result, Err(AnalysisError::FrameDecodeError { .. })));
    }

    #[test]
    fn test_centered_region() {
        let frame = Frame::uniform(8, 6, Pixel::new(100, 100, 100)).unwrap();
        let region = CenteredRegionProvider::default().provide(&frame).unwrap();
        assert_eq!(region, Region::new(2, 1, 4, 3).unwrap());
        assert!(region.fits_within(&frame));
    }

    #[test]
    fn test_centered_region_on_tiny_frame() {
        let frame = Frame::uniform(1, 1, Pixel::new(100, 100, 100)).unwrap();
        let region = CenteredRegionProvider::default().provide(&frame).unwrap();
        assert_eq!(region, Region::new(0, 0, 1, 1).unwrap());
    }

    #[test]
    fn test_invalid_fraction() {
        assert!(CenteredRegionProvider::new(0.0).is_err());
        assert!(CenteredRegionProvider::new(1.5).is_err());
        assert!(CenteredRegionProvider::new(1.0).is_ok());
    }

    #[test]
    fn test_fixed_region_validated() {
        let frame = Frame::uniform(4, 4, Pixel::new(100, 100, 100)).unwrap();
        let provider = FixedRegionProvider::new(Region::new(2, 2, 4, 4).unwrap());
        assert!(matches!(
            provider.provide(&frame),
            Err(AnalysisError::InvalidParameter { .. })
        ));
    }
}
