//! Capture quality classification of a frame region
//!
//! Measures exposure, clipping, mean luminance and sharpness over the
//! region, and checks that the region sits inside the frame with a margin
//! (the calibration strip border is visible and not cropped). Every failing
//! check contributes a structured [`QualityIssue`] and an operator-facing
//! reason string.

use serde::{Deserialize, Serialize};

use crate::color::{Frame, Pixel, Region};
use crate::config::QualityThresholds;
use crate::Result;

/// Three-valued status shared by quality classification and confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QualityStatus {
    Accepted,
    Warning,
    Rejected,
}

/// Named failure flags raised by the classifier and the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityIssue {
    Saturated,
    Underexposed,
    LuminanceOutOfRange,
    Blurry,
    ReferenceScaleMissing,
    InsufficientUsablePixels,
}

impl QualityIssue {
    /// Whether this issue alone rejects the capture
    ///
    /// Every v1 issue is blocking, so `QualityStatus::Warning` is never
    /// produced by classification; it stays in the type for non-blocking
    /// issues a later rule version may introduce.
    pub fn is_blocking(&self) -> bool {
        match self {
            QualityIssue::Saturated
            | QualityIssue::Underexposed
            | QualityIssue::LuminanceOutOfRange
            | QualityIssue::Blurry
            | QualityIssue::ReferenceScaleMissing
            | QualityIssue::InsufficientUsablePixels => true,
        }
    }
}

/// Result of quality classification for one (frame, region) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureQuality {
    pub status: QualityStatus,
    /// Mean absolute luminance gradient over interior pixels
    pub sharpness: f64,
    /// Fraction of pixels with at least one clipped channel
    pub saturation_ratio: f64,
    /// Fraction of pixels with every channel near black
    pub underexposure_ratio: f64,
    /// Mean relative luminance (0-255 scale)
    pub mean_luminance: f64,
    /// Region lies strictly inside the frame with the required margin
    pub reference_scale_detected: bool,
    /// Structured failing checks, in evaluation order
    pub issues: Vec<QualityIssue>,
    /// Human-readable reason for each issue, same order
    pub reasons: Vec<String>,
}

impl CaptureQuality {
    /// True if the capture must be retaken
    pub fn is_rejected(&self) -> bool {
        self.status == QualityStatus::Rejected
    }

    /// Copy of this classification with an extra issue, status recomputed
    pub fn with_issue(&self, issue: QualityIssue, reason: impl Into<String>) -> Self {
        let mut updated = self.clone();
        updated.issues.push(issue);
        updated.reasons.push(reason.into());
        updated.status = status_for(&updated.issues);
        updated
    }
}

/// Overall status implied by a set of issues
pub fn status_for(issues: &[QualityIssue]) -> QualityStatus {
    if issues.iter().any(QualityIssue::is_blocking) {
        QualityStatus::Rejected
    } else if !issues.is_empty() {
        QualityStatus::Warning
    } else {
        QualityStatus::Accepted
    }
}

/// Capture quality classifier
#[derive(Debug, Clone, Default)]
pub struct QualityClassifier {
    thresholds: QualityThresholds,
}

impl QualityClassifier {
    pub fn new(thresholds: QualityThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &QualityThresholds {
        &self.thresholds
    }

    /// Classify the capture quality of `region` within `frame`
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidParameter` if the region does not fit
    /// the frame.
    pub fn classify(&self, frame: &Frame, region: &Region) -> Result<CaptureQuality> {
        region.validate_against(frame)?;
        let t = &self.thresholds;

        let area = region.area() as f64;
        let mut saturated = 0u64;
        let mut underexposed = 0u64;
        let mut luminance_sum = 0.0;
        let mut luminance_min = f64::INFINITY;
        let mut luminance_max = f64::NEG_INFINITY;

        for pixel in region.pixels(frame) {
            if pixel.is_saturated(t.saturation_channel_min) {
                saturated += 1;
            }
            if pixel.is_underexposed(t.underexposure_channel_max) {
                underexposed += 1;
            }
            let lum = pixel.relative_luminance();
            luminance_sum += lum;
            luminance_min = luminance_min.min(lum);
            luminance_max = luminance_max.max(lum);
        }

        let saturation_ratio = saturated as f64 / area;
        let underexposure_ratio = underexposed as f64 / area;
        let mean_luminance = luminance_sum / area;
        let contrast = luminance_max - luminance_min;
        let sharpness = sharpness(frame, region);
        let reference_scale_detected = reference_scale_visible(frame, region, t.scale_margin_ratio);

        let mut issues = Vec::new();
        let mut reasons = Vec::new();

        if saturation_ratio > t.max_saturation_ratio {
            issues.push(QualityIssue::Saturated);
            reasons.push(format!(
                "Excessive saturation: {:.0}% of the pad is clipped, reduce glare or exposure.",
                saturation_ratio * 100.0
            ));
        }
        if underexposure_ratio > t.max_underexposure_ratio {
            issues.push(QualityIssue::Underexposed);
            reasons.push(format!(
                "Underexposed capture: {:.0}% of the pad is too dark, increase lighting.",
                underexposure_ratio * 100.0
            ));
        }
        if mean_luminance < t.min_mean_luminance || mean_luminance > t.max_mean_luminance {
            issues.push(QualityIssue::LuminanceOutOfRange);
            reasons.push(format!(
                "Mean luminance {:.1} outside [{:.0}, {:.0}], adjust lighting.",
                mean_luminance, t.min_mean_luminance, t.max_mean_luminance
            ));
        }
        if sharpness < t.min_sharpness && contrast >= t.blur_evidence_min_contrast {
            issues.push(QualityIssue::Blurry);
            reasons.push(format!(
                "Blur detected (sharpness {:.1} < {:.1}), hold the device steady.",
                sharpness, t.min_sharpness
            ));
        }
        if !reference_scale_detected {
            issues.push(QualityIssue::ReferenceScaleMissing);
            reasons.push(
                "Reference scale not detected: frame the whole strip with a visible border."
                    .to_string(),
            );
        }

        Ok(CaptureQuality {
            status: status_for(&issues),
            sharpness,
            saturation_ratio,
            underexposure_ratio,
            mean_luminance,
            reference_scale_detected,
            issues,
            reasons,
        })
    }
}

/// Mean of |ΔL| to the right neighbour plus |ΔL| to the bottom neighbour,
/// over pixels that have both neighbours inside the region
fn sharpness(frame: &Frame, region: &Region) -> f64 {
    if region.width < 2 || region.height < 2 {
        return 0.0;
    }

    let lum = |x: u32, y: u32| frame.pixel(x, y).map(|p: Pixel| p.relative_luminance());

    let mut total = 0.0;
    let mut count = 0u64;
    for y in region.y..region.y + region.height - 1 {
        for x in region.x..region.x + region.width - 1 {
            if let (Some(here), Some(right), Some(below)) = (lum(x, y), lum(x + 1, y), lum(x, y + 1)) {
                total += (here - right).abs() + (here - below).abs();
                count += 1;
            }
        }
    }

    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

/// Region strictly inside the frame with `margin_ratio` of the shorter side
/// free on every edge
fn reference_scale_visible(frame: &Frame, region: &Region, margin_ratio: f64) -> bool {
    let margin = margin_ratio * f64::from(frame.shorter_side());
    let left = f64::from(region.x);
    let top = f64::from(region.y);
    let right = region.right() as f64;
    let bottom = region.bottom() as f64;

    left > margin
        && top > margin
        && right < f64::from(frame.width()) - margin
        && bottom < f64::from(frame.height()) - margin
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(frame: &Frame, region: Region) -> CaptureQuality {
        QualityClassifier::default().classify(frame, &region).unwrap()
    }

    #[test]
    fn test_uniform_centered_region_accepted() {
        let frame = Frame::uniform(8, 8, Pixel::new(210, 158, 96)).unwrap();
        let quality = classify(&frame, Region::new(2, 2, 4, 4).unwrap());

        assert_eq!(quality.status, QualityStatus::Accepted);
        assert!(quality.reasons.is_empty());
        assert!(quality.reference_scale_detected);
        assert_eq!(quality.sharpness, 0.0);
        assert!((quality.mean_luminance - Pixel::new(210, 158, 96).relative_luminance()).abs() < 1e-9);
    }

    #[test]
    fn test_dark_frame_rejected_with_reasons() {
        let frame = Frame::uniform(6, 6, Pixel::new(2, 2, 2)).unwrap();
        let quality = classify(&frame, Region::new(0, 0, 4, 4).unwrap());

        assert_eq!(quality.status, QualityStatus::Rejected);
        assert_eq!(quality.underexposure_ratio, 1.0);
        assert!(quality.issues.contains(&QualityIssue::Underexposed));
        assert!(quality.issues.contains(&QualityIssue::LuminanceOutOfRange));
        assert!(quality.issues.contains(&QualityIssue::ReferenceScaleMissing));
        assert_eq!(quality.issues.len(), quality.reasons.len());
    }

    #[test]
    fn test_saturated_frame_rejected() {
        let frame = Frame::uniform(10, 10, Pixel::new(255, 200, 180)).unwrap();
        let quality = classify(&frame, Region::new(3, 3, 4, 4).unwrap());

        assert_eq!(quality.saturation_ratio, 1.0);
        assert_eq!(quality.issues, vec![QualityIssue::Saturated]);
        assert_eq!(quality.status, QualityStatus::Rejected);
    }

    #[test]
    fn test_soft_gradient_flagged_blurry() {
        // Horizontal ramp of 2 levels per pixel: visible spread, tiny gradients
        let mut pixels = Vec::new();
        for _y in 0..20 {
            for x in 0..20u8 {
                let v = 100 + 2 * x;
                pixels.push(Pixel::new(v, v, v));
            }
        }
        let frame = Frame::new(20, 20, pixels).unwrap();
        let quality = classify(&frame, Region::new(4, 4, 12, 12).unwrap());

        assert!(quality.sharpness < 10.0);
        assert_eq!(quality.issues, vec![QualityIssue::Blurry]);
    }

    #[test]
    fn test_checkerboard_is_sharp() {
        let mut pixels = Vec::new();
        for y in 0..20u32 {
            for x in 0..20u32 {
                let v = if (x + y) % 2 == 0 { 60 } else { 180 };
                pixels.push(Pixel::new(v, v, v));
            }
        }
        let frame = Frame::new(20, 20, pixels).unwrap();
        let quality = classify(&frame, Region::new(4, 4, 12, 12).unwrap());

        assert!(quality.sharpness > 100.0);
        assert!(!quality.issues.contains(&QualityIssue::Blurry));
    }

    #[test]
    fn test_region_touching_edge_misses_scale() {
        let frame = Frame::uniform(100, 50, Pixel::new(150, 150, 150)).unwrap();
        // Margin is 1.0 px (2% of 50); x = 1 is not strictly greater
        let quality = classify(&frame, Region::new(1, 10, 20, 20).unwrap());
        assert!(!quality.reference_scale_detected);

        let quality = classify(&frame, Region::new(2, 10, 20, 20).unwrap());
        assert!(quality.reference_scale_detected);
    }

    #[test]
    fn test_out_of_bounds_region_is_error() {
        let frame = Frame::uniform(4, 4, Pixel::new(150, 150, 150)).unwrap();
        let result = QualityClassifier::default().classify(&frame, &Region::new(2, 2, 4, 4).unwrap());
        assert!(result.is_err());
    }

    #[test]
    fn test_status_for_issue_sets() {
        assert_eq!(status_for(&[]), QualityStatus::Accepted);
        assert_eq!(status_for(&[QualityIssue::Blurry]), QualityStatus::Rejected);
    }

    #[test]
    fn test_with_issue_forces_rejection() {
        let frame = Frame::uniform(8, 8, Pixel::new(210, 158, 96)).unwrap();
        let quality = classify(&frame, Region::new(2, 2, 4, 4).unwrap());
        let forced = quality.with_issue(QualityIssue::InsufficientUsablePixels, "too few pixels");

        assert_eq!(forced.status, QualityStatus::Rejected);
        assert_eq!(forced.reasons, vec!["too few pixels".to_string()]);
        assert_eq!(quality.status, QualityStatus::Accepted);
    }
}
