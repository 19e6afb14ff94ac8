//! Concentration estimation against a calibration scale
//!
//! The two patches closest to the sample by ΔE2000 are selected ("lower"
//! is the closer one, "upper" the runner-up; the names refer to distance
//! rank, not ppm order) and the ppm is interpolated between them by
//! relative distance.

use serde::{Deserialize, Serialize};

use crate::color::{delta_e2000, delta_e76, LabColor};
use crate::{AnalysisError, Result};

/// Known concentration paired with its reference color
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPatch {
    pub ppm: f64,
    pub lab: LabColor,
}

impl CalibrationPatch {
    pub const fn new(ppm: f64, lab: LabColor) -> Self {
        Self { ppm, lab }
    }
}

/// Check that a calibration scale is usable
///
/// # Errors
///
/// Returns `AnalysisError::ConfigurationError` for fewer than 2 patches or
/// a negative / non-finite concentration.
pub fn validate_scale(patches: &[CalibrationPatch]) -> Result<()> {
    if patches.len() < 2 {
        return Err(AnalysisError::configuration(format!(
            "calibration scale needs at least 2 patches, got {}",
            patches.len()
        )));
    }
    if let Some(bad) = patches.iter().find(|p| !p.ppm.is_finite() || p.ppm < 0.0) {
        return Err(AnalysisError::configuration(format!(
            "calibration patch has invalid concentration {} ppm",
            bad.ppm
        )));
    }
    Ok(())
}

/// Interpolated concentration with the evidence it was derived from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcentrationEstimate {
    /// Point estimate in ppm
    pub ppm_estimate: f64,
    /// Smaller of the two selected patch concentrations
    pub ppm_min: f64,
    /// Larger of the two selected patch concentrations
    pub ppm_max: f64,
    /// Concentration of the closest patch
    pub lower_ppm: f64,
    /// Concentration of the second-closest patch
    pub upper_ppm: f64,
    /// Interpolation fraction from lower toward upper, in [0, 1]
    pub interpolation_fraction: f64,
    pub delta_e76_to_lower: f64,
    pub delta_e76_to_upper: f64,
    pub delta_e00_to_lower: f64,
    pub delta_e00_to_upper: f64,
}

impl ConcentrationEstimate {
    /// Summed ΔE2000 to both selected patches
    pub fn total_delta_e00(&self) -> f64 {
        self.delta_e00_to_lower + self.delta_e00_to_upper
    }

    /// Point estimate rounded to whole ppm, as used by the decision table
    pub fn rounded_ppm(&self) -> u32 {
        let rounded = self.ppm_estimate.round();
        if rounded <= 0.0 {
            0
        } else if rounded >= f64::from(u32::MAX) {
            u32::MAX
        } else {
            rounded as u32
        }
    }
}

struct PatchDistance {
    patch: CalibrationPatch,
    delta_e76: f64,
    delta_e00: f64,
}

/// Estimate the concentration of `sample` from a calibration scale
pub fn estimate_ppm(sample: LabColor, patches: &[CalibrationPatch]) -> Result<ConcentrationEstimate> {
    validate_scale(patches)?;

    let mut distances: Vec<PatchDistance> = patches
        .iter()
        .map(|patch| PatchDistance {
            patch: *patch,
            delta_e76: delta_e76(sample, patch.lab),
            delta_e00: delta_e2000(sample, patch.lab),
        })
        .collect();
    // Stable: equidistant patches keep scale order
    distances.sort_by(|a, b| a.delta_e00.total_cmp(&b.delta_e00));

    let lower = &distances[0];
    let upper = &distances[1];

    let total = lower.delta_e00 + upper.delta_e00;
    let t = if total == 0.0 {
        0.5
    } else {
        (lower.delta_e00 / total).clamp(0.0, 1.0)
    };

    let lower_ppm = lower.patch.ppm;
    let upper_ppm = upper.patch.ppm;

    Ok(ConcentrationEstimate {
        ppm_estimate: lower_ppm + t * (upper_ppm - lower_ppm),
        ppm_min: lower_ppm.min(upper_ppm),
        ppm_max: lower_ppm.max(upper_ppm),
        lower_ppm,
        upper_ppm,
        interpolation_fraction: t,
        delta_e76_to_lower: lower.delta_e76,
        delta_e76_to_upper: upper.delta_e76,
        delta_e00_to_lower: lower.delta_e00,
        delta_e00_to_upper: upper.delta_e00,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{srgb_to_lab, Pixel};

    fn scenario_scale() -> Vec<CalibrationPatch> {
        vec![
            CalibrationPatch::new(100.0, srgb_to_lab(Pixel::new(220, 180, 120))),
            CalibrationPatch::new(500.0, srgb_to_lab(Pixel::new(200, 140, 80))),
            CalibrationPatch::new(800.0, srgb_to_lab(Pixel::new(180, 110, 60))),
        ]
    }

    #[test]
    fn test_requires_two_patches() {
        let one = vec![CalibrationPatch::new(100.0, LabColor::new(50.0, 0.0, 0.0))];
        let result = estimate_ppm(LabColor::new(50.0, 0.0, 0.0), &one);
        assert!(matches!(result, Err(AnalysisError::ConfigurationError { .. })));
        assert!(estimate_ppm(LabColor::new(50.0, 0.0, 0.0), &[]).is_err());
    }

    #[test]
    fn test_rejects_negative_ppm() {
        let scale = vec![
            CalibrationPatch::new(-1.0, LabColor::new(50.0, 0.0, 0.0)),
            CalibrationPatch::new(100.0, LabColor::new(60.0, 0.0, 0.0)),
        ];
        assert!(validate_scale(&scale).is_err());
    }

    #[test]
    fn test_exact_match_to_both_patches_gives_midpoint() {
        let color = LabColor::new(60.0, 5.0, 30.0);
        let scale = vec![
            CalibrationPatch::new(100.0, color),
            CalibrationPatch::new(300.0, color),
        ];
        let estimate = estimate_ppm(color, &scale).unwrap();
        assert_eq!(estimate.interpolation_fraction, 0.5);
        assert_eq!(estimate.ppm_estimate, 200.0);
    }

    #[test]
    fn test_exact_match_to_one_patch_returns_its_ppm() {
        let scale = scenario_scale();
        let estimate = estimate_ppm(scale[1].lab, &scale).unwrap();
        assert_eq!(estimate.lower_ppm, 500.0);
        assert_eq!(estimate.interpolation_fraction, 0.0);
        assert_eq!(estimate.ppm_estimate, 500.0);
    }

    #[test]
    fn test_estimate_within_selected_interval() {
        let sample = srgb_to_lab(Pixel::new(210, 158, 96));
        let estimate = estimate_ppm(sample, &scenario_scale()).unwrap();

        assert_eq!(estimate.ppm_min, 100.0);
        assert_eq!(estimate.ppm_max, 500.0);
        assert!(estimate.ppm_min <= estimate.ppm_estimate);
        assert!(estimate.ppm_estimate <= estimate.ppm_max);
        assert!(estimate.delta_e00_to_lower <= estimate.delta_e00_to_upper);
    }

    #[test]
    fn test_ambiguous_color_between_two_patches() {
        let sample = srgb_to_lab(Pixel::new(210, 150, 95));
        let scale = vec![
            CalibrationPatch::new(100.0, srgb_to_lab(Pixel::new(220, 165, 105))),
            CalibrationPatch::new(500.0, srgb_to_lab(Pixel::new(200, 135, 85))),
        ];
        let estimate = estimate_ppm(sample, &scale).unwrap();

        assert!((100.0..=500.0).contains(&estimate.ppm_estimate));
        assert!(estimate.delta_e00_to_lower > 0.0);
        assert!(estimate.delta_e00_to_upper > 0.0);
    }

    #[test]
    fn test_selection_uses_delta_e2000_not_scale_order() {
        // Scale listed in reverse ppm order; the interval must not care
        let mut scale = scenario_scale();
        scale.reverse();
        let sample = srgb_to_lab(Pixel::new(185, 115, 62));
        let estimate = estimate_ppm(sample, &scale).unwrap();

        assert_eq!(estimate.lower_ppm, 800.0);
        assert_eq!(estimate.ppm_max, 800.0);
        assert_eq!(estimate.ppm_min, 500.0);
        assert!(estimate.ppm_estimate > 650.0);
    }

    #[test]
    fn test_rounded_ppm() {
        let color = LabColor::new(60.0, 5.0, 30.0);
        let scale = vec![
            CalibrationPatch::new(100.0, color),
            CalibrationPatch::new(101.0, color),
        ];
        let estimate = estimate_ppm(color, &scale).unwrap();
        assert_eq!(estimate.ppm_estimate, 100.5);
        assert_eq!(estimate.rounded_ppm(), 101);
    }
}
