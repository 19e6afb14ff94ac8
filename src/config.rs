//! Configuration structures for the strip analysis pipeline.
//!
//! All tunable parameters are grouped by pipeline stage. The defaults are
//! the frozen v1 values; a deployment may ship a JSON file instead:
//!
//! ```no_run
//! use peroxide_scan::AnalysisConfig;
//! use std::path::Path;
//!
//! // Load from file
//! let config = AnalysisConfig::from_json_file(Path::new("analysis.json"))?;
//!
//! // Or use defaults
//! let config = AnalysisConfig::default();
//! # Ok::<(), peroxide_scan::AnalysisError>(())
//! ```
//!
//! # Configuration Sections
//!
//! - [`QualityThresholds`]: exposure, saturation, blur and framing checks
//! - [`SamplingConfig`]: minimum usable pixel ratio
//! - [`ConfidenceConfig`]: confidence penalties and level thresholds
//! - [`CaptureConstraints`]: device-reported capture conditions

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::quality::CaptureConstraints;
use crate::constants::{confidence, quality};
use crate::{AnalysisError, Result};

/// Complete pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AnalysisConfig {
    /// Capture quality classifier thresholds
    #[serde(default)]
    pub quality: QualityThresholds,

    /// Color sampler settings
    #[serde(default)]
    pub sampling: SamplingConfig,

    /// Confidence scorer settings
    #[serde(default)]
    pub confidence: ConfidenceConfig,

    /// Capture-conditions rules
    #[serde(default)]
    pub capture: CaptureConstraints,
}

/// Thresholds used by the capture quality classifier.
///
/// Pixel predicates are evaluated per channel on 8-bit values; luminance is
/// the Rec. 709 weighted sum on the same 0-255 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityThresholds {
    /// Any channel at or above this value marks the pixel as clipped
    pub saturation_channel_min: u8,

    /// All channels at or below this value mark the pixel as underexposed
    pub underexposure_channel_max: u8,

    /// Maximum fraction of clipped pixels (0.0-1.0)
    pub max_saturation_ratio: f64,

    /// Maximum fraction of underexposed pixels (0.0-1.0)
    pub max_underexposure_ratio: f64,

    /// Minimum mean luminance
    pub min_mean_luminance: f64,

    /// Maximum mean luminance
    pub max_mean_luminance: f64,

    /// Minimum mean gradient magnitude
    pub min_sharpness: f64,

    /// Minimum luminance spread for the blur check to apply
    pub blur_evidence_min_contrast: f64,

    /// Required margin as fraction of the frame's shorter dimension
    pub scale_margin_ratio: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            saturation_channel_min: quality::SATURATION_CHANNEL_MIN,
            underexposure_channel_max: quality::UNDEREXPOSURE_CHANNEL_MAX,
            max_saturation_ratio: quality::MAX_SATURATION_RATIO,
            max_underexposure_ratio: quality::MAX_UNDEREXPOSURE_RATIO,
            min_mean_luminance: quality::MIN_MEAN_LUMINANCE,
            max_mean_luminance: quality::MAX_MEAN_LUMINANCE,
            min_sharpness: quality::MIN_SHARPNESS,
            blur_evidence_min_contrast: quality::BLUR_EVIDENCE_MIN_CONTRAST,
            scale_margin_ratio: quality::SCALE_MARGIN_RATIO,
        }
    }
}

/// Color sampler settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Minimum kept/area ratio below which the outcome is forced to Rejected
    pub min_kept_pixel_ratio: f64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            min_kept_pixel_ratio: quality::MIN_KEPT_PIXEL_RATIO,
        }
    }
}

/// Confidence scorer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceConfig {
    pub penalty_per_reason: f64,
    pub delta_e_clamp: f64,
    pub delta_e_divisor: f64,
    pub max_uncertainty_penalty: f64,
    pub accept_threshold: f64,
    pub warning_threshold: f64,
    pub ambiguity_delta_e: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            penalty_per_reason: confidence::PENALTY_PER_REASON,
            delta_e_clamp: confidence::DELTA_E_CLAMP,
            delta_e_divisor: confidence::DELTA_E_DIVISOR,
            max_uncertainty_penalty: confidence::MAX_UNCERTAINTY_PENALTY,
            accept_threshold: confidence::ACCEPT_THRESHOLD,
            warning_threshold: confidence::WARNING_THRESHOLD,
            ambiguity_delta_e: confidence::AMBIGUITY_DELTA_E,
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::configuration_with_source(
                format!("cannot read config file {}", path.display()),
                e,
            )
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            AnalysisError::configuration_with_source(
                format!("invalid config file {}", path.display()),
                e,
            )
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to JSON file
    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            AnalysisError::configuration_with_source("cannot serialize config", e)
        })?;
        std::fs::write(path, json).map_err(|e| {
            AnalysisError::configuration_with_source(
                format!("cannot write config file {}", path.display()),
                e,
            )
        })
    }

    /// Reject configurations that would make the pipeline meaningless
    pub fn validate(&self) -> Result<()> {
        let q = &self.quality;
        for (name, ratio) in [
            ("quality.max_saturation_ratio", q.max_saturation_ratio),
            ("quality.max_underexposure_ratio", q.max_underexposure_ratio),
            ("quality.scale_margin_ratio", q.scale_margin_ratio),
            ("sampling.min_kept_pixel_ratio", self.sampling.min_kept_pixel_ratio),
        ] {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(AnalysisError::configuration(format!(
                    "{name} must be within [0, 1], got {ratio}"
                )));
            }
        }

        if q.min_mean_luminance > q.max_mean_luminance {
            return Err(AnalysisError::configuration(format!(
                "luminance range is empty: [{}, {}]",
                q.min_mean_luminance, q.max_mean_luminance
            )));
        }

        let c = &self.confidence;
        if c.delta_e_divisor <= 0.0 {
            return Err(AnalysisError::configuration(
                "confidence.delta_e_divisor must be positive",
            ));
        }
        if c.warning_threshold > c.accept_threshold {
            return Err(AnalysisError::configuration(
                "confidence.warning_threshold exceeds accept_threshold",
            ));
        }

        Ok(())
    }
}
