//! Capture-conditions validation
//!
//! Checks the device-reported conditions of a capture (distance, angle,
//! ambient luminance, motion blur, saturation) before the image is even
//! decoded. Rules are versioned for audit: every record stores the
//! capture-rules version that accepted it.

use serde::{Deserialize, Serialize};

use crate::constants::versions::CAPTURE_RULES_VERSION;

const DEFAULT_MIN_DISTANCE_CM: f64 = 12.0;
const DEFAULT_MAX_DISTANCE_CM: f64 = 25.0;
const DEFAULT_MAX_ANGLE_DEGREES: f64 = 15.0;
const DEFAULT_MIN_LUMINANCE: f64 = 35.0;
const DEFAULT_MAX_LUMINANCE: f64 = 235.0;
const DEFAULT_MAX_BLUR: f64 = 0.35;
const DEFAULT_MAX_SATURATION: f64 = 0.30;

/// Limits applied to device-reported capture conditions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConstraints {
    pub min_distance_cm: f64,
    pub max_distance_cm: f64,
    pub max_angle_degrees: f64,
    pub min_luminance: f64,
    pub max_luminance: f64,
    pub max_blur: f64,
    pub max_saturation_ratio: f64,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            min_distance_cm: DEFAULT_MIN_DISTANCE_CM,
            max_distance_cm: DEFAULT_MAX_DISTANCE_CM,
            max_angle_degrees: DEFAULT_MAX_ANGLE_DEGREES,
            min_luminance: DEFAULT_MIN_LUMINANCE,
            max_luminance: DEFAULT_MAX_LUMINANCE,
            max_blur: DEFAULT_MAX_BLUR,
            max_saturation_ratio: DEFAULT_MAX_SATURATION,
        }
    }
}

/// Conditions reported by the camera layer at shutter time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureInput {
    pub distance_cm: f64,
    pub angle_degrees: f64,
    pub luminance: f64,
    pub blur_score: f64,
    pub saturation_ratio: f64,
}

/// Why a capture was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaptureRejectionReason {
    DistanceTooClose,
    DistanceTooFar,
    AngleTooHigh,
    LuminanceTooLow,
    LuminanceTooHigh,
    BlurTooHigh,
    SaturationTooHigh,
}

impl CaptureRejectionReason {
    /// Operator-facing instruction
    pub fn message(&self) -> &'static str {
        match self {
            Self::DistanceTooClose => "Distance too short: move the camera away.",
            Self::DistanceTooFar => "Distance too long: move the camera closer.",
            Self::AngleTooHigh => "Capture angle out of range: realign the strip.",
            Self::LuminanceTooLow => "Lighting too dim: increase the lighting.",
            Self::LuminanceTooHigh => "Lighting too bright: reduce reflections.",
            Self::BlurTooHigh => "Blur detected: steady the device before capture.",
            Self::SaturationTooHigh => "Excessive saturation: correct the exposure.",
        }
    }
}

/// Outcome of capture-conditions validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureValidation {
    pub accepted: bool,
    pub rules_version: String,
    pub rejection_reasons: Vec<CaptureRejectionReason>,
}

impl CaptureValidation {
    pub fn operator_messages(&self) -> Vec<&'static str> {
        self.rejection_reasons.iter().map(|r| r.message()).collect()
    }
}

/// Validate capture conditions, reporting every failing check
pub fn validate_capture(input: &CaptureInput, constraints: &CaptureConstraints) -> CaptureValidation {
    let mut reasons = Vec::new();

    if input.distance_cm < constraints.min_distance_cm {
        reasons.push(CaptureRejectionReason::DistanceTooClose);
    }
    if input.distance_cm > constraints.max_distance_cm {
        reasons.push(CaptureRejectionReason::DistanceTooFar);
    }
    if input.angle_degrees.abs() > constraints.max_angle_degrees {
        reasons.push(CaptureRejectionReason::AngleTooHigh);
    }
    if input.luminance < constraints.min_luminance {
        reasons.push(CaptureRejectionReason::LuminanceTooLow);
    }
    if input.luminance > constraints.max_luminance {
        reasons.push(CaptureRejectionReason::LuminanceTooHigh);
    }
    if input.blur_score > constraints.max_blur {
        reasons.push(CaptureRejectionReason::BlurTooHigh);
    }
    if input.saturation_ratio > constraints.max_saturation_ratio {
        reasons.push(CaptureRejectionReason::SaturationTooHigh);
    }

    CaptureValidation {
        accepted: reasons.is_empty(),
        rules_version: CAPTURE_RULES_VERSION.to_string(),
        rejection_reasons: reasons,
    }
}
