//! Colorimetric constants, frozen thresholds and rule versions
//!
//! Values in `srgb`, `d65` and `lab` must never change: decisions derived
//! from them are compared against versioned contract fixtures.

/// D65 Standard Illuminant Reference
///
/// CIE Standard Illuminant D65 represents average daylight with a correlated
/// color temperature of 6504K.
pub mod d65 {
    /// D65 white point in CIE XYZ color space (Xn, Yn, Zn)
    pub const WHITE_POINT_XYZ: [f64; 3] = [0.95047, 1.00000, 1.08883];
}

/// Re-export D65 white point at top level for convenience
pub const D65_WHITE_POINT_XYZ: [f64; 3] = d65::WHITE_POINT_XYZ;

/// sRGB transfer function and primaries
pub mod srgb {
    /// Below this encoded value the inverse gamma is linear
    pub const LINEAR_THRESHOLD: f64 = 0.04045;

    /// Slope of the linear segment
    pub const LINEAR_SLOPE: f64 = 12.92;

    /// Gamma exponent of the power segment
    pub const GAMMA: f64 = 2.4;

    /// Linear sRGB to XYZ matrix (D65), row-major
    pub const TO_XYZ: [[f64; 3]; 3] = [
        [0.4124564, 0.3575761, 0.1804375],
        [0.2126729, 0.7151522, 0.0721750],
        [0.0193339, 0.1191920, 0.9503041],
    ];
}

/// CIE L*a*b* nonlinearity
pub mod lab {
    /// (6/29)^3
    pub const EPSILON: f64 = 216.0 / 24389.0;

    /// (29/3)^3
    pub const KAPPA: f64 = 24389.0 / 27.0;
}

/// Capture quality thresholds (v1)
pub mod quality {
    /// A channel at or above this value counts as clipped
    pub const SATURATION_CHANNEL_MIN: u8 = 250;

    /// A pixel whose channels are all at or below this value is underexposed
    pub const UNDEREXPOSURE_CHANNEL_MAX: u8 = 20;

    /// Maximum fraction of clipped pixels in the region
    pub const MAX_SATURATION_RATIO: f64 = 0.30;

    /// Maximum fraction of underexposed pixels in the region
    pub const MAX_UNDEREXPOSURE_RATIO: f64 = 0.30;

    /// Accepted mean relative luminance range (0-255 scale)
    pub const MIN_MEAN_LUMINANCE: f64 = 25.0;
    pub const MAX_MEAN_LUMINANCE: f64 = 240.0;

    /// Minimum mean gradient for a sharp capture
    pub const MIN_SHARPNESS: f64 = 10.0;

    /// Luminance spread below which the region carries no edge information
    pub const BLUR_EVIDENCE_MIN_CONTRAST: f64 = 10.0;

    /// Required margin around the region, as fraction of the frame's shorter side
    pub const SCALE_MARGIN_RATIO: f64 = 0.02;

    /// Minimum fraction of region pixels surviving the sampler's filter
    pub const MIN_KEPT_PIXEL_RATIO: f64 = 0.45;
}

/// Confidence scoring parameters (v1)
pub mod confidence {
    /// Score removed per quality reason
    pub const PENALTY_PER_REASON: f64 = 0.15;

    /// Summed ΔE00 is clamped to this before scaling
    pub const DELTA_E_CLAMP: f64 = 40.0;

    /// Divisor turning summed ΔE00 into a penalty
    pub const DELTA_E_DIVISOR: f64 = 50.0;

    /// Upper bound of the interpolation uncertainty penalty
    pub const MAX_UNCERTAINTY_PENALTY: f64 = 0.8;

    /// Score thresholds for Accepted / Warning levels
    pub const ACCEPT_THRESHOLD: f64 = 0.75;
    pub const WARNING_THRESHOLD: f64 = 0.55;

    /// Summed ΔE00 above which the sample is flagged ambiguous
    pub const AMBIGUITY_DELTA_E: f64 = 20.0;
}

/// Versions stamped on every decision and record
pub mod versions {
    /// Decision rule table contract version
    pub const ANALYSIS_RULES_VERSION: &str = "analysis-rules/v1";

    /// Capture-conditions rule version
    pub const CAPTURE_RULES_VERSION: &str = "capture-rules/v1";

    /// On-disk layout of the local record store
    pub const STORAGE_SCHEMA_VERSION: &str = "storage/v1";
}
