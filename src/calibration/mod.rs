//! Calibration scale and concentration estimation
//!
//! This module maps a sampled color to a concentration by interpolating
//! between the nearest reference patches of a calibration scale.

pub mod estimator;
pub mod reference;

pub use estimator::{estimate_ppm, validate_scale, CalibrationPatch, ConcentrationEstimate};
pub use reference::{
    parse_reference_swatches, CsvReferenceScaleProvider, ReferenceScale, ReferenceScaleProvider,
    StaticReferenceScale, REFERENCE_SWATCHES_FILE,
};
