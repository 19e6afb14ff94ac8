//! Capture gating
//!
//! This module rejects captures that cannot yield a reliable measurement,
//! both from device-reported conditions and from the pixels themselves.

pub mod capture;
pub mod classifier;

pub use capture::{
    validate_capture, CaptureConstraints, CaptureInput, CaptureRejectionReason, CaptureValidation,
};
pub use classifier::{CaptureQuality, QualityClassifier, QualityIssue, QualityStatus};
