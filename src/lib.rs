//! # Peroxide Scan
//!
//! A Rust crate for measuring peroxide concentration from photographs of
//! colorimetric test strips.
//!
//! This library provides a reproducible measurement chain:
//! - Gating captures on exposure, clipping, sharpness and framing
//! - Sampling the pad color and converting it to CIE L*a*b* (D65)
//! - Estimating ppm against a calibration scale with CIEDE2000
//! - Scoring confidence and applying a versioned decision table
//! - Persisting accepted results and delivering them idempotently
//!
//! ## Example
//!
//! ```rust,no_run
//! use peroxide_scan::{analyze_strip, CalibrationPatch, Frame, LabColor, Pixel, Region};
//!
//! let frame = Frame::uniform(8, 8, Pixel::new(210, 158, 96))?;
//! let region = Region::new(2, 2, 4, 4)?;
//! let scale = vec![
//!     CalibrationPatch::new(100.0, LabColor::new(76.9, 7.8, 33.4)),
//!     CalibrationPatch::new(500.0, LabColor::new(63.6, 13.7, 37.9)),
//! ];
//!
//! let outcome = analyze_strip(&frame, &region, &scale)?;
//! if let Some(decision) = &outcome.decision {
//!     println!("{} ppm: {}", outcome.ppm().unwrap_or_default(), decision.analysis_result);
//! }
//! # Ok::<(), peroxide_scan::AnalysisError>(())
//! ```

pub mod error;
pub mod constants;
pub mod config;
pub mod color;
pub mod quality;
pub mod calibration;
pub mod confidence;
pub mod decision;
pub mod pipeline;
pub mod image_loader;
pub mod store;
pub mod sync;
pub mod workflow;

pub use error::{AnalysisError, Result};
pub use config::{AnalysisConfig, ConfidenceConfig, QualityThresholds, SamplingConfig};
pub use color::{
    delta_e2000, delta_e76, srgb_to_lab, ColorConverter, ColorSample, ColorSampler, Frame,
    LabColor, Pixel, Region,
};
pub use quality::{
    validate_capture, CaptureConstraints, CaptureInput, CaptureQuality, CaptureRejectionReason,
    CaptureValidation, QualityClassifier, QualityIssue, QualityStatus,
};
pub use calibration::{
    estimate_ppm, CalibrationPatch, ConcentrationEstimate, CsvReferenceScaleProvider,
    ReferenceScaleProvider, StaticReferenceScale,
};
pub use confidence::{Confidence, ConfidenceScorer};
pub use decision::{evaluate_ppm, ComplianceStatus, Decision, RuleTable};
pub use pipeline::{AnalysisOutcome, StripAnalyzer, Termination};
pub use image_loader::{
    CenteredRegionProvider, FixedRegionProvider, FrameDecoder, ImageFileDecoder, RegionProvider,
};
pub use store::{AnalysisRecord, FileRecordStore, MemoryRecordStore, RecordStore, SyncQueueItem};
pub use sync::{OfflineSyncApi, SyncApi, SyncEngine, SyncPayload, SyncResult, SyncRunStats};
pub use workflow::{FlowResult, OperatorCaptureRequest, WorkflowService};

/// Analyze a strip region with the default configuration
///
/// This is the main entry point for one-off measurements. Long-running
/// callers should build a [`StripAnalyzer`] once and reuse it.
///
/// # Errors
///
/// Returns `AnalysisError` if:
/// - The calibration scale has fewer than 2 patches
/// - The region does not fit inside the frame
///
/// A rejected capture is not an error: check `outcome.termination`.
pub fn analyze_strip(
    frame: &Frame,
    region: &Region,
    patches: &[CalibrationPatch],
) -> Result<AnalysisOutcome> {
    StripAnalyzer::default().analyze(frame, region, patches)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_serialization() {
        let frame = Frame::uniform(8, 8, Pixel::new(210, 158, 96)).unwrap();
        let region = Region::new(2, 2, 4, 4).unwrap();
        let scale = vec![
            CalibrationPatch::new(100.0, srgb_to_lab(Pixel::new(220, 180, 120))),
            CalibrationPatch::new(500.0, srgb_to_lab(Pixel::new(200, 140, 80))),
        ];
        let outcome = analyze_strip(&frame, &region, &scale).unwrap();

        let json = serde_json::to_string(&outcome).unwrap();
        let deserialized: AnalysisOutcome = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.termination, Termination::Completed);
        assert_eq!(deserialized.decision, outcome.decision);
        assert_eq!(deserialized.quality.issues, outcome.quality.issues);
        assert!(json.contains("\"termination\":\"completed\""));
    }
}
