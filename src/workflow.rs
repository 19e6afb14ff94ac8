//! Operator capture flow
//!
//! Ties the pieces together for one capture: check the device-reported
//! conditions, decode the image, analyze the strip, persist the accepted
//! result, queue it for delivery and try one sync pass. A failed delivery
//! never fails the flow: the record stays stored and pending.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::calibration::{CsvReferenceScaleProvider, ReferenceScaleProvider};
use crate::config::AnalysisConfig;
use crate::image_loader::{CenteredRegionProvider, FrameDecoder, ImageFileDecoder, RegionProvider};
use crate::pipeline::StripAnalyzer;
use crate::quality::{validate_capture, CaptureInput, CaptureValidation};
use crate::store::{new_local_id, AnalysisRecord, RecordStore};
use crate::sync::SyncEngine;
use crate::{AnalysisError, Result};

/// Operator message shown when the analysis itself rejects the capture
pub const ANALYSIS_REJECTED_MESSAGE: &str =
    "Analysis refused: capture quality rejected. Retake the photo (lighting, sharpness, framing).";

const FALLBACK_QUALITY_REASON: &str = "Capture quality insufficient for a reliable analysis.";

/// One capture submitted by the operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorCaptureRequest {
    /// Image reference handed to the frame decoder
    pub image_ref: String,
    pub capture_input: CaptureInput,
    pub captured_at: DateTime<Utc>,
}

/// Terminal state of an operator flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "flow", rename_all = "snake_case")]
pub enum FlowResult {
    /// Capture conditions refused before any analysis
    Rejected(CaptureValidation),
    /// The pipeline rejected the capture
    AnalysisRejected {
        operator_message: String,
        reasons: Vec<String>,
    },
    /// Stored (and delivered, or pending delivery)
    Completed(AnalysisRecord),
}

/// Caller-constructed service running operator flows
pub struct WorkflowService {
    store: Arc<dyn RecordStore>,
    sync: Arc<SyncEngine>,
    analyzer: StripAnalyzer,
    frame_decoder: Box<dyn FrameDecoder>,
    region_provider: Box<dyn RegionProvider>,
    reference_scale: Box<dyn ReferenceScaleProvider>,
}

impl std::fmt::Debug for WorkflowService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowService")
            .field("analyzer", &self.analyzer)
            .finish_non_exhaustive()
    }
}

impl WorkflowService {
    /// Service with file decoding, a centred region and the CSV scale
    pub fn new(store: Arc<dyn RecordStore>, sync: Arc<SyncEngine>) -> Self {
        Self {
            store,
            sync,
            analyzer: StripAnalyzer::default(),
            frame_decoder: Box::new(ImageFileDecoder::new()),
            region_provider: Box::new(CenteredRegionProvider::default()),
            reference_scale: Box::new(CsvReferenceScaleProvider::default()),
        }
    }

    pub fn with_config(mut self, config: AnalysisConfig) -> Self {
        self.analyzer = StripAnalyzer::new(config);
        self
    }

    pub fn with_frame_decoder(mut self, decoder: impl FrameDecoder + 'static) -> Self {
        self.frame_decoder = Box::new(decoder);
        self
    }

    pub fn with_region_provider(mut self, provider: impl RegionProvider + 'static) -> Self {
        self.region_provider = Box::new(provider);
        self
    }

    pub fn with_reference_scale(mut self, provider: impl ReferenceScaleProvider + 'static) -> Self {
        self.reference_scale = Box::new(provider);
        self
    }

    /// Run the full flow for one capture
    ///
    /// # Errors
    ///
    /// Decode, configuration, input and storage errors are returned;
    /// rejections are `FlowResult` values. Errors from the sync pass are
    /// logged, not returned, since the record is already stored.
    pub fn run_operator_flow(&self, request: &OperatorCaptureRequest) -> Result<FlowResult> {
        let capture = validate_capture(&request.capture_input, &self.analyzer.config().capture);
        if !capture.accepted {
            info!(
                "Capture {} refused: {:?}",
                request.image_ref, capture.rejection_reasons
            );
            return Ok(FlowResult::Rejected(capture));
        }

        let frame = self.frame_decoder.decode(&request.image_ref)?;
        let region = self.region_provider.provide(&frame)?;
        let patches = self.reference_scale.load()?;
        let outcome = self.analyzer.analyze(&frame, &region, &patches)?;

        if outcome.quality.is_rejected() {
            let reasons = if outcome.quality.reasons.is_empty() {
                vec![FALLBACK_QUALITY_REASON.to_string()]
            } else {
                outcome.quality.reasons.clone()
            };
            info!(
                "Analysis of {} rejected: {}",
                request.image_ref,
                reasons.join(" | ")
            );
            return Ok(FlowResult::AnalysisRejected {
                operator_message: ANALYSIS_REJECTED_MESSAGE.to_string(),
                reasons,
            });
        }

        let (Some(ppm), Some(decision)) = (outcome.ppm(), outcome.decision) else {
            return Err(AnalysisError::ProcessingError {
                message: "accepted analysis produced no estimate or decision".to_string(),
            });
        };

        let record = AnalysisRecord {
            local_id: new_local_id(),
            captured_at: request.captured_at,
            ppm,
            compliance_status: decision.compliance_status,
            image_ref: request.image_ref.clone(),
            capture_rules_version: capture.rules_version,
            analysis_rules_version: decision.contract_version,
        };
        self.store.save_and_enqueue(&record, request.captured_at)?;

        if let Err(e) = self.sync.run_once() {
            warn!("Sync pass after {} failed: {}", record.local_id, e);
        }

        info!(
            "Capture {} completed: {} ppm, {}",
            record.local_id, record.ppm, record.compliance_status
        );
        Ok(FlowResult::Completed(record))
    }
}
