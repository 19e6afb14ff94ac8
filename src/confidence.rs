//! Confidence scoring of a concentration estimate
//!
//! Combines the quality reasons raised for the capture with the color
//! uncertainty of the estimate (how far the sample sits from its two
//! nearest calibration patches) into a score in [0, 1].

use serde::{Deserialize, Serialize};

use crate::calibration::ConcentrationEstimate;
use crate::config::ConfidenceConfig;
use crate::quality::{CaptureQuality, QualityStatus};

/// Confidence attached to an analysis outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Confidence {
    /// Score in [0, 1]
    pub score: f64,
    pub level: QualityStatus,
    /// Quality reasons, then scorer notes
    pub notes: Vec<String>,
}

impl Confidence {
    /// Zero confidence for a pipeline that stopped before estimation
    pub fn rejected(notes: Vec<String>) -> Self {
        Self {
            score: 0.0,
            level: QualityStatus::Rejected,
            notes,
        }
    }
}

/// Confidence scorer
#[derive(Debug, Clone, Default)]
pub struct ConfidenceScorer {
    config: ConfidenceConfig,
}

impl ConfidenceScorer {
    pub fn new(config: ConfidenceConfig) -> Self {
        Self { config }
    }

    /// Score an estimate given the capture quality it came from
    pub fn score(&self, quality: &CaptureQuality, estimate: &ConcentrationEstimate) -> Confidence {
        let c = &self.config;
        let total_delta_e = estimate.total_delta_e00();

        let quality_penalty = c.penalty_per_reason * quality.reasons.len() as f64;
        let uncertainty_penalty = (total_delta_e.clamp(0.0, c.delta_e_clamp) / c.delta_e_divisor)
            .clamp(0.0, c.max_uncertainty_penalty);
        let score = (1.0 - quality_penalty - uncertainty_penalty).clamp(0.0, 1.0);

        let mut notes = quality.reasons.clone();
        if total_delta_e > c.ambiguity_delta_e {
            notes.push(format!(
                "Ambiguous color: summed ΔE2000 {:.1} to the nearest patches exceeds {:.0}.",
                total_delta_e, c.ambiguity_delta_e
            ));
        }

        Confidence {
            score,
            level: self.level_for(score),
            notes,
        }
    }

    /// Map a score to a level
    pub fn level_for(&self, score: f64) -> QualityStatus {
        if score >= self.config.accept_threshold {
            QualityStatus::Accepted
        } else if score >= self.config.warning_threshold {
            QualityStatus::Warning
        } else {
            QualityStatus::Rejected
        }
    }
}
