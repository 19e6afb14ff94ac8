//! Versioned decision rules
//!
//! Maps a rounded ppm value to the operator-facing decision. The wording
//! and thresholds form a frozen external contract: changing either means
//! publishing a new rule table under a new version, never editing v1.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::versions::ANALYSIS_RULES_VERSION;

/// Compliance band of a measured concentration
///
/// Serialized as the contract's compliance-status codes, see [`code`](Self::code).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "&'static str", try_from = "String")]
pub enum ComplianceStatus {
    /// Below the lower threshold: maintenance/quality action required
    LowAlert,
    /// Within the production range
    Compliant,
    /// Above the upper threshold: stop, notify, re-check
    HighAlert,
}

impl ComplianceStatus {
    pub const ALL: [ComplianceStatus; 3] = [
        ComplianceStatus::LowAlert,
        ComplianceStatus::Compliant,
        ComplianceStatus::HighAlert,
    ];

    /// Contract code for this status
    pub fn code(&self) -> &'static str {
        match self {
            ComplianceStatus::LowAlert => "MAINTENANCE_QUALITE",
            ComplianceStatus::Compliant => "CONFORME",
            ComplianceStatus::HighAlert => "SEUIL_DEPASSE",
        }
    }

    /// Parse a contract code
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.code() == code)
    }
}

impl From<ComplianceStatus> for &'static str {
    fn from(status: ComplianceStatus) -> Self {
        status.code()
    }
}

impl TryFrom<String> for ComplianceStatus {
    type Error = String;

    fn try_from(code: String) -> Result<Self, Self::Error> {
        Self::from_code(&code).ok_or_else(|| format!("unknown compliance status '{code}'"))
    }
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Decision stamped with the rule-table version that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub contract_version: String,
    pub analysis_result: String,
    pub compliance_status: ComplianceStatus,
    pub recommended_action: String,
}

/// One row of a rule table
#[derive(Debug, Clone, Copy)]
pub struct RuleBand {
    /// Inclusive upper bound; `None` for the open-ended last band
    pub max_ppm: Option<u32>,
    pub status: ComplianceStatus,
    pub analysis_result: &'static str,
    pub recommended_action: &'static str,
}

const V1_BANDS: [RuleBand; 3] = [
    RuleBand {
        max_ppm: Some(99),
        status: ComplianceStatus::LowAlert,
        analysis_result: "ATTENTION TAUX BAS",
        recommended_action: "Appliquer les consignes maintenance/qualité.",
    },
    RuleBand {
        max_ppm: Some(500),
        status: ComplianceStatus::Compliant,
        analysis_result: "CONFORME POUR LA PRODUCTION",
        recommended_action: "Poursuivre la production normale.",
    },
    RuleBand {
        max_ppm: None,
        status: ComplianceStatus::HighAlert,
        analysis_result: "ALERTE seuil dépassé",
        recommended_action: "Arrêt/notification/recontrôle immédiats.",
    },
];

/// Ordered, versioned set of ppm bands
#[derive(Debug, Clone, Copy)]
pub struct RuleTable {
    version: &'static str,
    bands: &'static [RuleBand],
}

impl RuleTable {
    /// The `analysis-rules/v1` table
    pub const fn v1() -> Self {
        Self {
            version: ANALYSIS_RULES_VERSION,
            bands: &V1_BANDS,
        }
    }

    pub fn version(&self) -> &'static str {
        self.version
    }

    pub fn bands(&self) -> &'static [RuleBand] {
        self.bands
    }

    /// Decide for a rounded ppm value
    pub fn evaluate(&self, ppm: u32) -> Decision {
        let band = self
            .bands
            .iter()
            .find(|band| band.max_ppm.map_or(true, |max| ppm <= max))
            .unwrap_or(&self.bands[self.bands.len() - 1]);

        Decision {
            contract_version: self.version.to_string(),
            analysis_result: band.analysis_result.to_string(),
            compliance_status: band.status,
            recommended_action: band.recommended_action.to_string(),
        }
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::v1()
    }
}

/// Decide for a rounded ppm value with the current rule table
pub fn evaluate_ppm(ppm: u32) -> Decision {
    RuleTable::v1().evaluate(ppm)
}
