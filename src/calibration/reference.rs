//! Calibration scale sources
//!
//! A scale is loaded once per analysis from whatever the deployment ships:
//! a CSV of reference swatches on disk, or a fixed list supplied in code.

use std::path::{Path, PathBuf};

use log::debug;

use super::estimator::{validate_scale, CalibrationPatch};
use crate::color::LabColor;
use crate::{AnalysisError, Result};

/// Default file name for reference swatches
pub const REFERENCE_SWATCHES_FILE: &str = "reference-swatches.csv";

/// Supplies the calibration scale used by the estimator
pub trait ReferenceScaleProvider: Send + Sync {
    /// Load the scale
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::ConfigurationError` if the source is
    /// unreadable or holds fewer than 2 patches.
    fn load(&self) -> Result<Vec<CalibrationPatch>>;
}

/// Fixed, in-memory calibration scale
#[derive(Debug, Clone, Default)]
pub struct StaticReferenceScale {
    patches: Vec<CalibrationPatch>,
}

impl StaticReferenceScale {
    pub fn new(patches: Vec<CalibrationPatch>) -> Self {
        Self { patches }
    }
}

impl ReferenceScaleProvider for StaticReferenceScale {
    fn load(&self) -> Result<Vec<CalibrationPatch>> {
        validate_scale(&self.patches)?;
        Ok(self.patches.clone())
    }
}

/// Reads reference swatches from the first candidate path that exists
#[derive(Debug, Clone)]
pub struct CsvReferenceScaleProvider {
    candidates: Vec<PathBuf>,
}

impl CsvReferenceScaleProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            candidates: vec![path.into()],
        }
    }

    /// Try each path in order; the first existing file wins
    pub fn with_candidates<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            candidates: paths.into_iter().map(Into::into).collect(),
        }
    }

    fn resolve(&self) -> Result<&Path> {
        self.candidates
            .iter()
            .map(PathBuf::as_path)
            .find(|p| p.is_file())
            .ok_or_else(|| {
                let tried: Vec<String> =
                    self.candidates.iter().map(|p| p.display().to_string()).collect();
                AnalysisError::configuration(format!(
                    "calibration scale not found, tried: {}",
                    tried.join(", ")
                ))
            })
    }
}

impl Default for CsvReferenceScaleProvider {
    /// `data/calibration/reference-swatches.csv`, relative to the working
    /// directory or its parent
    fn default() -> Self {
        Self::with_candidates([
            Path::new("data/calibration").join(REFERENCE_SWATCHES_FILE),
            Path::new("../data/calibration").join(REFERENCE_SWATCHES_FILE),
        ])
    }
}

impl ReferenceScaleProvider for CsvReferenceScaleProvider {
    fn load(&self) -> Result<Vec<CalibrationPatch>> {
        let path = self.resolve()?;
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::configuration_with_source(
                format!("cannot read calibration scale {}", path.display()),
                e,
            )
        })?;
        let scale = parse_reference_swatches(&raw)?;
        debug!(
            "Loaded {} calibration patches from {} (version {})",
            scale.patches.len(),
            path.display(),
            scale.calibration_version.as_deref().unwrap_or("unversioned")
        );
        Ok(scale.patches)
    }
}

/// Parsed contents of a reference swatches CSV
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceScale {
    pub calibration_version: Option<String>,
    /// Patches sorted by ascending ppm
    pub patches: Vec<CalibrationPatch>,
}

struct Columns {
    ppm: usize,
    l: usize,
    a: usize,
    b: usize,
    version: Option<usize>,
}

impl Columns {
    fn from_header(header: &str) -> Result<Self> {
        let names: Vec<&str> = header.split(',').map(str::trim).collect();
        let find = |name: &str| names.iter().position(|c| *c == name);
        let require = |name: &str| {
            find(name).ok_or_else(|| {
                AnalysisError::configuration(format!("calibration CSV is missing column '{name}'"))
            })
        };

        Ok(Self {
            ppm: require("ppm")?,
            l: require("L_star")?,
            a: require("a_star")?,
            b: require("b_star")?,
            version: find("calibration_version"),
        })
    }
}

/// Parse header-addressed reference swatches
///
/// Column order is free; `ppm`, `L_star`, `a_star` and `b_star` are
/// required, `calibration_version` is optional. Blank lines are skipped.
pub fn parse_reference_swatches(raw: &str) -> Result<ReferenceScale> {
    let mut lines = raw.lines().enumerate();
    let (_, header) = lines
        .next()
        .ok_or_else(|| AnalysisError::configuration("calibration CSV is empty"))?;
    let columns = Columns::from_header(header.trim_start_matches('\u{feff}'))?;

    let mut calibration_version = None;
    let mut patches = Vec::new();

    for (index, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let line_no = index + 1;
        let cells: Vec<&str> = line.split(',').map(str::trim).collect();
        let number = |column: usize, name: &str| -> Result<f64> {
            let cell = cells.get(column).ok_or_else(|| {
                AnalysisError::configuration(format!("line {line_no}: missing '{name}' value"))
            })?;
            cell.parse::<f64>().map_err(|e| {
                AnalysisError::configuration_with_source(
                    format!("line {line_no}: invalid '{name}' value '{cell}'"),
                    e,
                )
            })
        };

        let ppm = number(columns.ppm, "ppm")?;
        let lab = LabColor::new(
            number(columns.l, "L_star")?,
            number(columns.a, "a_star")?,
            number(columns.b, "b_star")?,
        );
        patches.push(CalibrationPatch::new(ppm, lab));

        if calibration_version.is_none() {
            calibration_version = columns
                .version
                .and_then(|c| cells.get(c))
                .filter(|v| !v.is_empty())
                .map(|v| v.to_string());
        }
    }

    validate_scale(&patches)?;
    patches.sort_by(|a, b| a.ppm.total_cmp(&b.ppm));

    Ok(ReferenceScale {
        calibration_version,
        patches,
    })
}
