//! Per-page comparison records.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::pages::PagePath;

/// Where a page is in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStage {
    Pending,
    Capturing,
    Normalizing,
    Diffing,
}

impl fmt::Display for PageStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PageStage::Pending => "pending",
            PageStage::Capturing => "capturing",
            PageStage::Normalizing => "normalizing",
            PageStage::Diffing => "diffing",
        })
    }
}

/// Terminal outcome of one page comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// Both captures diffed; `similarity` is in `[0, 100]`
    Scored {
        similarity: f64,
        diff_artifact: PathBuf,
    },
    /// Normalized rasters still disagreed in size
    SizeMismatch {
        staging: (u32, u32),
        production: (u32, u32),
    },
    /// A capture was missing, failed, timed out or could not be decoded
    AcquisitionError { message: String },
}

impl Outcome {
    pub fn similarity(&self) -> Option<f64> {
        match self {
            Outcome::Scored { similarity, .. } => Some(*similarity),
            _ => None,
        }
    }

    pub fn diff_artifact(&self) -> Option<&PathBuf> {
        match self {
            Outcome::Scored { diff_artifact, .. } => Some(diff_artifact),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, Outcome::Scored { .. })
    }

    /// Human-readable reason for error outcomes
    pub fn error_message(&self) -> Option<String> {
        match self {
            Outcome::Scored { .. } => None,
            Outcome::SizeMismatch {
                staging,
                production,
            } => Some(format!(
                "size mismatch after normalization: staging {}x{}, production {}x{}",
                staging.0, staging.1, production.0, production.1
            )),
            Outcome::AcquisitionError { message } => Some(message.clone()),
        }
    }
}

/// The record produced for one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub page: PagePath,

    pub staging_url: String,

    pub production_url: String,

    /// Staging capture, when it exists on disk
    pub staging_capture: Option<PathBuf>,

    /// Production capture, when it exists on disk
    pub production_capture: Option<PathBuf>,

    pub outcome: Outcome,
}

impl ComparisonResult {
    pub fn error(
        page: PagePath,
        staging_url: String,
        production_url: String,
        message: impl Into<String>,
    ) -> Self {
        Self {
            page,
            staging_url,
            production_url,
            staging_capture: None,
            production_capture: None,
            outcome: Outcome::AcquisitionError {
                message: message.into(),
            },
        }
    }

    pub fn with_captures(mut self, staging: Option<PathBuf>, production: Option<PathBuf>) -> Self {
        self.staging_capture = staging;
        self.production_capture = production;
        self
    }
}
