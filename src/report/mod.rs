//! Report assembly.
//!
//! Reads a finished, page-ordered `Vec<ComparisonResult>` and turns it into a
//! [`ReportDocument`]: every row classified, sorted for attention and
//! summarized. The document is rebuilt from scratch every run and rendered
//! to a single self-contained HTML file plus a JSON manifest.

pub mod html;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::compare::{ComparisonResult, Outcome};
use crate::config::PASS_THRESHOLD;
use crate::device::DeviceProfile;
use crate::pages::PageSet;

pub use html::render_html;

/// Result type for report persistence
pub type ReportResult<T> = Result<T, ReportError>;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize results: {0}")]
    Json(#[from] serde_json::Error),
}

/// Per-row classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
    Error,
}

impl Verdict {
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::Fail => "FAIL",
            Verdict::Error => "ERROR",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify an outcome against the fixed pass threshold
pub fn classify(outcome: &Outcome) -> Verdict {
    match outcome {
        Outcome::Scored { similarity, .. } if *similarity >= PASS_THRESHOLD => Verdict::Pass,
        Outcome::Scored { .. } => Verdict::Fail,
        Outcome::SizeMismatch { .. } | Outcome::AcquisitionError { .. } => Verdict::Error,
    }
}

/// One report row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub verdict: Verdict,
    #[serde(flatten)]
    pub result: ComparisonResult,
}

impl ReportRow {
    pub fn new(result: ComparisonResult) -> Self {
        Self {
            verdict: classify(&result.outcome),
            result,
        }
    }
}

/// Attention order: errors first, then ascending similarity.
///
/// Equal keys compare `Equal`, so a stable sort keeps their input order.
pub fn attention_order(a: &ReportRow, b: &ReportRow) -> Ordering {
    let rank = |row: &ReportRow| match row.verdict {
        Verdict::Error => 0u8,
        Verdict::Fail | Verdict::Pass => 1,
    };
    rank(a).cmp(&rank(b)).then_with(|| {
        let sa = a.result.outcome.similarity().unwrap_or(0.0);
        let sb = b.result.outcome.similarity().unwrap_or(0.0);
        sa.total_cmp(&sb)
    })
}

/// Summary counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
}

impl Summary {
    pub fn from_rows(rows: &[ReportRow]) -> Self {
        rows.iter().fold(
            Summary {
                total: rows.len(),
                ..Default::default()
            },
            |mut summary, row| {
                match row.verdict {
                    Verdict::Pass => summary.passed += 1,
                    Verdict::Fail => summary.failed += 1,
                    Verdict::Error => summary.errors += 1,
                }
                summary
            },
        )
    }

    /// True when CI should go green
    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.errors == 0
    }
}

/// Run context shown in the report header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMeta {
    pub generated: DateTime<Utc>,
    pub staging_base: String,
    pub production_base: String,
    pub device: String,
    pub viewport: (u32, u32),
    pub host: String,
    pub threshold: f64,
}

impl ReportMeta {
    pub fn new(pages: &PageSet, device: DeviceProfile) -> Self {
        let host = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        Self {
            generated: Utc::now(),
            staging_base: pages.staging.base_url.clone(),
            production_base: pages.production.base_url.clone(),
            device: device.name(),
            viewport: device.viewport(),
            host,
            threshold: PASS_THRESHOLD,
        }
    }
}

/// Classified, sorted view over one run's results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDocument {
    pub meta: ReportMeta,
    pub summary: Summary,
    pub rows: Vec<ReportRow>,
}

impl ReportDocument {
    pub fn build(meta: ReportMeta, results: Vec<ComparisonResult>) -> Self {
        let mut rows: Vec<ReportRow> = results.into_iter().map(ReportRow::new).collect();
        rows.sort_by(attention_order);
        let summary = Summary::from_rows(&rows);
        Self { meta, summary, rows }
    }

    pub fn to_html(&self) -> String {
        render_html(self)
    }

    pub fn to_json(&self) -> ReportResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the HTML report and the JSON manifest, replacing earlier ones
    pub fn write(&self, html_path: &Path, json_path: &Path) -> ReportResult<()> {
        write_file(json_path, self.to_json()?.as_bytes())?;
        write_file(html_path, self.to_html().as_bytes())?;
        log::info!("report written to {}", html_path.display());
        Ok(())
    }
}

/// Build and render in one step: results in, document bytes out
pub fn assemble(meta: ReportMeta, results: Vec<ComparisonResult>) -> Vec<u8> {
    ReportDocument::build(meta, results).to_html().into_bytes()
}

fn write_file(path: &Path, contents: &[u8]) -> ReportResult<()> {
    let wrap = |source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(wrap)?;
    }
    fs::write(path, contents).map_err(wrap)
}
