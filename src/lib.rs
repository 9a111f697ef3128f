//! Visual Parity - staging vs production visual regression.
//!
//! This crate provides:
//! - Page-set resolution from a JSON config (URL pairing and validation)
//! - Pluggable screenshot acquirers (external command, HTTP service, synthetic)
//! - Normalization of captures onto a fixed canonical canvas
//! - Perceptual pixel diffing with anti-aliasing detection and a diff mask
//! - A per-page orchestrator that isolates failures and bounds every capture
//! - A self-contained HTML report plus JSON manifest, sorted for attention
//!
//! # Example
//!
//! ```rust,no_run
//! use visual_parity::{ArtifactLayout, DeviceProfile, Orchestrator, PageSet, RunContext};
//! use visual_parity::capture::SyntheticAcquirer;
//! use visual_parity::report::{ReportDocument, ReportMeta};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let pages = PageSet::new("https://staging.example.com", "https://www.example.com", ["/", "/about"])?;
//! let layout = ArtifactLayout::new("screenshots", DeviceProfile::Desktop);
//! let orchestrator = Orchestrator::new(SyntheticAcquirer::new(), RunContext::new(layout));
//! let results = orchestrator.run(&pages).await?;
//! let doc = ReportDocument::build(ReportMeta::new(&pages, DeviceProfile::Desktop), results);
//! std::fs::write("report.html", doc.to_html())?;
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod compare;
pub mod config;
pub mod device;
pub mod error;
pub mod layout;
pub mod orchestrator;
pub mod pages;
pub mod raster;
pub mod report;

// Re-export page set types
pub use pages::{ConfigError, ConfigResult, Environment, EnvironmentTarget, PagePath, PageSet, PageSetIssue};

// Re-export comparison records
pub use compare::{ComparisonResult, Outcome, PageStage};

// Re-export run machinery
pub use device::DeviceProfile;
pub use error::{RunError, RunResult};
pub use layout::ArtifactLayout;
pub use orchestrator::{Orchestrator, RunContext};

// Re-export report types
pub use report::{ReportDocument, ReportError, ReportMeta, Summary, Verdict, classify};
