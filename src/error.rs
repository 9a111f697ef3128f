//! Run-level errors. Anything here aborts the whole run; per-page failures
//! never reach this type.

use crate::capture::CaptureError;
use crate::pages::ConfigError;
use crate::report::ReportError;

/// Result type for run-level operations
pub type RunResult<T> = Result<T, RunError>;

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("acquirer setup failed: {0}")]
    Acquirer(#[from] CaptureError),

    #[error("failed to prepare artifact directory {path}: {source}")]
    Artifacts {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Report(#[from] ReportError),
}
