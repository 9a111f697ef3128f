// Core types for screenshot acquisition

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::device::DeviceProfile;
use crate::pages::Environment;

/// One capture to perform: load `url` at the device viewport and write a
/// raster to `output`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureRequest {
    /// Absolute page URL
    pub url: String,

    /// Final artifact location
    pub output: PathBuf,

    /// Viewport to render at
    pub device: DeviceProfile,

    /// Which side of the comparison this capture is for
    pub environment: Environment,
}

impl CaptureRequest {
    /// Sibling path acquirers write to before committing
    pub fn part_path(&self) -> PathBuf {
        part_path(&self.output)
    }
}

/// `foo.png` -> `foo.png.part`
pub fn part_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    output.with_file_name(name)
}

/// Result type for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Error types for capture operations
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// The acquirer could not be configured
    #[error("invalid acquirer configuration: {0}")]
    Config(String),

    /// The capture program could not be started
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The capture program ran and failed
    #[error("capture command exited with {status}: {stderr}")]
    Command { status: String, stderr: String },

    /// The screenshot service rejected or failed the request
    #[error("screenshot service error: {0}")]
    Service(String),

    /// The acquirer reported success but wrote nothing usable
    #[error("capture produced no output at {0}")]
    NoOutput(PathBuf),

    /// Error during the capture process
    #[error("capture failed: {0}")]
    Failed(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for CaptureError {
    fn from(err: image::ImageError) -> Self {
        CaptureError::Failed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_path() {
        assert_eq!(
            part_path(Path::new("shots/desktop/staging/_apply_.png")),
            PathBuf::from("shots/desktop/staging/_apply_.png.part")
        );
    }
}
