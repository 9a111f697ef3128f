//! Artifact tree for a run.
//!
//! ```text
//! <root>/<device>/staging/<stem>.png
//! <root>/<device>/prod/<stem>.png
//! <root>/<device>/diff/<stem>.png
//! <root>/<device>/.run.json
//! ```
//!
//! `stem` is the page's artifact stem from [`PageSet::entries`]: the
//! sanitized path, suffixed only when two paths sanitize alike. Paths are a
//! pure function of (device, environment, stem), so reruns overwrite the
//! same files instead of accumulating.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::device::DeviceProfile;
use crate::pages::{Environment, PageSet};

/// Artifact locations for one device profile
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    /// Unique run ID
    pub run_id: String,
    /// Root of the artifact tree (`screenshots/`)
    pub root: PathBuf,
    /// Device profile this layout is for
    pub device: DeviceProfile,
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>, device: DeviceProfile) -> Self {
        Self {
            run_id: generate_run_id(),
            root: root.into(),
            device,
        }
    }

    /// `<root>/<device>`
    pub fn device_dir(&self) -> PathBuf {
        self.root.join(self.device.name())
    }

    /// `<root>/<device>/<staging|prod>`
    pub fn env_dir(&self, env: Environment) -> PathBuf {
        self.device_dir().join(env.dir_name())
    }

    /// `<root>/<device>/diff`
    pub fn diff_dir(&self) -> PathBuf {
        self.device_dir().join("diff")
    }

    /// Capture artifact for one page and environment
    pub fn capture_path(&self, env: Environment, stem: &str) -> PathBuf {
        self.env_dir(env).join(artifact_name(stem))
    }

    /// Diff mask for one page
    pub fn diff_path(&self, stem: &str) -> PathBuf {
        self.diff_dir().join(artifact_name(stem))
    }

    /// Create the directory tree and write run metadata
    pub fn init(&self, pages: &PageSet) -> std::io::Result<()> {
        fs::create_dir_all(self.env_dir(Environment::Staging))?;
        fs::create_dir_all(self.env_dir(Environment::Production))?;
        fs::create_dir_all(self.diff_dir())?;

        let host = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        let metadata = serde_json::json!({
            "id": self.run_id,
            "created": chrono::Utc::now().to_rfc3339(),
            "device": self.device.name(),
            "viewport": self.device.viewport(),
            "staging": pages.staging.base_url,
            "production": pages.production.base_url,
            "pages": pages.len(),
            "host": host,
        });

        let metadata_path = self.device_dir().join(".run.json");
        fs::write(metadata_path, serde_json::to_string_pretty(&metadata)?)?;

        Ok(())
    }

    /// Remove this page's artifacts from a previous run
    pub fn clear_page(&self, stem: &str) {
        for path in [
            self.capture_path(Environment::Staging, stem),
            self.capture_path(Environment::Production, stem),
            self.diff_path(stem),
        ] {
            let _ = fs::remove_file(path);
        }
    }

    /// `visual_comparison_report_<device>.html` inside `report_dir`
    pub fn report_path(&self, report_dir: &Path) -> PathBuf {
        report_dir.join(format!("visual_comparison_report_{}.html", self.device.name()))
    }

    /// `visual_comparison_results_<device>.json` inside `report_dir`
    pub fn results_path(&self, report_dir: &Path) -> PathBuf {
        report_dir.join(format!("visual_comparison_results_{}.json", self.device.name()))
    }
}

fn artifact_name(stem: &str) -> String {
    format!("{}.png", stem)
}

/// Generate a unique run ID
fn generate_run_id() -> String {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let pid = std::process::id();
    format!("run_{}_{}", timestamp, pid)
}
