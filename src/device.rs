//! Device profiles: the viewport a page is captured at.
//!
//! The profile name also partitions the artifact tree
//! (`screenshots/<device>/...`) and the report file name.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Viewport preset used when capturing pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceProfile {
    /// 1280x800 - Default desktop browser window
    Desktop,
    /// 1440x900 - Larger laptop display
    Laptop,
    /// 768x1024 - Portrait tablet
    Tablet,
    /// 375x812 - Portrait phone
    Mobile,
    /// Custom viewport
    Custom(u32, u32),
}

impl DeviceProfile {
    /// Get the viewport as (width, height) in CSS pixels
    pub fn viewport(&self) -> (u32, u32) {
        match self {
            DeviceProfile::Desktop => (1280, 800),
            DeviceProfile::Laptop => (1440, 900),
            DeviceProfile::Tablet => (768, 1024),
            DeviceProfile::Mobile => (375, 812),
            DeviceProfile::Custom(width, height) => (*width, *height),
        }
    }

    /// Name used for directories and report files
    pub fn name(&self) -> String {
        match self {
            DeviceProfile::Desktop => "desktop".to_string(),
            DeviceProfile::Laptop => "laptop".to_string(),
            DeviceProfile::Tablet => "tablet".to_string(),
            DeviceProfile::Mobile => "mobile".to_string(),
            DeviceProfile::Custom(width, height) => format!("{}x{}", width, height),
        }
    }

    /// Parse from string (e.g., "desktop", "mobile", "1024x768")
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "desktop" | "default" => Some(DeviceProfile::Desktop),
            "laptop" => Some(DeviceProfile::Laptop),
            "tablet" | "ipad" => Some(DeviceProfile::Tablet),
            "mobile" | "phone" => Some(DeviceProfile::Mobile),
            other => {
                let (w, h) = other.split_once('x')?;
                let width: u32 = w.parse().ok()?;
                let height: u32 = h.parse().ok()?;
                if width == 0 || height == 0 {
                    return None;
                }
                Some(DeviceProfile::Custom(width, height))
            }
        }
    }

    /// Get all preset profiles (used by `--device all`)
    pub fn all_presets() -> Vec<DeviceProfile> {
        vec![
            DeviceProfile::Desktop,
            DeviceProfile::Laptop,
            DeviceProfile::Tablet,
            DeviceProfile::Mobile,
        ]
    }
}

impl Default for DeviceProfile {
    fn default() -> Self {
        DeviceProfile::Desktop
    }
}

impl fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (width, height) = self.viewport();
        write!(f, "{} ({}x{})", self.name(), width, height)
    }
}
