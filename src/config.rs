//! Configuration management with environment variable support.
//!
//! This module provides the run settings for visual-parity, supporting:
//! - Environment variables for all configurable values
//! - Sensible defaults for a local run
//! - Builder pattern for programmatic configuration
//!
//! The page set itself (base URLs and paths) lives in a JSON file, see
//! [`crate::pages`].
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `VISUAL_PARITY_SCREENSHOT_DIR` | Root of the artifact tree | `screenshots` |
//! | `VISUAL_PARITY_REPORT_DIR` | Where reports are written | `.` |
//! | `VISUAL_PARITY_DEVICE` | Device profile (or `all`) | `desktop` |
//! | `VISUAL_PARITY_CAPTURE_TIMEOUT` | Per-capture timeout in seconds | `60` |
//! | `VISUAL_PARITY_RUN_DEADLINE` | Whole-run deadline in seconds | `1800` |
//! | `VISUAL_PARITY_WORKERS` | Pages compared concurrently | `1` |
//! | `VISUAL_PARITY_CAPTURE_COMMAND` | Command template for the command acquirer | unset |
//! | `VISUAL_PARITY_CAPTURE_SERVICE` | Endpoint of an HTTP screenshot service | unset |
//! | `VISUAL_PARITY_LOG` | Log filter (`env_logger` syntax) | `info` |
//!
//! # Example
//!
//! ```bash
//! export VISUAL_PARITY_CAPTURE_COMMAND="shot-scraper {url} -o {output} --width {width} --height {height}"
//! export VISUAL_PARITY_WORKERS=4
//! visual-parity compare --config pages.json
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

// ============================================================================
// Default Values
// ============================================================================

/// Default artifact root
pub const DEFAULT_SCREENSHOT_DIR: &str = "screenshots";

/// Default report directory
pub const DEFAULT_REPORT_DIR: &str = ".";

/// Default device profile
pub const DEFAULT_DEVICE: &str = "desktop";

/// Default per-capture timeout (seconds)
pub const DEFAULT_CAPTURE_TIMEOUT: u64 = 60;

/// Default run deadline (seconds)
pub const DEFAULT_RUN_DEADLINE: u64 = 1800;

/// Default worker count (sequential)
pub const DEFAULT_WORKERS: usize = 1;

/// Canonical canvas every capture is normalized to before diffing
pub const CANONICAL_WIDTH: u32 = 1280;
pub const CANONICAL_HEIGHT: u32 = 800;

/// Minimum similarity (percent) for a page to pass
pub const PASS_THRESHOLD: f64 = 95.0;

/// Per-pixel perceptual tolerance on a 0-1 scale
pub const PIXEL_THRESHOLD: f64 = 0.1;

/// Default log filter
pub const DEFAULT_LOG_FILTER: &str = "info";

// ============================================================================
// Environment Variable Names
// ============================================================================

pub const ENV_SCREENSHOT_DIR: &str = "VISUAL_PARITY_SCREENSHOT_DIR";
pub const ENV_REPORT_DIR: &str = "VISUAL_PARITY_REPORT_DIR";
pub const ENV_DEVICE: &str = "VISUAL_PARITY_DEVICE";
pub const ENV_CAPTURE_TIMEOUT: &str = "VISUAL_PARITY_CAPTURE_TIMEOUT";
pub const ENV_RUN_DEADLINE: &str = "VISUAL_PARITY_RUN_DEADLINE";
pub const ENV_WORKERS: &str = "VISUAL_PARITY_WORKERS";
pub const ENV_CAPTURE_COMMAND: &str = "VISUAL_PARITY_CAPTURE_COMMAND";
pub const ENV_CAPTURE_SERVICE: &str = "VISUAL_PARITY_CAPTURE_SERVICE";
pub const ENV_LOG: &str = "VISUAL_PARITY_LOG";

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration (initialized from environment on first access)
pub fn get() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Run settings
#[derive(Debug, Clone)]
pub struct Config {
    /// Where artifacts and reports go
    pub output: OutputSettings,
    /// Capture behaviour
    pub capture: CaptureSettings,
    /// Scheduling
    pub run: RunSettings,
}

#[derive(Debug, Clone)]
pub struct OutputSettings {
    pub screenshot_dir: PathBuf,
    pub report_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct CaptureSettings {
    /// Device profile name, or `all`
    pub device: String,
    /// Per-capture timeout (seconds)
    pub timeout: u64,
    /// Command template for the command acquirer
    pub command: Option<String>,
    /// Endpoint for the screenshot service acquirer
    pub service: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Whole-run deadline (seconds)
    pub deadline: u64,
    /// Pages compared concurrently
    pub workers: usize,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            output: OutputSettings::from_env(),
            capture: CaptureSettings::from_env(),
            run: RunSettings::from_env(),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            output: OutputSettings::defaults(),
            capture: CaptureSettings::defaults(),
            run: RunSettings::defaults(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl OutputSettings {
    pub fn from_env() -> Self {
        Self {
            screenshot_dir: env::var(ENV_SCREENSHOT_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_SCREENSHOT_DIR)),
            report_dir: env::var(ENV_REPORT_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_REPORT_DIR)),
        }
    }

    pub fn defaults() -> Self {
        Self {
            screenshot_dir: PathBuf::from(DEFAULT_SCREENSHOT_DIR),
            report_dir: PathBuf::from(DEFAULT_REPORT_DIR),
        }
    }
}

impl CaptureSettings {
    pub fn from_env() -> Self {
        Self {
            device: env::var(ENV_DEVICE).unwrap_or_else(|_| DEFAULT_DEVICE.to_string()),
            timeout: parse_env(ENV_CAPTURE_TIMEOUT).unwrap_or(DEFAULT_CAPTURE_TIMEOUT),
            command: non_empty_env(ENV_CAPTURE_COMMAND),
            service: non_empty_env(ENV_CAPTURE_SERVICE),
        }
    }

    pub fn defaults() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_string(),
            timeout: DEFAULT_CAPTURE_TIMEOUT,
            command: None,
            service: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

impl RunSettings {
    pub fn from_env() -> Self {
        Self {
            deadline: parse_env(ENV_RUN_DEADLINE).unwrap_or(DEFAULT_RUN_DEADLINE),
            workers: parse_env(ENV_WORKERS)
                .filter(|w: &usize| *w > 0)
                .unwrap_or(DEFAULT_WORKERS),
        }
    }

    pub fn defaults() -> Self {
        Self {
            deadline: DEFAULT_RUN_DEADLINE,
            workers: DEFAULT_WORKERS,
        }
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::defaults();
        assert_eq!(config.output.screenshot_dir, PathBuf::from(DEFAULT_SCREENSHOT_DIR));
        assert_eq!(config.capture.device, DEFAULT_DEVICE);
        assert_eq!(config.capture.timeout(), Duration::from_secs(60));
        assert_eq!(config.run.workers, 1);
        assert!(config.capture.command.is_none());
    }

    #[test]
    fn test_canonical_canvas() {
        assert_eq!((CANONICAL_WIDTH, CANONICAL_HEIGHT), (1280, 800));
        assert_eq!(PASS_THRESHOLD, 95.0);
    }
}
