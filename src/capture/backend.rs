//! Acquirer abstraction for screenshot capture.
//!
//! The browser that actually loads and rasterizes a page lives outside this
//! crate. An [`Acquirer`] hands it a URL and an output location:
//! - [`CommandAcquirer`] runs an external capture program per page
//! - [`ServiceAcquirer`] asks an HTTP screenshot service
//! - [`SyntheticAcquirer`] renders a deterministic placeholder page (dry runs)
//!
//! Every implementation writes to a `.part` sibling first and only renames it
//! onto the final path on success, so a failed capture never leaves a
//! partial artifact behind.

use std::future::Future;
use std::path::Path;
use std::process::Stdio;

use tokio::fs;
use tokio::process::Command;

use super::service::ServiceAcquirer;
use super::synthetic::SyntheticAcquirer;
use super::types::{CaptureError, CaptureRequest, CaptureResult, part_path};

/// Longest stderr excerpt kept in an error message
const STDERR_EXCERPT: usize = 400;

/// Trait for capture backends
///
/// A single call is one independent browser session: implementations must
/// not share page state between concurrent calls.
pub trait Acquirer: Send + Sync {
    /// Capture `request.url` into `request.output`
    fn capture(&self, request: &CaptureRequest) -> impl Future<Output = CaptureResult<()>> + Send;

    /// Get the source type identifier (e.g., "command", "service", "synthetic")
    fn source_type(&self) -> &str;
}

/// Move a finished `.part` file onto its final path.
///
/// Fails with [`CaptureError::NoOutput`] when nothing (or an empty file) was
/// written.
pub async fn commit_part(output: &Path) -> CaptureResult<()> {
    let part = part_path(output);
    match fs::metadata(&part).await {
        Ok(meta) if meta.len() > 0 => {
            fs::rename(&part, output).await?;
            Ok(())
        }
        Ok(_) => {
            let _ = fs::remove_file(&part).await;
            Err(CaptureError::NoOutput(output.to_path_buf()))
        }
        Err(_) => Err(CaptureError::NoOutput(output.to_path_buf())),
    }
}

/// Remove any leftover `.part` file for `output`
pub async fn discard_partial(output: &Path) {
    let _ = fs::remove_file(part_path(output)).await;
}

/// Capture through an external program.
///
/// The template is split on whitespace; these placeholders are substituted
/// in every argument:
///
/// | Placeholder | Value |
/// |-------------|-------|
/// | `{url}` | absolute page URL |
/// | `{output}` | file the program must write (a `.part` path) |
/// | `{width}` / `{height}` | device viewport |
/// | `{device}` | device profile name |
/// | `{env}` | `staging` or `production` |
#[derive(Debug, Clone)]
pub struct CommandAcquirer {
    program: String,
    args: Vec<String>,
}

impl CommandAcquirer {
    /// Parse a command template such as
    /// `shot-scraper {url} -o {output} --width {width} --height {height}`
    pub fn from_template(template: &str) -> CaptureResult<Self> {
        let mut parts = template.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| CaptureError::Config("capture command is empty".to_string()))?;
        let args: Vec<String> = parts.collect();

        if !args.iter().any(|a| a.contains("{url}")) {
            return Err(CaptureError::Config(
                "capture command must contain {url}".to_string(),
            ));
        }
        if !args.iter().any(|a| a.contains("{output}")) {
            return Err(CaptureError::Config(
                "capture command must contain {output}".to_string(),
            ));
        }

        Ok(Self { program, args })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Substitute placeholders for one request
    pub fn expand_args(&self, request: &CaptureRequest) -> Vec<String> {
        let (width, height) = request.device.viewport();
        let part = request.part_path();
        let part = part.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{url}", &request.url)
                    .replace("{output}", &part)
                    .replace("{width}", &width.to_string())
                    .replace("{height}", &height.to_string())
                    .replace("{device}", &request.device.name())
                    .replace("{env}", request.environment.label())
            })
            .collect()
    }
}

impl Acquirer for CommandAcquirer {
    async fn capture(&self, request: &CaptureRequest) -> CaptureResult<()> {
        let args = self.expand_args(request);
        log::debug!("running {} {}", self.program, args.join(" "));

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| CaptureError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            discard_partial(&request.output).await;
            return Err(CaptureError::Command {
                status: output.status.to_string(),
                stderr: excerpt(&String::from_utf8_lossy(&output.stderr)),
            });
        }

        commit_part(&request.output).await
    }

    fn source_type(&self) -> &str {
        "command"
    }
}

/// Trim captured stderr to its last `STDERR_EXCERPT` characters
fn excerpt(text: &str) -> String {
    let trimmed = text.trim();
    let count = trimmed.chars().count();
    if count <= STDERR_EXCERPT {
        return trimmed.to_string();
    }
    let tail: String = trimmed.chars().skip(count - STDERR_EXCERPT).collect();
    format!("...{}", tail)
}

/// Runtime-selected acquirer (CLI `--acquirer`)
#[derive(Debug, Clone)]
pub enum AnyAcquirer {
    Command(CommandAcquirer),
    Service(ServiceAcquirer),
    Synthetic(SyntheticAcquirer),
}

impl Acquirer for AnyAcquirer {
    async fn capture(&self, request: &CaptureRequest) -> CaptureResult<()> {
        match self {
            AnyAcquirer::Command(a) => a.capture(request).await,
            AnyAcquirer::Service(a) => a.capture(request).await,
            AnyAcquirer::Synthetic(a) => a.capture(request).await,
        }
    }

    fn source_type(&self) -> &str {
        match self {
            AnyAcquirer::Command(a) => a.source_type(),
            AnyAcquirer::Service(a) => a.source_type(),
            AnyAcquirer::Synthetic(a) => a.source_type(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceProfile;
    use crate::pages::Environment;
    use std::path::PathBuf;

    fn request(output: PathBuf) -> CaptureRequest {
        CaptureRequest {
            url: "https://staging.example.com/apply/".to_string(),
            output,
            device: DeviceProfile::Mobile,
            environment: Environment::Staging,
        }
    }

    #[test]
    fn test_template_requires_placeholders() {
        assert!(matches!(
            CommandAcquirer::from_template(""),
            Err(CaptureError::Config(_))
        ));
        assert!(matches!(
            CommandAcquirer::from_template("shoot {url}"),
            Err(CaptureError::Config(_))
        ));
        assert!(CommandAcquirer::from_template("shoot {url} -o {output}").is_ok());
    }

    #[test]
    fn test_expand_args() {
        let acquirer =
            CommandAcquirer::from_template("shoot --viewport={width}x{height} {url} {output} {device} {env}")
                .unwrap();
        let args = acquirer.expand_args(&request(PathBuf::from("out/a.png")));
        assert_eq!(acquirer.program(), "shoot");
        assert_eq!(
            args,
            vec![
                "--viewport=375x812".to_string(),
                "https://staging.example.com/apply/".to_string(),
                "out/a.png.part".to_string(),
                "mobile".to_string(),
                "staging".to_string(),
            ]
        );
    }

    #[test]
    fn test_excerpt_keeps_tail() {
        let long = "x".repeat(STDERR_EXCERPT + 10) + "END";
        let short = excerpt(&long);
        assert!(short.starts_with("..."));
        assert!(short.ends_with("END"));
        assert_eq!(excerpt("  oops \n"), "oops");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_success_commits_file() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = dir.path().join("fixture.png");
        std::fs::write(&fixture, b"png-bytes").unwrap();
        let output = dir.path().join("page.png");

        // Stand-in capture program: `shoot.sh <url> <output>`
        let script = dir.path().join("shoot.sh");
        std::fs::write(
            &script,
            format!("#!/bin/sh\ncp '{}' \"$2\"\n", fixture.display()),
        )
        .unwrap();
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        let acquirer =
            CommandAcquirer::from_template(&format!("{} {{url}} {{output}}", script.display()))
                .unwrap();

        acquirer.capture(&request(output.clone())).await.unwrap();
        assert_eq!(std::fs::read(&output).unwrap(), b"png-bytes");
        assert!(!part_path(&output).exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_failure_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("page.png");
        let acquirer = CommandAcquirer::from_template("false {url} {output}").unwrap();

        let err = acquirer.capture(&request(output.clone())).await.unwrap_err();
        assert!(matches!(err, CaptureError::Command { .. }));
        assert!(!output.exists());
        assert!(!part_path(&output).exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_success_without_output_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("page.png");
        let acquirer = CommandAcquirer::from_template("true {url} {output}").unwrap();

        let err = acquirer.capture(&request(output.clone())).await.unwrap_err();
        assert!(matches!(err, CaptureError::NoOutput(_)));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let acquirer =
            CommandAcquirer::from_template("visual-parity-no-such-program {url} {output}").unwrap();
        let err = acquirer
            .capture(&request(dir.path().join("page.png")))
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::Spawn { .. }));
    }
}
