//! HTTP screenshot service client.
//!
//! Talks to a headless-browser rendering service (browserless-style
//! `POST /screenshot`) through `curl`:
//! - The request body carries the URL and viewport as JSON
//! - The PNG response body is written straight to the `.part` file
//! - HTTP errors and connection failures become [`CaptureError::Service`]
//!
//! A connection-only health check is available for use before a run.

use std::process::Stdio;
use tokio::process::Command;

use super::backend::{Acquirer, commit_part, discard_partial};
use super::types::{CaptureError, CaptureRequest, CaptureResult};

/// Default connection timeout (seconds)
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 10;

/// Screenshot service acquirer
#[derive(Debug, Clone)]
pub struct ServiceAcquirer {
    /// Full endpoint URL, e.g. `http://127.0.0.1:3000/screenshot`
    pub endpoint: String,
    /// Timeout for the initial connection (seconds)
    pub connect_timeout: u64,
    /// Capture the full scrollable page rather than the viewport
    pub full_page: bool,
}

impl ServiceAcquirer {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            full_page: true,
        }
    }

    pub fn connect_timeout(mut self, seconds: u64) -> Self {
        self.connect_timeout = seconds;
        self
    }

    pub fn full_page(mut self, full_page: bool) -> Self {
        self.full_page = full_page;
        self
    }

    /// JSON body sent for one request
    pub fn request_body(&self, request: &CaptureRequest) -> serde_json::Value {
        let (width, height) = request.device.viewport();
        serde_json::json!({
            "url": request.url,
            "options": {
                "type": "png",
                "fullPage": self.full_page,
            },
            "viewport": {
                "width": width,
                "height": height,
            },
        })
    }
}

impl Acquirer for ServiceAcquirer {
    async fn capture(&self, request: &CaptureRequest) -> CaptureResult<()> {
        let body = serde_json::to_string(&self.request_body(request))
            .map_err(|e| CaptureError::Failed(e.to_string()))?;
        let part = request.part_path();

        let output = Command::new("curl")
            .args([
                "-s",
                "-S",
                "-f",
                "-X", "POST",
                &self.endpoint,
                "-H", "Content-Type: application/json",
                "-d", &body,
                "--connect-timeout", &self.connect_timeout.to_string(),
                "-o", &part.to_string_lossy(),
                "-w", "%{http_code}",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| CaptureError::Spawn {
                program: "curl".to_string(),
                source,
            })?;

        let code: u16 = String::from_utf8_lossy(&output.stdout)
            .trim()
            .parse()
            .unwrap_or(0);

        if !output.status.success() || !(200..300).contains(&code) {
            discard_partial(&request.output).await;
            let reason = if code == 0 {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                format!("connection to {} failed: {}", self.endpoint, stderr)
            } else {
                format!("{} returned HTTP {}", self.endpoint, code)
            };
            return Err(CaptureError::Service(reason));
        }

        commit_part(&request.output).await
    }

    fn source_type(&self) -> &str {
        "service"
    }
}

/// Check if a screenshot service is reachable (connection-only check).
///
/// Any HTTP response, even an error status, counts as reachable.
pub async fn check_health(endpoint: &str, timeout_secs: u64) -> CaptureResult<bool> {
    let url = endpoint.trim_start_matches("http://").trim_start_matches("https://");
    let host_port = url.split('/').next().unwrap_or("127.0.0.1:3000");
    let scheme = if endpoint.starts_with("https://") { "https" } else { "http" };

    let output = Command::new("curl")
        .args([
            "-s",
            "-o", "/dev/null",
            "-w", "%{http_code}",
            "--connect-timeout", &timeout_secs.to_string(),
            "--max-time", &timeout_secs.to_string(),
            "-I",
            &format!("{}://{}", scheme, host_port),
        ])
        .output()
        .await?;

    let status = String::from_utf8_lossy(&output.stdout);
    // 000 means connection failed entirely
    let code: u16 = status.trim().parse().unwrap_or(0);
    Ok(code > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceProfile;
    use crate::pages::Environment;
    use httpmock::prelude::*;
    use std::path::PathBuf;

    fn curl_available() -> bool {
        std::process::Command::new("curl")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn request(output: PathBuf) -> CaptureRequest {
        CaptureRequest {
            url: "https://www.example.com/apply/".to_string(),
            output,
            device: DeviceProfile::Desktop,
            environment: Environment::Production,
        }
    }

    #[test]
    fn test_request_body() {
        let acquirer = ServiceAcquirer::new("http://127.0.0.1:3000/screenshot").full_page(false);
        let body = acquirer.request_body(&request(PathBuf::from("x.png")));
        assert_eq!(body["url"], "https://www.example.com/apply/");
        assert_eq!(body["options"]["fullPage"], false);
        assert_eq!(body["viewport"]["width"], 1280);
        assert_eq!(body["viewport"]["height"], 800);
    }

    #[tokio::test]
    async fn test_service_capture_writes_body() {
        if !curl_available() {
            eprintln!("curl not installed, skipping");
            return;
        }
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/screenshot");
                then.status(200)
                    .header("content-type", "image/png")
                    .body("fake-png");
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("page.png");
        let acquirer = ServiceAcquirer::new(server.url("/screenshot"));
        acquirer.capture(&request(output.clone())).await.unwrap();

        mock.assert_async().await;
        assert_eq!(std::fs::read(&output).unwrap(), b"fake-png");
    }

    #[tokio::test]
    async fn test_service_error_status() {
        if !curl_available() {
            eprintln!("curl not installed, skipping");
            return;
        }
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/screenshot");
                then.status(504).body("navigation timeout");
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("page.png");
        let acquirer = ServiceAcquirer::new(server.url("/screenshot"));
        let err = acquirer.capture(&request(output.clone())).await.unwrap_err();

        match err {
            CaptureError::Service(msg) => assert!(msg.contains("HTTP 504"), "{}", msg),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!output.exists());
    }
}
