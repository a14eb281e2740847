//! HTTP client for the OctoPrint printer controller.
//!
//! This module provides the [`PrinterControl`] trait and its reqwest-backed
//! implementation. Control-plane calls carry a short timeout; the file
//! upload, which ships whole g-code files, gets a long one.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::types::{JobInfo, PrinterSnapshot, Readiness};

/// Header carrying the OctoPrint API key.
const API_KEY_HEADER: &str = "X-Api-Key";

/// Timeout for control-plane calls (state, job, start, cancel).
const CONTROL_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for file uploads.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Trait for driving the printer controller.
///
/// Failures are reported as `false` / best-effort defaults rather than
/// errors: the controller being unreachable and the controller refusing a
/// command are the same thing to the orchestrator, namely "operation
/// failed".
#[async_trait]
pub trait PrinterControl: Send + Sync {
    /// Fetch the printer's readiness snapshot.
    ///
    /// Returns [`PrinterSnapshot::unavailable`] if the controller cannot be
    /// queried.
    async fn printer_state(&self) -> PrinterSnapshot;

    /// Whether the printer is idle and able to accept a new print.
    async fn is_ready(&self) -> bool {
        self.printer_state().await.readiness() == Readiness::Ready
    }

    /// Fetch progress of the currently running job.
    ///
    /// Returns [`JobInfo::unavailable`] if the controller cannot be queried.
    async fn job_info(&self) -> JobInfo;

    /// Upload a staged file to the controller and select it for printing.
    async fn upload_and_select(&self, local_path: &Path, name: &str) -> bool;

    /// Start printing the selected file.
    async fn start_print(&self) -> bool;

    /// Cancel the running print.
    async fn cancel_print(&self) -> bool;
}

/// HTTP client for an OctoPrint instance.
#[derive(Debug, Clone)]
pub struct OctoPrintClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    upload_timeout: Duration,
}

impl OctoPrintClient {
    /// Create a new client for the controller at `base_url`.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should never happen with
    /// default TLS).
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(CONTROL_TIMEOUT)
            .connect_timeout(CONTROL_TIMEOUT)
            .build()
            .expect("failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            upload_timeout: UPLOAD_TIMEOUT,
        }
    }

    /// Get the controller base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch_printer_state(&self) -> Result<PrinterSnapshot, reqwest::Error> {
        let response: PrinterStateResponse = self
            .client
            .get(format!("{}/api/printer", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(PrinterSnapshot::new(response.state.text))
    }

    async fn fetch_job_info(&self) -> Result<JobInfo, reqwest::Error> {
        let response: JobResponse = self
            .client
            .get(format!("{}/api/job", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.into_job_info())
    }

    async fn post_job_command(&self, command: &str) -> Result<(), reqwest::Error> {
        self.client
            .post(format!("{}/api/job", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&json!({ "command": command }))
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}

#[async_trait]
impl PrinterControl for OctoPrintClient {
    async fn printer_state(&self) -> PrinterSnapshot {
        match self.fetch_printer_state().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch printer state");
                PrinterSnapshot::unavailable()
            }
        }
    }

    async fn job_info(&self) -> JobInfo {
        match self.fetch_job_info().await {
            Ok(info) => info,
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch job info");
                JobInfo::unavailable()
            }
        }
    }

    async fn upload_and_select(&self, local_path: &Path, name: &str) -> bool {
        // Streamed from disk; g-code files can be tens of megabytes.
        let file = match tokio::fs::File::open(local_path).await {
            Ok(file) => file,
            Err(e) => {
                tracing::error!(
                    path = %local_path.display(),
                    error = %e,
                    "Failed to open staged file for upload"
                );
                return false;
            }
        };
        let length = match file.metadata().await {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                tracing::error!(
                    path = %local_path.display(),
                    error = %e,
                    "Failed to stat staged file for upload"
                );
                return false;
            }
        };

        let part = reqwest::multipart::Part::stream_with_length(reqwest::Body::from(file), length)
            .file_name(name.to_string());
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("select", "true")
            .text("print", "false");

        let result = self
            .client
            .post(format!("{}/api/files/local", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .multipart(form)
            .timeout(self.upload_timeout)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);

        match result {
            Ok(_) => {
                tracing::debug!(name = %name, "Uploaded and selected file");
                true
            }
            Err(e) => {
                tracing::error!(name = %name, error = %e, "Failed to upload file");
                false
            }
        }
    }

    async fn start_print(&self) -> bool {
        match self.post_job_command("start").await {
            Ok(()) => {
                tracing::debug!("Issued start command");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to start print");
                false
            }
        }
    }

    async fn cancel_print(&self) -> bool {
        match self.post_job_command("cancel").await {
            Ok(()) => {
                tracing::debug!("Issued cancel command");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to cancel print");
                false
            }
        }
    }
}

/// Response body of `GET /api/printer`.
#[derive(Debug, Deserialize)]
struct PrinterStateResponse {
    state: PrinterStateBody,
}

#[derive(Debug, Deserialize)]
struct PrinterStateBody {
    text: String,
}

/// Response body of `GET /api/job`.
#[derive(Debug, Deserialize)]
struct JobResponse {
    #[serde(default)]
    progress: ProgressBody,
    state: String,
}

#[derive(Debug, Default, Deserialize)]
struct ProgressBody {
    completion: Option<f64>,
    #[serde(rename = "printTime")]
    print_time: Option<f64>,
    #[serde(rename = "printTimeLeft")]
    print_time_left: Option<f64>,
}

impl JobResponse {
    /// OctoPrint reports completion as a percentage and times as seconds,
    /// both nullable while no job is loaded.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn into_job_info(self) -> JobInfo {
        JobInfo {
            progress: (self.progress.completion.unwrap_or(0.0) / 100.0).clamp(0.0, 1.0),
            print_time_seconds: self.progress.print_time.map_or(0, |t| t.max(0.0) as u64),
            print_time_left_seconds: self
                .progress
                .print_time_left
                .map_or(0, |t| t.max(0.0) as u64),
            state_text: self.state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OctoPrintClient {
        OctoPrintClient::new(server.uri(), "test-key")
    }

    #[tokio::test]
    async fn printer_state_parses_readiness_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/printer"))
            .and(header(API_KEY_HEADER, "test-key"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "state": { "text": "Operational" } })),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let snapshot = client.printer_state().await;
        assert_eq!(snapshot.state_text, "Operational");
        assert!(client.is_ready().await);
    }

    #[tokio::test]
    async fn printer_state_defaults_to_error_on_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/printer"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let snapshot = client.printer_state().await;
        assert_eq!(snapshot, PrinterSnapshot::unavailable());
        assert!(!client.is_ready().await);
    }

    #[tokio::test]
    async fn job_info_converts_percent_to_fraction() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/job"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "progress": { "completion": 42.5, "printTime": 120.9, "printTimeLeft": 300.1 },
                "state": "Printing"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let info = client.job_info().await;
        assert!((info.progress - 0.425).abs() < 1e-9);
        assert_eq!(info.print_time_seconds, 120);
        assert_eq!(info.print_time_left_seconds, 300);
        assert_eq!(info.state_text, "Printing");
    }

    #[tokio::test]
    async fn job_info_handles_null_progress() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/job"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "progress": { "completion": null, "printTime": null, "printTimeLeft": null },
                "state": "Operational"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let info = client.job_info().await;
        assert!(info.progress.abs() < f64::EPSILON);
        assert_eq!(info.print_time_seconds, 0);
    }

    #[tokio::test]
    async fn job_info_defaults_on_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/job"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(client.job_info().await, JobInfo::unavailable());
    }

    #[tokio::test]
    async fn start_print_posts_start_command() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/job"))
            .and(body_json(json!({ "command": "start" })))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.start_print().await);
    }

    #[tokio::test]
    async fn cancel_print_reports_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/job"))
            .and(body_json(json!({ "command": "cancel" })))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(!client.cancel_print().await);
    }

    #[tokio::test]
    async fn upload_and_select_sends_file() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/files/local"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("part.gcode");
        tokio::fs::write(&file_path, b"G28\nG1 X10\n").await.unwrap();

        let client = client_for(&server);
        assert!(client.upload_and_select(&file_path, "part.gcode").await);
    }

    #[tokio::test]
    async fn upload_streams_file_contents_from_disk() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/files/local"))
            .and(body_string_contains("G1 X10"))
            .and(body_string_contains("part.gcode"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("part.gcode");
        tokio::fs::write(&file_path, b"G28\nG1 X10\n").await.unwrap();

        let client = client_for(&server);
        assert!(client.upload_and_select(&file_path, "part.gcode").await);
    }

    #[tokio::test]
    async fn upload_fails_for_missing_file() {
        let server = MockServer::start().await;
        let client = client_for(&server);
        let missing = Path::new("/nonexistent/part.gcode");
        assert!(!client.upload_and_select(missing, "part.gcode").await);
    }

    #[test]
    fn base_url_is_normalized() {
        let client = OctoPrintClient::new("http://printer.local:5000/", "k");
        assert_eq!(client.base_url(), "http://printer.local:5000");
    }
}
