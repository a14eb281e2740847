//! Remote command dispatcher.
//!
//! Maps named commands arriving over the command channel onto
//! [`PrintOrchestrator`] operations and folds the outcome into an HTTP-style
//! status code plus JSON body. The dispatcher itself never fails: every
//! outcome, including malformed payloads and unknown commands, becomes a
//! well-formed [`CommandResponse`].

use serde_json::{json, Value};

use fabrik_core::{FileId, JobId};

use crate::orchestrator::PrintOrchestrator;

/// Outcome of a dispatched command.
#[derive(Debug, Clone)]
pub struct CommandResponse {
    /// HTTP-style status code.
    pub status: u16,
    /// JSON body to return to the caller.
    pub body: Value,
}

impl CommandResponse {
    fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": message.into() }),
        }
    }
}

/// Dispatch a named command with its JSON payload.
///
/// Recognized commands are `startPrint`, `cancelPrint` and `getStatus`
/// (camelCase on the wire, like the payload fields); anything else yields
/// 404. Payload validation failures yield 400, state conflicts 409, and
/// operation failures 500.
pub async fn dispatch(
    orchestrator: &PrintOrchestrator,
    command: &str,
    payload: &Value,
) -> CommandResponse {
    match command {
        "startPrint" => start_print(orchestrator, payload).await,
        "cancelPrint" => cancel_print(orchestrator).await,
        "getStatus" => get_status(orchestrator).await,
        other => {
            tracing::warn!(command = other, "Unknown command received");
            CommandResponse::error(404, format!("unknown command: {other}"))
        }
    }
}

async fn start_print(orchestrator: &PrintOrchestrator, payload: &Value) -> CommandResponse {
    let job_id = match required_id(payload, "jobId", |s| JobId::new(s)) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let file_id = match required_id(payload, "fileId", |s| FileId::new(s)) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match orchestrator
        .start_print_job(job_id.clone(), file_id.clone())
        .await
    {
        Ok(()) => CommandResponse::ok(json!({
            "status": "started",
            "jobId": job_id,
            "fileId": file_id,
        })),
        Err(e) => CommandResponse::error(e.http_status_code(), e.to_string()),
    }
}

async fn cancel_print(orchestrator: &PrintOrchestrator) -> CommandResponse {
    match orchestrator.cancel_print_job().await {
        Ok(job) => CommandResponse::ok(json!({
            "status": "cancelled",
            "jobId": job.job_id,
            "fileId": job.file_id,
        })),
        Err(e) => CommandResponse::error(e.http_status_code(), e.to_string()),
    }
}

async fn get_status(orchestrator: &PrintOrchestrator) -> CommandResponse {
    let report = orchestrator.status().await;
    match serde_json::to_value(&report) {
        Ok(body) => CommandResponse::ok(body),
        Err(e) => CommandResponse::error(500, format!("failed to serialize status: {e}")),
    }
}

/// Extract a required string field and parse it as an identifier.
fn required_id<T, E: std::fmt::Display>(
    payload: &Value,
    field: &str,
    parse: impl FnOnce(&str) -> Result<T, E>,
) -> Result<T, CommandResponse> {
    let Some(raw) = payload.get(field).and_then(Value::as_str) else {
        return Err(CommandResponse::error(
            400,
            format!("missing required field: {field}"),
        ));
    };
    parse(raw).map_err(|e| CommandResponse::error(400, format!("invalid {field}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fabrik_core::DeviceId;
    use fabrik_octoprint::{JobInfo, PrinterControl, PrinterSnapshot};
    use fabrik_staging::{FileStager, StagingError};
    use fabrik_telemetry::{TelemetryEnvelope, TelemetryError, TelemetryHandle, TelemetrySink};
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    /// Printer that is always operational and accepts every command.
    struct CompliantPrinter;

    #[async_trait]
    impl PrinterControl for CompliantPrinter {
        async fn printer_state(&self) -> PrinterSnapshot {
            PrinterSnapshot::new("Operational")
        }

        async fn job_info(&self) -> JobInfo {
            JobInfo::unavailable()
        }

        async fn upload_and_select(&self, _local_path: &Path, _name: &str) -> bool {
            true
        }

        async fn start_print(&self) -> bool {
            true
        }

        async fn cancel_print(&self) -> bool {
            true
        }
    }

    struct StubStager;

    #[async_trait]
    impl FileStager for StubStager {
        async fn stage(&self, file_id: &FileId) -> Result<PathBuf, StagingError> {
            Ok(PathBuf::from("/tmp").join(file_id.as_str()))
        }
    }

    struct NullSink;

    #[async_trait]
    impl TelemetrySink for NullSink {
        async fn send(&self, _envelope: &TelemetryEnvelope) -> Result<(), TelemetryError> {
            Ok(())
        }
    }

    fn orchestrator() -> PrintOrchestrator {
        let telemetry =
            TelemetryHandle::new(Arc::new(NullSink), DeviceId::new("test-device").unwrap());
        PrintOrchestrator::new(Arc::new(CompliantPrinter), Arc::new(StubStager), telemetry)
    }

    #[tokio::test]
    async fn unknown_command_is_404() {
        let orch = orchestrator();
        let response = dispatch(&orch, "reboot", &json!({})).await;
        assert_eq!(response.status, 404);
        assert!(response.body["error"]
            .as_str()
            .unwrap()
            .contains("unknown command"));
    }

    #[tokio::test]
    async fn wire_command_names_are_camel_case() {
        let orch = orchestrator();
        let started = dispatch(
            &orch,
            "startPrint",
            &json!({ "jobId": "J1", "fileId": "bench.gcode" }),
        )
        .await;
        assert_eq!(started.status, 200);
        assert_eq!(
            dispatch(&orch, "getStatus", &json!({})).await.status,
            200
        );
        assert_eq!(
            dispatch(&orch, "cancelPrint", &json!({})).await.status,
            200
        );

        // The snake_case spellings are not part of the wire protocol.
        for name in ["start_print", "cancel_print", "get_status"] {
            assert_eq!(dispatch(&orch, name, &json!({})).await.status, 404);
        }
    }

    #[tokio::test]
    async fn start_print_requires_job_id() {
        let orch = orchestrator();
        let response = dispatch(&orch, "startPrint", &json!({ "fileId": "F1" })).await;
        assert_eq!(response.status, 400);
        assert!(response.body["error"].as_str().unwrap().contains("jobId"));
    }

    #[tokio::test]
    async fn start_print_rejects_empty_file_id() {
        let orch = orchestrator();
        let response =
            dispatch(&orch, "startPrint", &json!({ "jobId": "J1", "fileId": "" })).await;
        assert_eq!(response.status, 400);
        assert!(response.body["error"].as_str().unwrap().contains("fileId"));
    }

    #[tokio::test]
    async fn start_print_succeeds_and_echoes_ids() {
        let orch = orchestrator();
        let response = dispatch(
            &orch,
            "startPrint",
            &json!({ "jobId": "J1", "fileId": "bench.gcode" }),
        )
        .await;
        assert_eq!(response.status, 200);
        assert_eq!(response.body["status"], "started");
        assert_eq!(response.body["jobId"], "J1");
        assert_eq!(response.body["fileId"], "bench.gcode");
    }

    #[tokio::test]
    async fn duplicate_start_is_409() {
        let orch = orchestrator();
        let payload = json!({ "jobId": "J1", "fileId": "bench.gcode" });
        dispatch(&orch, "startPrint", &payload).await;

        let response = dispatch(&orch, "startPrint", &payload).await;
        assert_eq!(response.status, 409);
        assert!(response.body["error"]
            .as_str()
            .unwrap()
            .contains("already active"));
    }

    #[tokio::test]
    async fn cancel_without_job_is_409() {
        let orch = orchestrator();
        let response = dispatch(&orch, "cancelPrint", &json!({})).await;
        assert_eq!(response.status, 409);
    }

    #[tokio::test]
    async fn cancel_clears_started_job() {
        let orch = orchestrator();
        dispatch(
            &orch,
            "startPrint",
            &json!({ "jobId": "J1", "fileId": "bench.gcode" }),
        )
        .await;

        let response = dispatch(&orch, "cancelPrint", &json!({})).await;
        assert_eq!(response.status, 200);
        assert_eq!(response.body["status"], "cancelled");
        assert_eq!(response.body["jobId"], "J1");
    }

    #[tokio::test]
    async fn get_status_reports_printer_and_job() {
        let orch = orchestrator();
        let response = dispatch(&orch, "getStatus", &json!({})).await;
        assert_eq!(response.status, 200);
        assert_eq!(response.body["isPrinting"], false);
        assert_eq!(response.body["printerState"], "Operational");
    }
}
