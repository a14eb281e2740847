//! Telemetry event kinds and the wire envelope.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use fabrik_core::{DeviceId, JobId};

/// Convert a `json!` object literal into envelope fields.
///
/// Non-object values yield an empty field set.
#[must_use]
pub fn fields_from(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// The kinds of telemetry event the agent emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// The agent process came up.
    AgentStarted,
    /// The agent process shut down gracefully.
    AgentStopped,
    /// The agent hit an unrecoverable fault.
    AgentError,
    /// A print job started on the printer.
    PrintStarted,
    /// Periodic progress report for the active job.
    PrintProgress,
    /// The active job finished.
    PrintCompleted,
    /// The active job was cancelled on request.
    PrintCancelled,
    /// A start attempt or active job failed.
    PrintFailed,
}

impl EventKind {
    /// The event's wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AgentStarted => "agent_started",
            Self::AgentStopped => "agent_stopped",
            Self::AgentError => "agent_error",
            Self::PrintStarted => "print_started",
            Self::PrintProgress => "print_progress",
            Self::PrintCompleted => "print_completed",
            Self::PrintCancelled => "print_cancelled",
            Self::PrintFailed => "print_failed",
        }
    }
}

/// The message sent to the cloud channel for one event.
///
/// The envelope carries the event type, emission timestamp, device identity
/// and (when a job is active) the job id; event-specific fields are
/// flattened alongside them.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryEnvelope {
    /// What happened.
    pub event: EventKind,
    /// When it was emitted.
    pub timestamp: DateTime<Utc>,
    /// Which device emitted it.
    #[serde(rename = "deviceId")]
    pub device_id: DeviceId,
    /// The active job at emission time, if any.
    #[serde(rename = "jobId", skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    /// Event-specific payload fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn device() -> DeviceId {
        DeviceId::new("pi-mkt-01").unwrap()
    }

    #[test]
    fn event_names_are_snake_case() {
        assert_eq!(EventKind::PrintStarted.as_str(), "print_started");
        assert_eq!(
            serde_json::to_value(EventKind::AgentError).unwrap(),
            json!("agent_error")
        );
    }

    #[test]
    fn envelope_flattens_fields() {
        let mut fields = Map::new();
        fields.insert("fileId".to_string(), json!("part.gcode"));

        let envelope = TelemetryEnvelope {
            event: EventKind::PrintStarted,
            timestamp: Utc::now(),
            device_id: device(),
            job_id: Some(JobId::new("J1").unwrap()),
            fields,
        };

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["event"], "print_started");
        assert_eq!(value["deviceId"], "pi-mkt-01");
        assert_eq!(value["jobId"], "J1");
        assert_eq!(value["fileId"], "part.gcode");
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn envelope_omits_job_id_when_absent() {
        let envelope = TelemetryEnvelope {
            event: EventKind::AgentStarted,
            timestamp: Utc::now(),
            device_id: device(),
            job_id: None,
            fields: Map::new(),
        };

        let value = serde_json::to_value(&envelope).unwrap();
        assert!(value.get("jobId").is_none());
    }
}
