//! Telemetry sinks and the swallow-on-failure emission handle.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use thiserror::Error;

use fabrik_core::{DeviceId, JobId};

use crate::event::{EventKind, TelemetryEnvelope};

/// Errors a sink can report. The [`TelemetryHandle`] logs and discards them.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The HTTP request failed.
    #[error("telemetry request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The ingest endpoint answered with a non-success status.
    #[error("telemetry endpoint returned status {0}")]
    Status(u16),
}

/// Trait for forwarding telemetry envelopes to the cloud channel.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    /// Send one envelope.
    ///
    /// # Errors
    ///
    /// Returns a [`TelemetryError`] if the envelope could not be delivered.
    async fn send(&self, envelope: &TelemetryEnvelope) -> Result<(), TelemetryError>;
}

/// Sink that POSTs envelopes as JSON to an ingest URL.
#[derive(Debug, Clone)]
pub struct HttpTelemetrySink {
    client: reqwest::Client,
    ingest_url: String,
}

impl HttpTelemetrySink {
    /// Create a new sink posting to `ingest_url`.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should never happen with
    /// default TLS).
    #[must_use]
    pub fn new(ingest_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .expect("failed to create HTTP client");

        Self {
            client,
            ingest_url: ingest_url.into(),
        }
    }
}

#[async_trait]
impl TelemetrySink for HttpTelemetrySink {
    async fn send(&self, envelope: &TelemetryEnvelope) -> Result<(), TelemetryError> {
        let response = self
            .client
            .post(&self.ingest_url)
            .json(envelope)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(TelemetryError::Status(response.status().as_u16()))
        }
    }
}

/// Cloneable handle the rest of the agent emits through.
///
/// The handle stamps each event with the device identity, emission time and
/// the currently active job id, then hands it to the sink. Sink failures are
/// logged and swallowed; `emit` cannot fail.
#[derive(Clone)]
pub struct TelemetryHandle {
    sink: Arc<dyn TelemetrySink>,
    device_id: DeviceId,
    active_job: Arc<RwLock<Option<JobId>>>,
}

impl TelemetryHandle {
    /// Create a handle emitting through `sink` as `device_id`.
    #[must_use]
    pub fn new(sink: Arc<dyn TelemetrySink>, device_id: DeviceId) -> Self {
        Self {
            sink,
            device_id,
            active_job: Arc::new(RwLock::new(None)),
        }
    }

    /// Record which job id gets attached to subsequent events.
    pub fn set_active_job(&self, job_id: Option<JobId>) {
        *self.active_job.write() = job_id;
    }

    /// The job id currently attached to events, if any.
    #[must_use]
    pub fn active_job(&self) -> Option<JobId> {
        self.active_job.read().clone()
    }

    /// Emit one event with the given payload fields.
    pub async fn emit(&self, event: EventKind, fields: Map<String, Value>) {
        let envelope = TelemetryEnvelope {
            event,
            timestamp: Utc::now(),
            device_id: self.device_id.clone(),
            job_id: self.active_job(),
            fields,
        };

        match self.sink.send(&envelope).await {
            Ok(()) => {
                tracing::debug!(event = envelope.event.as_str(), "Telemetry sent");
            }
            Err(e) => {
                tracing::warn!(
                    event = envelope.event.as_str(),
                    error = %e,
                    "Failed to send telemetry"
                );
            }
        }
    }
}
