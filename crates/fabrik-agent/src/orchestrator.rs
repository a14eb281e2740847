//! Print job lifecycle orchestrator.
//!
//! This module provides the [`PrintOrchestrator`], the single owner of the
//! agent's job state. It executes the start/cancel/status workflows against
//! the printer controller and file stager, and runs the periodic
//! progress-reconciliation step that re-derives job state from the
//! controller's readiness.
//!
//! All three mutating operations serialize on one async mutex held for the
//! whole operation, so a timer fire can never interleave with a command.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tokio::sync::Mutex;
use tokio::time::Instant;

use fabrik_core::{FileId, JobId};
use fabrik_octoprint::{PrinterControl, Readiness};
use fabrik_staging::FileStager;
use fabrik_telemetry::{fields_from, EventKind, TelemetryHandle};

use crate::error::{AgentError, Result};
use crate::lifecycle::{self, PrintState};

/// Minimum interval between `print_progress` emissions.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(30);

/// The job currently occupying the print slot.
#[derive(Debug, Clone)]
pub struct ActiveJob {
    /// Identifier assigned by the job submitter.
    pub job_id: JobId,
    /// File being printed.
    pub file_id: FileId,
    /// When printing became active; `None` until the controller accepted
    /// the start command.
    pub started_at: Option<DateTime<Utc>>,
}

/// Point-in-time view of the orchestrator and printer, returned by
/// [`PrintOrchestrator::status`].
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    /// Whether a job is actively printing.
    #[serde(rename = "isPrinting")]
    pub is_printing: bool,
    /// The active job id, if any.
    #[serde(rename = "jobId", skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    /// The active file id, if any.
    #[serde(rename = "fileId", skip_serializing_if = "Option::is_none")]
    pub file_id: Option<FileId>,
    /// Printer readiness text, best-effort.
    #[serde(rename = "printerState")]
    pub printer_state: String,
    /// Job completion fraction in `[0, 1]`, best-effort.
    pub progress: f64,
    /// When this report was assembled.
    pub timestamp: DateTime<Utc>,
}

/// Mutable job state guarded by the orchestrator's mutex.
#[derive(Debug)]
struct JobSlot {
    state: PrintState,
    job: Option<ActiveJob>,
    /// When `print_progress` was last emitted; `None` means the next
    /// reconcile emits immediately.
    last_progress_report: Option<Instant>,
}

impl JobSlot {
    const fn empty() -> Self {
        Self {
            state: PrintState::Idle,
            job: None,
            last_progress_report: None,
        }
    }

    /// Clear the slot back to `Idle`.
    fn reset(&mut self) {
        self.state = PrintState::Idle;
        self.job = None;
        self.last_progress_report = None;
    }

    /// Perform a validated state transition.
    fn transition(&mut self, to: PrintState) -> Result<()> {
        if !lifecycle::is_valid_transition(self.state, to) {
            return Err(AgentError::Internal(format!(
                "invalid state transition {:?} -> {to:?}",
                self.state
            )));
        }
        self.state = to;
        Ok(())
    }
}

/// The print job lifecycle orchestrator.
///
/// Owns the single job slot and drives the three collaborators through the
/// start, cancel and reconcile workflows. Constructed once per process and
/// shared behind an `Arc`.
pub struct PrintOrchestrator {
    printer: Arc<dyn PrinterControl>,
    stager: Arc<dyn FileStager>,
    telemetry: TelemetryHandle,
    progress_interval: Duration,
    slot: Mutex<JobSlot>,
}

impl PrintOrchestrator {
    /// Create a new orchestrator with the default progress interval.
    #[must_use]
    pub fn new(
        printer: Arc<dyn PrinterControl>,
        stager: Arc<dyn FileStager>,
        telemetry: TelemetryHandle,
    ) -> Self {
        Self::with_progress_interval(printer, stager, telemetry, DEFAULT_PROGRESS_INTERVAL)
    }

    /// Create a new orchestrator with a custom progress interval.
    #[must_use]
    pub fn with_progress_interval(
        printer: Arc<dyn PrinterControl>,
        stager: Arc<dyn FileStager>,
        telemetry: TelemetryHandle,
        progress_interval: Duration,
    ) -> Self {
        Self {
            printer,
            stager,
            telemetry,
            progress_interval,
            slot: Mutex::new(JobSlot::empty()),
        }
    }

    /// Start a new print job.
    ///
    /// Checks printer readiness, stages the file, uploads it to the
    /// controller and issues the start command, in that order. A failure at
    /// any step emits exactly one `print_failed` event carrying the supplied
    /// ids and leaves the orchestrator `Idle`; only full success commits the
    /// job and emits `print_started`.
    ///
    /// # Errors
    ///
    /// Returns `JobAlreadyActive` if a job occupies the slot, or the error
    /// kind of the step that failed.
    pub async fn start_print_job(&self, job_id: JobId, file_id: FileId) -> Result<()> {
        let mut slot = self.slot.lock().await;

        if let Some(active) = &slot.job {
            return Err(AgentError::JobAlreadyActive(active.job_id.clone()));
        }

        if let Err(e) = self.run_start_steps(&mut slot, &job_id, &file_id).await {
            // No terminal success occurred; externally the call changed nothing.
            slot.reset();
            self.telemetry
                .emit(
                    EventKind::PrintFailed,
                    fields_from(json!({
                        "jobId": job_id,
                        "fileId": file_id,
                        "reason": start_failure_reason(&e),
                    })),
                )
                .await;
            tracing::warn!(job_id = %job_id, file_id = %file_id, error = %e, "Print start failed");
            return Err(e);
        }

        self.telemetry.set_active_job(Some(job_id.clone()));
        self.telemetry
            .emit(
                EventKind::PrintStarted,
                fields_from(json!({ "fileId": file_id })),
            )
            .await;

        tracing::info!(job_id = %job_id, file_id = %file_id, "Print job started");
        Ok(())
    }

    /// The fallible portion of the start workflow. The caller resets the
    /// slot and reports telemetry if this returns an error.
    async fn run_start_steps(
        &self,
        slot: &mut JobSlot,
        job_id: &JobId,
        file_id: &FileId,
    ) -> Result<()> {
        if !self.printer.is_ready().await {
            return Err(AgentError::PrinterNotReady);
        }

        slot.transition(PrintState::Downloading)?;
        slot.job = Some(ActiveJob {
            job_id: job_id.clone(),
            file_id: file_id.clone(),
            started_at: None,
        });

        let staged: PathBuf = self
            .stager
            .stage(file_id)
            .await
            .map_err(|e| AgentError::StagingFailed(e.to_string()))?;

        slot.transition(PrintState::Staging)?;
        if !self
            .printer
            .upload_and_select(&staged, file_id.as_str())
            .await
        {
            return Err(AgentError::UploadFailed);
        }

        if !self.printer.start_print().await {
            return Err(AgentError::StartFailed);
        }

        slot.transition(PrintState::Printing)?;
        if let Some(job) = slot.job.as_mut() {
            job.started_at = Some(Utc::now());
        }
        slot.last_progress_report = None;
        Ok(())
    }

    /// Cancel the active print job.
    ///
    /// Returns the cleared job so the caller can echo its identifiers.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveJob` if the slot is empty, or `CancelFailed` (state
    /// unchanged) if the controller rejects the cancel.
    pub async fn cancel_print_job(&self) -> Result<ActiveJob> {
        let mut slot = self.slot.lock().await;

        let Some(job) = slot.job.clone() else {
            return Err(AgentError::NoActiveJob);
        };

        if !self.printer.cancel_print().await {
            return Err(AgentError::CancelFailed);
        }

        self.telemetry
            .emit(
                EventKind::PrintCancelled,
                fields_from(json!({ "fileId": job.file_id })),
            )
            .await;

        slot.reset();
        self.telemetry.set_active_job(None);

        tracing::info!(job_id = %job.job_id, file_id = %job.file_id, "Print job cancelled");
        Ok(job)
    }

    /// Reconcile the active job against the printer's current state.
    ///
    /// Invoked on a fixed timer; a no-op while no job is active. Emits
    /// `print_progress` at most once per progress interval, and infers
    /// completion or failure from the controller's readiness text: a printer
    /// that reads idle/ready while we believe a job is running has finished
    /// it, and one that reads errored/offline has lost it. This inference is
    /// the only completion signal the controller API offers.
    pub async fn reconcile_progress(&self) {
        let mut slot = self.slot.lock().await;

        let Some(job) = slot.job.clone() else {
            return;
        };

        let info = self.printer.job_info().await;
        let snapshot = self.printer.printer_state().await;

        tracing::debug!(
            job_id = %job.job_id,
            state = %snapshot.state_text,
            progress = info.progress,
            print_time_left = info.print_time_left_seconds,
            "Reconciled printer state"
        );

        let due = slot
            .last_progress_report
            .map_or(true, |at| at.elapsed() >= self.progress_interval);
        if due {
            self.telemetry
                .emit(
                    EventKind::PrintProgress,
                    fields_from(json!({
                        "fileId": job.file_id,
                        "progress": info.progress,
                        "printTime": info.print_time_seconds,
                        "printTimeLeft": info.print_time_left_seconds,
                        "state": info.state_text,
                    })),
                )
                .await;
            slot.last_progress_report = Some(Instant::now());
        }

        match snapshot.readiness() {
            Readiness::Ready => {
                let duration_seconds = job
                    .started_at
                    .map_or(0, |at| (Utc::now() - at).num_seconds().max(0));

                self.telemetry
                    .emit(
                        EventKind::PrintCompleted,
                        fields_from(json!({
                            "fileId": job.file_id,
                            "printDuration": duration_seconds,
                            "success": true,
                        })),
                    )
                    .await;

                slot.reset();
                self.telemetry.set_active_job(None);
                tracing::info!(
                    job_id = %job.job_id,
                    duration_seconds,
                    "Print job completed"
                );
            }
            Readiness::Fault => {
                self.telemetry
                    .emit(
                        EventKind::PrintFailed,
                        fields_from(json!({
                            "fileId": job.file_id,
                            "reason": format!("printer error: {}", snapshot.state_text),
                            "success": false,
                        })),
                    )
                    .await;

                slot.reset();
                self.telemetry.set_active_job(None);
                tracing::warn!(
                    job_id = %job.job_id,
                    state = %snapshot.state_text,
                    "Print job failed"
                );
            }
            Readiness::Busy => {}
        }
    }

    /// Assemble a point-in-time status report.
    ///
    /// Pure read: never mutates the job slot and never fails. Collaborator
    /// fetch errors surface as the clients' best-effort defaults.
    pub async fn status(&self) -> StatusReport {
        let (state, job) = {
            let slot = self.slot.lock().await;
            (slot.state, slot.job.clone())
        };

        let snapshot = self.printer.printer_state().await;
        let info = self.printer.job_info().await;

        StatusReport {
            is_printing: state == PrintState::Printing,
            job_id: job.as_ref().map(|j| j.job_id.clone()),
            file_id: job.map(|j| j.file_id),
            printer_state: snapshot.state_text,
            progress: info.progress,
            timestamp: Utc::now(),
        }
    }

    /// The orchestrator's current lifecycle state.
    pub async fn print_state(&self) -> PrintState {
        self.slot.lock().await.state
    }
}

/// Telemetry reason for a failed start attempt.
fn start_failure_reason(error: &AgentError) -> String {
    match error {
        AgentError::PrinterNotReady => "printer_not_ready".to_string(),
        AgentError::StagingFailed(_) => "download_failed".to_string(),
        AgentError::UploadFailed => "upload_failed".to_string(),
        AgentError::StartFailed => "start_failed".to_string(),
        other => other.to_string(),
    }
}
