//! Error types for the print job orchestrator.
//!
//! Every collaborator fault is caught at the orchestrator boundary and
//! converted to one of these kinds; nothing propagates unhandled to the
//! dispatcher or the reconciliation timer.

use thiserror::Error;

use fabrik_core::JobId;

/// A result type using `AgentError`.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors that can occur in orchestrator operations.
#[derive(Debug, Error)]
pub enum AgentError {
    /// A start was attempted while a job is active.
    #[error("print job {0} is already active")]
    JobAlreadyActive(JobId),

    /// A cancel was attempted with no active job.
    #[error("no print job is active")]
    NoActiveJob,

    /// The printer was not ready to accept a new job.
    #[error("printer is not ready")]
    PrinterNotReady,

    /// The print file could not be staged from object storage.
    #[error("staging failed: {0}")]
    StagingFailed(String),

    /// The staged file could not be uploaded to the printer controller.
    #[error("file upload to printer controller failed")]
    UploadFailed,

    /// The printer controller rejected the start command.
    #[error("printer controller failed to start the print")]
    StartFailed,

    /// The printer controller rejected the cancel command.
    #[error("printer controller failed to cancel the print")]
    CancelFailed,

    /// An unclassified fault in an orchestrator operation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AgentError {
    /// Returns the appropriate HTTP status code for this error.
    ///
    /// State conflicts are the caller's fault (409); everything else is an
    /// operation failure on the agent side (500).
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::JobAlreadyActive(_) | Self::NoActiveJob => 409,
            Self::PrinterNotReady
            | Self::StagingFailed(_)
            | Self::UploadFailed
            | Self::StartFailed
            | Self::CancelFailed
            | Self::Internal(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_conflicts_are_client_errors() {
        let job_id = JobId::new("J1").unwrap();
        assert_eq!(AgentError::JobAlreadyActive(job_id).http_status_code(), 409);
        assert_eq!(AgentError::NoActiveJob.http_status_code(), 409);
    }

    #[test]
    fn operation_failures_are_server_errors() {
        assert_eq!(AgentError::PrinterNotReady.http_status_code(), 500);
        assert_eq!(
            AgentError::StagingFailed("timeout".into()).http_status_code(),
            500
        );
        assert_eq!(AgentError::UploadFailed.http_status_code(), 500);
        assert_eq!(AgentError::StartFailed.http_status_code(), 500);
        assert_eq!(AgentError::CancelFailed.http_status_code(), 500);
        assert_eq!(AgentError::Internal("x".into()).http_status_code(), 500);
    }
}
