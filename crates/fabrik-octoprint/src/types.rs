//! Printer state and job progress types.
//!
//! Both types are transient: they describe the controller at the moment of
//! the fetch and are re-fetched on every poll. The latest fetch always wins.

use serde::{Deserialize, Serialize};

/// Snapshot of the printer controller's readiness, re-fetched each poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterSnapshot {
    /// Readiness text as reported by the controller (e.g. "Operational",
    /// "Printing", "Error"). `"Error"` when the controller is unreachable.
    pub state_text: String,
}

impl PrinterSnapshot {
    /// Create a snapshot from the controller's readiness text.
    #[must_use]
    pub fn new(state_text: impl Into<String>) -> Self {
        Self {
            state_text: state_text.into(),
        }
    }

    /// Snapshot used when the controller could not be queried.
    #[must_use]
    pub fn unavailable() -> Self {
        Self::new("Error")
    }

    /// Classify the readiness text.
    ///
    /// The match is case-insensitive and substring-based because OctoPrint
    /// composes texts like "Offline after error".
    #[must_use]
    pub fn readiness(&self) -> Readiness {
        let text = self.state_text.to_ascii_lowercase();
        if text.contains("operational") || text.contains("ready") {
            Readiness::Ready
        } else if text.contains("error") || text.contains("offline") {
            Readiness::Fault
        } else {
            Readiness::Busy
        }
    }
}

/// Coarse readiness classification of a [`PrinterSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Idle and able to accept a new print.
    Ready,
    /// Errored or offline.
    Fault,
    /// Doing something (printing, paused, heating, ...).
    Busy,
}

/// Progress of the job the controller is currently running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobInfo {
    /// Completion fraction in `[0, 1]`.
    pub progress: f64,
    /// Seconds spent printing so far.
    pub print_time_seconds: u64,
    /// Estimated seconds remaining.
    pub print_time_left_seconds: u64,
    /// Job state text as reported by the controller.
    pub state_text: String,
}

impl JobInfo {
    /// Job info used when the controller could not be queried.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            progress: 0.0,
            print_time_seconds: 0,
            print_time_left_seconds: 0,
            state_text: "Error".to_string(),
        }
    }
}
