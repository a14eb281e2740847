//! Print job state machine.
//!
//! This module defines the valid state transitions for the single print job
//! slot the agent owns.
//!
//! # State Machine
//!
//! ```text
//!   ┌────────┐   start    ┌─────────────┐   staged   ┌─────────┐
//!   │  Idle  │───────────▶│ Downloading │───────────▶│ Staging │
//!   └────────┘            └──────┬──────┘            └────┬────┘
//!        ▲                       │                        │ controller
//!        │                       │ (failure)              │ started
//!        │                       ▼                        ▼
//!        │                  back to Idle            ┌──────────┐
//!        └──────────────────────────────────────────│ Printing │
//!          completed / failed / cancelled           └──────────┘
//! ```
//!
//! Terminal outcomes always fold back to `Idle`; there is no job history.

/// The orchestrator's position in the print job lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintState {
    /// No job; ready to accept one.
    Idle,
    /// Fetching the print file from object storage.
    Downloading,
    /// Uploading the staged file to the printer controller.
    Staging,
    /// The controller is printing the job.
    Printing,
}

/// Check if a state transition is valid according to the state machine.
#[must_use]
pub const fn is_valid_transition(from: PrintState, to: PrintState) -> bool {
    use PrintState::{Downloading, Idle, Printing, Staging};

    matches!(
        (from, to),
        // The start workflow advances one step at a time
        (Idle, Downloading) | (Downloading, Staging) | (Staging, Printing)
            // Any mid-workflow failure or terminal outcome folds back to Idle
            | (Downloading | Staging | Printing, Idle)
    )
}
