//! OctoPrint REST client for the fabrik print agent.
//!
//! The printer controller is a remote OctoPrint instance driving the
//! physical printer. This crate wraps its HTTP API behind the
//! [`PrinterControl`] trait so the orchestrator can be tested without a
//! printer.
//!
//! Every operation is best-effort from the caller's point of view: command
//! calls report success as a boolean and state fetches fall back to an
//! `"Error"` snapshot when the controller is unreachable. Nothing here
//! retries; a failed call fails the enclosing workflow.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod client;
pub mod types;

pub use client::{OctoPrintClient, PrinterControl};
pub use types::{JobInfo, PrinterSnapshot, Readiness};
