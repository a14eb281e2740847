//! Cloud telemetry for the fabrik print agent.
//!
//! Telemetry events are structured, timestamped records of agent and job
//! lifecycle occurrences, sent outbound to the cloud channel. Emission is
//! strictly fire-and-forget: a failed send is logged and swallowed so
//! telemetry can never block or fail the agent's control flow.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod event;
pub mod sink;

pub use event::{fields_from, EventKind, TelemetryEnvelope};
pub use sink::{HttpTelemetrySink, TelemetryError, TelemetryHandle, TelemetrySink};
