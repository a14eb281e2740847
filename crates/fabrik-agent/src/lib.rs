//! Print job lifecycle orchestration for the fabrik print agent.
//!
//! This crate owns the authoritative in-process state of the device: whether
//! a print is running, which job it is, and since when. The
//! [`orchestrator::PrintOrchestrator`] drives the printer controller through
//! a job from submission to completion and reconciles its progress against
//! the cloud telemetry channel on a fixed timer; the [`dispatcher`] maps
//! inbound remote commands onto orchestrator calls.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod lifecycle;
pub mod orchestrator;

pub use config::{AgentConfig, ConfigError};
pub use dispatcher::{dispatch, CommandResponse};
pub use error::{AgentError, Result};
pub use lifecycle::PrintState;
pub use orchestrator::{ActiveJob, PrintOrchestrator, StatusReport};
