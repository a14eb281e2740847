//! Core types for the fabrik print agent.
//!
//! This crate provides the identifier types shared by every part of the
//! agent:
//!
//! - [`JobId`]: the print job identifier assigned by the job submitter
//! - [`FileId`]: the name of a print file in remote object storage
//! - [`DeviceId`]: the identity this device reports in telemetry
//!
//! # Example
//!
//! ```
//! use fabrik_core::{FileId, JobId};
//!
//! let job_id: JobId = "J-2043".parse().unwrap();
//! let file_id: FileId = "bracket_v2.gcode".parse().unwrap();
//! assert_eq!(job_id.as_str(), "J-2043");
//! assert_eq!(file_id.as_str(), "bracket_v2.gcode");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod ids;

pub use ids::{DeviceId, FileId, IdError, JobId};
