//! Agent configuration from environment variables.
//!
//! Required variables name the external endpoints the device cannot guess;
//! everything else carries a default suited to a single-printer device. A
//! missing or malformed variable fails startup immediately rather than
//! surfacing later as a dead collaborator.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use fabrik_core::{DeviceId, IdError};

/// Errors raised while loading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    /// An environment variable holds a value that cannot be parsed.
    #[error("invalid value for {name}: {reason}")]
    Invalid {
        /// The variable name.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Runtime configuration for the print agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Identity this device reports in telemetry.
    pub device_id: DeviceId,
    /// Base URL of the OctoPrint controller.
    pub octoprint_url: String,
    /// OctoPrint API key.
    pub octoprint_api_key: String,
    /// Base URL files are downloaded from.
    pub storage_base_url: String,
    /// Local directory staged files are written to.
    pub staging_dir: PathBuf,
    /// Telemetry ingestion endpoint.
    pub telemetry_url: String,
    /// Address the command channel listens on.
    pub listen_addr: SocketAddr,
    /// How often the reconcile timer fires.
    pub poll_interval: Duration,
    /// Minimum spacing between progress telemetry emissions.
    pub progress_interval: Duration,
}

impl AgentConfig {
    /// Load the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value cannot
    /// be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load the configuration through a variable lookup function.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value cannot
    /// be parsed.
    pub fn from_lookup(
        lookup: impl Fn(&'static str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));

        let device_id = DeviceId::new(required("DEVICE_ID")?).map_err(|e: IdError| {
            ConfigError::Invalid {
                name: "DEVICE_ID",
                reason: e.to_string(),
            }
        })?;

        let octoprint_url = lookup("OCTOPRINT_URL")
            .unwrap_or_else(|| "http://localhost:5000".to_string());
        let staging_dir = lookup("STAGING_DIR")
            .map_or_else(|| PathBuf::from("/tmp/fabrik-files"), PathBuf::from);

        let listen_addr = lookup("LISTEN_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: "LISTEN_ADDR",
                reason: e.to_string(),
            })?;

        let poll_interval = duration_var(&lookup, "POLL_INTERVAL_SECS", 10)?;
        let progress_interval = duration_var(&lookup, "PROGRESS_INTERVAL_SECS", 30)?;

        Ok(Self {
            device_id,
            octoprint_url,
            octoprint_api_key: required("OCTOPRINT_API_KEY")?,
            storage_base_url: required("STORAGE_BASE_URL")?,
            staging_dir,
            telemetry_url: required("TELEMETRY_URL")?,
            listen_addr,
            poll_interval,
            progress_interval,
        })
    }
}

/// Parse an optional whole-seconds duration variable.
fn duration_var(
    lookup: &impl Fn(&'static str) -> Option<String>,
    name: &'static str,
    default_secs: u64,
) -> Result<Duration, ConfigError> {
    match lookup(name) {
        None => Ok(Duration::from_secs(default_secs)),
        Some(raw) => raw
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| ConfigError::Invalid {
                name,
                reason: e.to_string(),
            }),
    }
}
