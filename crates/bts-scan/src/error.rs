//! Error types for scan orchestration

use std::time::Duration;

use bts_detect::ReasonCode;
use thiserror::Error;

/// Errors that can occur while starting, running, or stopping a scan
///
/// `start` and `stop` return these instead of panicking so that callers can
/// render the message directly. Failures inside a running scan are not
/// returned to anyone: they move the session to `FAILED` and the message is
/// kept in the status.
#[derive(Debug, Error)]
pub enum ScanError {
    /// A scan is already running on this orchestrator
    #[error("Scan already in progress")]
    AlreadyRunning,

    /// The peripheral is unavailable and simulation fallback is disabled
    #[error("HackRF not available: {description}")]
    DeviceUnavailable {
        /// Detection outcome
        reason: ReasonCode,
        /// Human-readable detection summary
        description: String,
    },

    /// `stop` was called with no active scan
    #[error("No active scan to stop")]
    NothingToStop,

    /// The scanner process could not be started
    #[error("failed to start {program}: {reason}")]
    ProcessSpawn {
        /// Program that failed to start
        program: String,
        /// Underlying error
        reason: String,
    },

    /// The scanner exited unsuccessfully without reporting towers
    #[error("{program} exited with {status} without reporting any towers")]
    ToolExited {
        /// Program that exited
        program: String,
        /// Exit status description
        status: String,
    },

    /// The scan exceeded its time limit
    #[error("scan exceeded its {}s limit", .0.as_secs())]
    Timeout(Duration),

    /// Reading scanner output failed
    #[error("I/O error reading scanner output: {0}")]
    Io(#[from] std::io::Error),

    /// The scan worker panicked or was cancelled
    #[error("scan worker crashed: {0}")]
    WorkerCrashed(String),
}

impl ScanError {
    /// True for errors returned by `start`/`stop` without touching the session
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::AlreadyRunning | Self::DeviceUnavailable { .. } | Self::NothingToStop
        )
    }
}
