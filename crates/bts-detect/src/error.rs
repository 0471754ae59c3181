//! Error types for peripheral detection

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while probing for the peripheral
#[derive(Debug, Error)]
pub enum DetectError {
    /// Support tooling is not installed
    #[error("{0} not found on PATH")]
    ToolMissing(String),

    /// Probe did not finish in time
    #[error("{tool} did not respond within {}s", .timeout.as_secs())]
    Timeout { tool: String, timeout: Duration },

    /// Probe failed unexpectedly
    #[error("failed to run {tool}: {reason}")]
    Probe { tool: String, reason: String },
}
