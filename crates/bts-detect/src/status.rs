//! Detection status reporting

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DetectError;

/// Why the peripheral is (or is not) available
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    /// Peripheral answered the probe
    Connected,
    /// Probe ran but found no peripheral
    NotConnected,
    /// Peripheral support tooling is not installed
    ToolsMissing,
    /// Probe exceeded its time limit
    Timeout,
    /// Probe failed unexpectedly
    Error,
}

impl ReasonCode {
    /// Short badge text
    pub fn display_text(&self) -> &'static str {
        match self {
            Self::Connected => "Connected",
            Self::NotConnected => "Not Connected",
            Self::ToolsMissing => "Tools Not Installed",
            Self::Timeout => "Detection Timeout",
            Self::Error => "Detection Error",
        }
    }

    /// Longer explanation
    pub fn description(&self) -> &'static str {
        match self {
            Self::Connected => "HackRF device is connected and ready",
            Self::NotConnected => "No HackRF device detected",
            Self::ToolsMissing => "HackRF tools are not installed",
            Self::Timeout => "HackRF detection timed out",
            Self::Error => "Error during HackRF detection",
        }
    }
}

/// Identity of a detected peripheral
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Board identifier (e.g. "2 (HackRF One)")
    pub board_id: Option<String>,
    /// Firmware version string
    pub firmware: Option<String>,
    /// Board serial number
    pub serial: Option<String>,
    /// MCU part identifier
    pub part_id: Option<String>,
    /// Hardware revision (newer firmware only)
    pub hardware_revision: Option<String>,
}

/// Result of a single detection run
///
/// A fresh value is produced on every probe and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionStatus {
    /// True iff `reason` is [`ReasonCode::Connected`]
    pub connected: bool,
    /// Normalized outcome
    pub reason: ReasonCode,
    /// Peripheral identity when connected
    pub device_info: Option<DeviceInfo>,
    /// Failure description for timeouts and errors
    pub error: Option<String>,
    /// When the probe finished
    pub observed_at: DateTime<Utc>,
}

impl DetectionStatus {
    /// Peripheral found
    pub fn connected(info: DeviceInfo) -> Self {
        Self {
            connected: true,
            reason: ReasonCode::Connected,
            device_info: Some(info),
            error: None,
            observed_at: Utc::now(),
        }
    }

    /// Status with the given reason and no device
    pub fn unavailable(reason: ReasonCode) -> Self {
        Self {
            connected: reason == ReasonCode::Connected,
            reason,
            device_info: None,
            error: None,
            observed_at: Utc::now(),
        }
    }

    /// Map a probe failure onto its reason code, keeping the description
    pub fn from_error(err: &DetectError) -> Self {
        let reason = match err {
            DetectError::ToolMissing(_) => ReasonCode::ToolsMissing,
            DetectError::Timeout { .. } => ReasonCode::Timeout,
            DetectError::Probe { .. } => ReasonCode::Error,
        };
        Self {
            error: Some(err.to_string()),
            ..Self::unavailable(reason)
        }
    }

    /// Human-readable summary (description plus error, if any)
    pub fn summary(&self) -> String {
        match &self.error {
            Some(error) => format!("{}: {}", self.reason.description(), error),
            None => self.reason.description().to_string(),
        }
    }
}
