//! Peripheral probing
//!
//! This module runs the HackRF information tool with a hard time limit and
//! interprets its output. The probe is idempotent and has no side effects
//! beyond running the tool.

use std::future::Future;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::error::DetectError;
use crate::status::{DetectionStatus, DeviceInfo, ReasonCode};
use crate::tool::find_tool;

/// Something that can report whether the peripheral is available
pub trait Detector: Send + Sync {
    /// Run a detection and return a fresh status
    fn detect(&self) -> impl Future<Output = DetectionStatus> + Send;
}

impl<D: Detector> Detector for Arc<D> {
    fn detect(&self) -> impl Future<Output = DetectionStatus> + Send {
        (**self).detect()
    }
}

/// Configuration for probing
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Probe program name or path
    pub program: String,
    /// Arguments passed to the probe program
    pub args: Vec<String>,
    /// Hard limit for a single probe
    pub timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            program: "hackrf_info".to_string(),
            args: Vec::new(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// HackRF detector backed by `hackrf_info`
#[derive(Debug, Clone)]
pub struct HackRfDetector {
    config: ProbeConfig,
}

impl HackRfDetector {
    /// Create a new detector with default configuration
    pub fn new() -> Self {
        Self {
            config: ProbeConfig::default(),
        }
    }

    /// Create a detector with custom configuration
    pub fn with_config(config: ProbeConfig) -> Self {
        Self { config }
    }

    /// Get the current configuration
    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Run the probe tool once
    ///
    /// `Ok(None)` means the tool ran but reported no device.
    pub async fn probe(&self) -> Result<Option<DeviceInfo>, DetectError> {
        let program = &self.config.program;
        let path = find_tool(program).ok_or_else(|| DetectError::ToolMissing(program.clone()))?;

        debug!("Probing for HackRF with {}", path.display());

        let mut command = Command::new(&path);
        command
            .args(&self.config.args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = timeout(self.config.timeout, command.output())
            .await
            .map_err(|_| DetectError::Timeout {
                tool: program.clone(),
                timeout: self.config.timeout,
            })?
            .map_err(|e| DetectError::Probe {
                tool: program.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            debug!("{} exited with {}", program, output.status);
            return Ok(None);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_hackrf_info(&stdout))
    }
}

impl Default for HackRfDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for HackRfDetector {
    async fn detect(&self) -> DetectionStatus {
        match self.probe().await {
            Ok(Some(info)) => {
                info!(
                    "HackRF detected: {}",
                    info.board_id.as_deref().unwrap_or("unknown board")
                );
                DetectionStatus::connected(info)
            }
            Ok(None) => {
                info!("No HackRF detected");
                DetectionStatus::unavailable(ReasonCode::NotConnected)
            }
            Err(e) => {
                match &e {
                    DetectError::ToolMissing(_) => info!("HackRF detection skipped: {}", e),
                    DetectError::Timeout { .. } => warn!("HackRF detection timeout: {}", e),
                    DetectError::Probe { .. } => error!("HackRF detection error: {}", e),
                }
                DetectionStatus::from_error(&e)
            }
        }
    }
}

/// Detector that always reports the same outcome
///
/// Used when simulation is preferred over real hardware, and in tests.
#[derive(Debug, Clone)]
pub struct StaticDetector {
    reason: ReasonCode,
    device_info: Option<DeviceInfo>,
}

impl StaticDetector {
    /// Always report the given reason with no device
    pub fn new(reason: ReasonCode) -> Self {
        Self {
            reason,
            device_info: None,
        }
    }

    /// Always report a connected device
    pub fn connected(info: DeviceInfo) -> Self {
        Self {
            reason: ReasonCode::Connected,
            device_info: Some(info),
        }
    }
}

impl Detector for StaticDetector {
    async fn detect(&self) -> DetectionStatus {
        match &self.device_info {
            Some(info) if self.reason == ReasonCode::Connected => {
                DetectionStatus::connected(info.clone())
            }
            _ => DetectionStatus::unavailable(self.reason),
        }
    }
}

/// Parse `hackrf_info` output
///
/// Returns the first board's identity, or `None` if no board was reported.
pub fn parse_hackrf_info(output: &str) -> Option<DeviceInfo> {
    let mut lines = output.lines().skip_while(|line| !line.contains("Found HackRF"));
    lines.next()?;

    let mut info = DeviceInfo::default();
    let mut seen_index = false;

    for line in lines {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().to_string();

        match key.trim() {
            // A second index line starts the next board
            "Index" if seen_index => break,
            "Index" => seen_index = true,
            "Board ID Number" => info.board_id = Some(value),
            "Firmware Version" => info.firmware = Some(value),
            "Serial number" => info.serial = Some(value),
            "Part ID Number" => info.part_id = Some(value),
            "Hardware Revision" => info.hardware_revision = Some(value),
            _ => {}
        }
    }

    Some(info)
}
