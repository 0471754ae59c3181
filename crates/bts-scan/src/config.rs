//! Orchestrator configuration

use std::time::Duration;

use bts_detect::ProbeConfig;
use bts_protocol::Band;
use serde::{Deserialize, Serialize};

use crate::state::ScanParams;

/// Probe settings as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProbeSettings {
    /// Probe program name or path
    pub program: String,
    /// Extra arguments for the probe program
    pub args: Vec<String>,
    /// Hard limit for a single probe in seconds
    pub timeout_secs: u64,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        let probe = ProbeConfig::default();
        Self {
            program: probe.program,
            args: probe.args,
            timeout_secs: probe.timeout.as_secs(),
        }
    }
}

/// External scanner invocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToolConfig {
    /// Scanner program name or path
    pub program: String,
    /// Arguments placed before the generated scan arguments
    pub args: Vec<String>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            program: "kalibrate-hackrf".to_string(),
            args: Vec::new(),
        }
    }
}

impl ToolConfig {
    /// Full argument list for one scan
    ///
    /// Configured arguments come first, followed by
    /// `-s <band> -g <gain> -R <sample rate>`.
    pub fn command_args(&self, params: &ScanParams) -> Vec<String> {
        let mut args = self.args.clone();
        args.extend([
            "-s".to_string(),
            params.band.tool_arg().to_string(),
            "-g".to_string(),
            params.gain.to_string(),
            "-R".to_string(),
            params.sample_rate.to_string(),
        ]);
        args
    }
}

/// Pacing and seeding of simulated scans
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of progress steps before results are emitted
    pub steps: u32,
    /// Delay between steps in milliseconds
    pub step_delay_ms: u64,
    /// Fixed seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            steps: 10,
            step_delay_ms: 500,
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Delay between steps
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }
}

/// Scan orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScanConfig {
    /// Band used when a request does not name one
    pub default_band: Band,
    /// Sample rate in Hz used when a request does not give one
    pub default_sample_rate: u32,
    /// Receiver gain used when a request does not give one
    pub default_gain: u32,
    /// Skip detection and always simulate
    pub prefer_simulation: bool,
    /// Simulate instead of rejecting when no peripheral is connected
    pub simulation_fallback: bool,
    /// Peripheral probe
    pub probe: ProbeSettings,
    /// External scanner
    pub tool: ToolConfig,
    /// Freshness window for detection results in seconds
    pub detection_ttl_secs: u64,
    /// Freshness window for status queries in milliseconds
    pub status_ttl_ms: u64,
    /// Grace period between terminate and kill in milliseconds
    pub stop_grace_ms: u64,
    /// Ceiling for a whole scan in seconds
    pub scan_timeout_secs: u64,
    /// Simulated scan settings
    pub simulation: SimulationConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            default_band: Band::Gsm900,
            default_sample_rate: 2_000_000,
            default_gain: 40,
            prefer_simulation: false,
            simulation_fallback: true,
            probe: ProbeSettings::default(),
            tool: ToolConfig::default(),
            detection_ttl_secs: 300,
            status_ttl_ms: 2000,
            stop_grace_ms: 5000,
            scan_timeout_secs: 900,
            simulation: SimulationConfig::default(),
        }
    }
}

impl ScanConfig {
    /// Probe configuration for [`bts_detect::HackRfDetector`]
    pub fn probe_config(&self) -> ProbeConfig {
        ProbeConfig {
            program: self.probe.program.clone(),
            args: self.probe.args.clone(),
            timeout: Duration::from_secs(self.probe.timeout_secs),
        }
    }

    pub fn detection_ttl(&self) -> Duration {
        Duration::from_secs(self.detection_ttl_secs)
    }

    pub fn status_ttl(&self) -> Duration {
        Duration::from_millis(self.status_ttl_ms)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }
}
