//! Scan session state

use std::fmt;

use bts_protocol::{Band, ScanRecord};
use serde::Serialize;

/// Lifecycle of a scan session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanState {
    /// No scan has run yet
    #[default]
    Idle,
    /// A worker is producing results
    Running,
    /// Stop requested, worker shutting down
    Stopping,
    /// Finished normally or stopped
    Completed,
    /// Finished with an error
    Failed,
}

impl ScanState {
    /// True while a worker owns the session
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::Stopping)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "IDLE",
            Self::Running => "RUNNING",
            Self::Stopping => "STOPPING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Parameters of one scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ScanParams {
    pub band: Band,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Receiver gain
    pub gain: u32,
}

/// Where a scan's records come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanSource {
    /// External scanner driving the peripheral
    Tool,
    /// Simulation generator
    Simulation,
}

/// Snapshot of the session for polling callers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanStatus {
    pub state: ScanState,
    /// 0..=100, monotonic while running
    pub progress_percent: u8,
    /// Band of the current or last scan
    pub band: Option<Band>,
    pub results_count: usize,
    pub sample_rate: Option<u32>,
    pub gain: Option<u32>,
    /// True when the current or last scan is simulated
    pub simulated: bool,
    /// Current step, for display
    pub operation: String,
    /// Outcome of the last scan, or why it failed
    pub message: Option<String>,
}

/// Summary of a result set
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScanStats {
    pub total: usize,
    pub real: usize,
    pub simulated: usize,
    /// Strongest signal in dBm, -100 when there are no results
    pub strongest_signal_dbm: f64,
}

impl ScanStats {
    pub fn from_records(records: &[ScanRecord]) -> Self {
        let simulated = records.iter().filter(|r| r.simulated).count();
        let strongest_signal_dbm = records
            .iter()
            .map(|r| r.signal_dbm)
            .max_by(f64::total_cmp)
            .unwrap_or(-100.0);

        Self {
            total: records.len(),
            real: records.len() - simulated,
            simulated,
            strongest_signal_dbm,
        }
    }
}

/// Returned by a successful `start`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanStarted {
    pub params: ScanParams,
    pub source: ScanSource,
    pub message: String,
}

impl fmt::Display for ScanStarted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Returned by a successful `stop`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanStopped {
    /// Records kept from the stopped scan
    pub results_count: usize,
    pub message: String,
}

impl fmt::Display for ScanStopped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Mutable session shared between the orchestrator and its worker
///
/// Every write from a worker names the generation it was started for;
/// writes from an older generation are ignored.
#[derive(Debug, Default)]
pub(crate) struct ScanSession {
    pub(crate) state: ScanState,
    pub(crate) generation: u64,
    params: Option<ScanParams>,
    source: Option<ScanSource>,
    progress: u8,
    results: Vec<ScanRecord>,
    operation: String,
    message: Option<String>,
}

impl ScanSession {
    /// Open a new generation, replacing the previous results
    pub(crate) fn begin(&mut self, params: ScanParams, source: ScanSource) -> u64 {
        self.generation += 1;
        self.state = ScanState::Running;
        self.params = Some(params);
        self.source = Some(source);
        self.progress = 0;
        self.results = Vec::new();
        self.operation = "Starting scan".to_string();
        self.message = None;
        self.generation
    }

    fn accepts(&self, generation: u64) -> bool {
        self.generation == generation && self.state == ScanState::Running
    }

    /// Append records while the generation is running
    pub(crate) fn append(&mut self, generation: u64, records: Vec<ScanRecord>) -> bool {
        if !self.accepts(generation) {
            return false;
        }
        self.results.extend(records);
        true
    }

    /// Raise progress while running, staying below 100
    pub(crate) fn advance(&mut self, generation: u64, percent: u8, operation: &str) {
        if !self.accepts(generation) {
            return;
        }
        self.progress = self.progress.max(percent.min(99));
        if !operation.is_empty() {
            self.operation = operation.to_string();
        }
    }

    /// Mark a stop request
    pub(crate) fn request_stop(&mut self) {
        if self.state == ScanState::Running {
            self.state = ScanState::Stopping;
            self.operation = "Stopping scan".to_string();
        }
    }

    /// Close the generation with a terminal state
    ///
    /// `progress` of `None` keeps the current value. Returns false if the
    /// generation is stale or already finished.
    pub(crate) fn finish(
        &mut self,
        generation: u64,
        state: ScanState,
        progress: Option<u8>,
        message: String,
    ) -> bool {
        if self.generation != generation || !self.state.is_active() {
            return false;
        }
        self.state = state;
        if let Some(progress) = progress {
            self.progress = progress;
        }
        self.operation = match state {
            ScanState::Failed => "Scan failed".to_string(),
            _ => "Idle".to_string(),
        };
        self.message = Some(message);
        true
    }

    pub(crate) fn params(&self) -> Option<ScanParams> {
        self.params
    }

    pub(crate) fn results(&self) -> &[ScanRecord] {
        &self.results
    }

    pub(crate) fn status(&self) -> ScanStatus {
        ScanStatus {
            state: self.state,
            progress_percent: self.progress,
            band: self.params.map(|p| p.band),
            results_count: self.results.len(),
            sample_rate: self.params.map(|p| p.sample_rate),
            gain: self.params.map(|p| p.gain),
            simulated: self.source == Some(ScanSource::Simulation),
            operation: if self.operation.is_empty() {
                "Idle".to_string()
            } else {
                self.operation.clone()
            },
            message: self.message.clone(),
        }
    }
}
