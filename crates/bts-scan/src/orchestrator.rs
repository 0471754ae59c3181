//! Scan orchestration
//!
//! [`ScanOrchestrator`] owns one scan session. It decides whether a scan
//! runs the external scanner or the simulation generator, launches a
//! background worker, and serves snapshots of the session to pollers.
//!
//! # State machine
//!
//! ```text
//! IDLE ──start──► RUNNING ──finished──► COMPLETED
//!                    │ ──failure───► FAILED
//!                    └──stop──► STOPPING ──► COMPLETED
//! COMPLETED/FAILED ──start──► RUNNING (new generation)
//! ```
//!
//! `status`, `results` and `stats` never wait on the worker. They read the
//! session under a short synchronous lock.

use std::sync::Arc;
use std::time::Duration;

use bts_detect::{find_tool, DetectionStatus, Detector};
use bts_protocol::{list_bands, BandInfo, ScanRecord};
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::audit::{AuditSink, TracingAuditSink};
use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::state::{
    ScanParams, ScanSession, ScanSource, ScanStarted, ScanState, ScanStats, ScanStatus,
    ScanStopped,
};
use crate::worker::{self, SharedSession, WorkerContext, WorkerHandle, WorkerPlan};

/// Extra time allowed beyond the stop grace period before a worker is aborted
const STOP_SLACK: Duration = Duration::from_secs(1);

/// Owner of a single scan session
pub struct ScanOrchestrator<D> {
    detector: D,
    config: Arc<ScanConfig>,
    audit: Arc<dyn AuditSink>,
    session: SharedSession,
    /// Held by `start` and `stop` for their whole duration
    worker: tokio::sync::Mutex<Option<WorkerHandle>>,
}

impl<D: Detector> ScanOrchestrator<D> {
    /// Create an orchestrator that audits through `tracing`
    pub fn new(detector: D, config: ScanConfig) -> Self {
        Self {
            detector,
            config: Arc::new(config),
            audit: Arc::new(TracingAuditSink),
            session: Arc::new(Mutex::new(ScanSession::default())),
            worker: tokio::sync::Mutex::new(None),
        }
    }

    /// Replace the audit sink
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Run detection through the configured detector
    pub async fn detect(&self) -> DetectionStatus {
        self.detector.detect().await
    }

    /// Bands a scan can cover
    pub fn list_bands(&self) -> &'static [BandInfo] {
        list_bands()
    }

    /// Start a scan
    ///
    /// Returns once the worker is launched; results arrive in the background.
    /// Fails with [`ScanError::AlreadyRunning`] without touching the current
    /// session if a scan is active.
    pub async fn start(&self, params: ScanParams) -> Result<ScanStarted, ScanError> {
        let mut worker = self.worker.lock().await;

        let state = self.session.lock().state;
        if state.is_active() {
            warn!("Rejected {} scan: {} scan in progress", params.band, state);
            return Err(ScanError::AlreadyRunning);
        }

        let plan = self.plan(&params).await?;
        let source = plan.source();

        let generation = self.session.lock().begin(params, source);
        *worker = Some(worker::spawn(
            WorkerContext {
                session: Arc::clone(&self.session),
                generation,
                params,
                config: Arc::clone(&self.config),
                audit: Arc::clone(&self.audit),
            },
            plan,
        ));

        let message = match source {
            ScanSource::Tool => format!("Started {} scan", params.band),
            ScanSource::Simulation => format!("Started simulated {} scan", params.band),
        };
        info!(
            "{} (sample rate {}, gain {}, generation {})",
            message, params.sample_rate, params.gain, generation
        );
        self.audit.record(
            "scan",
            "start",
            &format!(
                "{} (sample rate {}, gain {})",
                message, params.sample_rate, params.gain
            ),
        );

        Ok(ScanStarted {
            params,
            source,
            message,
        })
    }

    /// Decide how a scan will run
    async fn plan(&self, params: &ScanParams) -> Result<WorkerPlan, ScanError> {
        if self.config.prefer_simulation {
            info!("Simulation preferred, skipping HackRF detection");
            return Ok(WorkerPlan::Simulation);
        }

        let status = self.detector.detect().await;
        if !status.connected {
            if self.config.simulation_fallback {
                info!(
                    "HackRF unavailable ({}), simulating {} scan",
                    status.reason.display_text(),
                    params.band
                );
                return Ok(WorkerPlan::Simulation);
            }
            warn!(
                "Rejected {} scan: {}",
                params.band,
                status.reason.display_text()
            );
            return Err(ScanError::DeviceUnavailable {
                reason: status.reason,
                description: status.summary(),
            });
        }

        let program = &self.config.tool.program;
        match find_tool(program) {
            Some(path) => Ok(WorkerPlan::Tool(path)),
            None => {
                warn!(
                    "{} is not installed, simulating {} scan instead",
                    program, params.band
                );
                Ok(WorkerPlan::Simulation)
            }
        }
    }

    /// Stop the active scan
    ///
    /// Results collected so far are kept. Fails with
    /// [`ScanError::NothingToStop`], changing nothing, if no scan is running.
    pub async fn stop(&self) -> Result<ScanStopped, ScanError> {
        let mut worker = self.worker.lock().await;

        let (generation, params) = {
            let mut session = self.session.lock();
            if !session.state.is_active() {
                return Err(ScanError::NothingToStop);
            }
            session.request_stop();
            (session.generation, session.params())
        };

        info!("Stopping scan generation {}", generation);
        if let Some(mut handle) = worker.take() {
            handle.request_stop();
            handle.join(self.config.stop_grace() * 2 + STOP_SLACK).await;
        }

        let results_count = {
            let mut session = self.session.lock();
            session.finish(
                generation,
                ScanState::Completed,
                Some(0),
                "Scan stopped".to_string(),
            );
            session.results().len()
        };

        let band = params.map(|p| p.band.to_string()).unwrap_or_default();
        self.audit.record(
            "scan",
            "stop",
            &format!("Stopped {} scan with {} towers", band, results_count),
        );

        Ok(ScanStopped {
            results_count,
            message: "Scan stopped successfully".to_string(),
        })
    }

    /// Snapshot of the session
    pub fn status(&self) -> ScanStatus {
        self.session.lock().status()
    }

    /// Copy of the current results, in detection order
    pub fn results(&self) -> Vec<ScanRecord> {
        self.session.lock().results().to_vec()
    }

    pub fn stats(&self) -> ScanStats {
        ScanStats::from_records(self.session.lock().results())
    }
}

impl<D> Drop for ScanOrchestrator<D> {
    fn drop(&mut self) {
        if let Some(handle) = self.worker.get_mut().take() {
            handle.abort();
        }
    }
}
