//! Cached facade over the orchestrator
//!
//! [`ScanConsole`] is the object a request handler holds. Detection is
//! reused for `detection_ttl` and status for `status_ttl`, so frequent
//! polling never stampedes the probe or the session lock. Results are
//! never cached.

use std::time::Duration;

use bts_detect::{DetectionStatus, Detector, HackRfDetector};
use bts_protocol::{Band, BandInfo, ScanRecord};

use crate::cache::{CachedDetector, TtlCache};
use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::orchestrator::ScanOrchestrator;
use crate::state::{ScanParams, ScanStarted, ScanStats, ScanStatus, ScanStopped};

/// Scan request with optional overrides of the configured defaults
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanRequest {
    pub band: Option<Band>,
    pub sample_rate: Option<u32>,
    pub gain: Option<u32>,
}

impl ScanRequest {
    /// Fill unset fields from `config`
    pub fn resolve(&self, config: &ScanConfig) -> ScanParams {
        ScanParams {
            band: self.band.unwrap_or(config.default_band),
            sample_rate: self.sample_rate.unwrap_or(config.default_sample_rate),
            gain: self.gain.unwrap_or(config.default_gain),
        }
    }
}

/// Orchestrator plus the caches callers poll through
pub struct ScanConsole<D> {
    orchestrator: ScanOrchestrator<CachedDetector<D>>,
    status_cache: TtlCache<(), ScanStatus>,
    status_ttl: Duration,
}

impl ScanConsole<HackRfDetector> {
    /// Console backed by the real HackRF probe
    pub fn from_config(config: ScanConfig) -> Self {
        let detector = HackRfDetector::with_config(config.probe_config());
        Self::new(detector, config)
    }
}

impl<D: Detector> ScanConsole<D> {
    pub fn new(detector: D, config: ScanConfig) -> Self {
        let detector = CachedDetector::new(detector, config.detection_ttl());
        let status_ttl = config.status_ttl();
        Self {
            orchestrator: ScanOrchestrator::new(detector, config),
            status_cache: TtlCache::new(),
            status_ttl,
        }
    }

    pub fn orchestrator(&self) -> &ScanOrchestrator<CachedDetector<D>> {
        &self.orchestrator
    }

    pub fn config(&self) -> &ScanConfig {
        self.orchestrator.config()
    }

    /// Detection status, reused within the detection window
    pub async fn detect(&self) -> DetectionStatus {
        self.orchestrator.detect().await
    }

    /// Probe now regardless of the cached status
    pub async fn refresh_detection(&self) -> DetectionStatus {
        self.orchestrator.detector().refresh().await
    }

    /// Recent probe outcomes, oldest first
    pub fn detection_history(&self) -> Vec<DetectionStatus> {
        self.orchestrator.detector().history()
    }

    pub fn list_bands(&self) -> &'static [BandInfo] {
        self.orchestrator.list_bands()
    }

    pub async fn start(&self, request: ScanRequest) -> Result<ScanStarted, ScanError> {
        let params = request.resolve(self.orchestrator.config());
        let result = self.orchestrator.start(params).await;
        self.status_cache.clear();
        result
    }

    pub async fn stop(&self) -> Result<ScanStopped, ScanError> {
        let result = self.orchestrator.stop().await;
        self.status_cache.clear();
        result
    }

    /// Session status, reused within the status window
    pub async fn status(&self) -> ScanStatus {
        self.status_cache
            .get_or_compute((), self.status_ttl, || async { self.orchestrator.status() })
            .await
    }

    /// Current results, always fresh
    pub fn results(&self) -> Vec<ScanRecord> {
        self.orchestrator.results()
    }

    pub fn stats(&self) -> ScanStats {
        self.orchestrator.stats()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use bts_detect::ReasonCode;

    use super::*;
    use crate::state::{ScanSource, ScanState};

    #[derive(Default)]
    struct CountingDetector {
        probes: AtomicUsize,
    }

    impl Detector for CountingDetector {
        async fn detect(&self) -> DetectionStatus {
            self.probes.fetch_add(1, Ordering::SeqCst);
            DetectionStatus::unavailable(ReasonCode::ToolsMissing)
        }
    }

    fn fast_config() -> ScanConfig {
        let mut config = ScanConfig::default();
        config.simulation.steps = 10;
        config.simulation.step_delay_ms = 1000;
        config.simulation.seed = Some(5);
        config
    }

    #[test]
    fn test_request_defaults() {
        let config = ScanConfig::default();
        let params = ScanRequest::default().resolve(&config);
        assert_eq!(params.band, Band::Gsm900);
        assert_eq!(params.sample_rate, 2_000_000);
        assert_eq!(params.gain, 40);

        let params = ScanRequest {
            band: Some(Band::Pcs1900),
            gain: Some(20),
            ..Default::default()
        }
        .resolve(&config);
        assert_eq!(params.band, Band::Pcs1900);
        assert_eq!(params.gain, 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_detection_is_probed_once_per_window() {
        let detector = Arc::new(CountingDetector::default());
        let console = ScanConsole::new(Arc::clone(&detector), fast_config());

        for _ in 0..3 {
            assert_eq!(console.detect().await.reason, ReasonCode::ToolsMissing);
        }
        let started = console.start(ScanRequest::default()).await.unwrap();
        assert_eq!(started.source, ScanSource::Simulation);
        assert_eq!(detector.probes.load(Ordering::SeqCst), 1);

        console.refresh_detection().await;
        assert_eq!(detector.probes.load(Ordering::SeqCst), 2);

        let history = console.detection_history();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|s| s.reason == ReasonCode::ToolsMissing));
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_is_cached_between_polls() {
        let console = ScanConsole::new(CountingDetector::default(), fast_config());
        console.start(ScanRequest::default()).await.unwrap();

        let first = console.status().await;
        assert_eq!(first.state, ScanState::Running);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(console.status().await, first);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        let fresh = console.status().await;
        assert!(fresh.progress_percent > first.progress_percent);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_invalidates_status() {
        let console = ScanConsole::new(CountingDetector::default(), fast_config());
        console.start(ScanRequest::default()).await.unwrap();
        assert_eq!(console.status().await.state, ScanState::Running);

        console.stop().await.unwrap();
        let status = console.status().await;
        assert_eq!(status.state, ScanState::Completed);
        assert_eq!(status.progress_percent, 0);
    }
}
