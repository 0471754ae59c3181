//! Base-station scan orchestration
//!
//! This crate drives a scan from request to results:
//! - [`TtlCache`] memoizes expensive async calls per key for a freshness window
//! - [`ScanOrchestrator`] owns the scan session and its background worker
//! - [`ScanConsole`] wraps the orchestrator with cached detection and status
//!
//! A scan runs the external scanner when the HackRF is connected and the
//! scanner is installed, and the simulation generator otherwise.
//!
//! # Example
//!
//! ```no_run
//! use bts_detect::{ReasonCode, StaticDetector};
//! use bts_scan::{ScanConfig, ScanConsole, ScanRequest};
//!
//! # async fn example() -> Result<(), bts_scan::ScanError> {
//! let console = ScanConsole::new(
//!     StaticDetector::new(ReasonCode::ToolsMissing),
//!     ScanConfig::default(),
//! );
//!
//! let started = console.start(ScanRequest::default()).await?;
//! println!("{}", started);
//!
//! let status = console.status().await;
//! println!("{} {}%", status.state, status.progress_percent);
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod cache;
pub mod config;
pub mod console;
pub mod error;
pub mod orchestrator;
pub mod state;
mod worker;

pub use audit::{AuditEvent, AuditSink, MemoryAuditSink, TracingAuditSink};
pub use cache::{CachedDetector, TtlCache, DETECTION_HISTORY};
pub use config::{ProbeSettings, ScanConfig, SimulationConfig, ToolConfig};
pub use console::{ScanConsole, ScanRequest};
pub use error::ScanError;
pub use orchestrator::ScanOrchestrator;
pub use state::{
    ScanParams, ScanSource, ScanStarted, ScanState, ScanStats, ScanStatus, ScanStopped,
};
