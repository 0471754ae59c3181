//! SDR Peripheral Detection Library
//!
//! This crate probes for the HackRF peripheral that feeds GSM base-station
//! scans and normalizes the outcome into a [`DetectionStatus`].
//!
//! Detection never fails: a missing tool, a hung probe, or an unexpected
//! error all become a status with the matching [`ReasonCode`].
//!
//! # Example
//!
//! ```rust,no_run
//! use bts_detect::{Detector, HackRfDetector};
//!
//! # async fn run() {
//! let detector = HackRfDetector::new();
//! let status = detector.detect().await;
//!
//! if status.connected {
//!     println!("Found {:?}", status.device_info);
//! } else {
//!     println!("{}", status.reason.description());
//! }
//! # }
//! ```

pub mod error;
pub mod probe;
pub mod status;
pub mod tool;

pub use error::DetectError;
pub use probe::{parse_hackrf_info, Detector, HackRfDetector, ProbeConfig, StaticDetector};
pub use status::{DetectionStatus, DeviceInfo, ReasonCode};
pub use tool::find_tool;
