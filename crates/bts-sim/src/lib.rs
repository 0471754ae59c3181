//! GSM Scan Simulation Library
//!
//! This crate stands in for the scanner tool when no SDR hardware (or no
//! scanner binary) is available. It produces plausible tower records that
//! are shaped exactly like real ones, except that `simulated` is set.
//!
//! # Example
//!
//! ```rust
//! use bts_protocol::Band;
//! use bts_sim::SimulationGenerator;
//!
//! let mut generator = SimulationGenerator::with_seed(7);
//! let towers = generator.generate(Band::Gsm900);
//!
//! assert!((3..=6).contains(&towers.len()));
//! assert!(towers.iter().all(|t| t.simulated));
//! // Strongest tower first
//! assert!(towers.windows(2).all(|w| w[0].signal_dbm > w[1].signal_dbm));
//! ```

pub mod generator;

pub use generator::{channel_pool, SimulationGenerator, SIGNAL_RANGE_DBM};
