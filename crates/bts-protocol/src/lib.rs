//! GSM Scan Protocol Library
//!
//! This crate provides the shared vocabulary for GSM base-station scans:
//!
//! - **Bands**: GSM900, DCS1800 and PCS1900 with their ARFCN-to-frequency rules
//! - **ScanRecord**: one observed tower (channel, frequency, signal, identity)
//! - **Parser**: turns the scanner tool's text output into records
//!
//! # Architecture
//!
//! The scanner tool prints one line per detected carrier, e.g.
//!
//! ```text
//! chan: 51 (935.2MHz + 320Hz)	power: 78202.95
//! ```
//!
//! The parser is a pure function over a single line so it can be fed from a
//! live process pipe, a captured log, or a test fixture alike. Lines that do
//! not look like a carrier report are skipped, never treated as errors.
//!
//! # Example
//!
//! ```rust
//! use bts_protocol::{parse_line, Band};
//!
//! let record = parse_line("chan: 51 (935.2MHz + 0Hz)\tpower: 50000.00").unwrap();
//! assert_eq!(record.channel, 51);
//! assert_eq!(record.band, Band::Gsm900);
//! assert_eq!(record.signal_dbm, -35.0);
//!
//! assert!(parse_line("garbage line").is_none());
//! ```

pub mod band;
pub mod error;
pub mod parser;
pub mod record;

pub use band::{list_bands, Band, BandInfo};
pub use error::ParseError;
pub use parser::{parse_line, parse_line_with_hint, parse_output, power_to_dbm};
pub use record::{ScanRecord, DEFAULT_MCC, DEFAULT_MNC};
