//! Error types for band and record handling

use thiserror::Error;

/// Errors that can occur while interpreting user-supplied scan parameters
///
/// Scanner output lines never produce a `ParseError`: a line that does not
/// describe a carrier is simply skipped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Band name not recognized
    #[error("unknown band: {0}")]
    UnknownBand(String),
}
