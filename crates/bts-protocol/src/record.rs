//! Tower records produced by a scan

use chrono::{DateTime, Utc};

use crate::band::Band;

/// Operator identity assigned to towers the scanner cannot decode
pub const DEFAULT_MCC: &str = "510";
/// Operator network code assigned to towers the scanner cannot decode
pub const DEFAULT_MNC: &str = "10";

/// One base-station carrier observed during a scan
///
/// Records are immutable once produced; the orchestrator only ever appends
/// them to a result set.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanRecord {
    /// Absolute radio frequency channel number
    pub channel: u32,
    /// Downlink frequency in MHz (rounded to 0.01)
    pub frequency_mhz: f64,
    /// Estimated signal level in dBm (rounded to 0.1, never above 0)
    pub signal_dbm: f64,
    /// Raw power figure reported by the scanner
    pub power: f64,
    /// Band the carrier belongs to
    pub band: Band,
    /// Mobile country code (3 digits)
    pub mcc: String,
    /// Mobile network code (2 digits)
    pub mnc: String,
    /// Location area code (0 when unknown)
    pub lac: u32,
    /// Cell identity (0 when unknown)
    pub cell_id: u32,
    /// True iff produced by the simulation generator
    pub simulated: bool,
    /// When the carrier was observed
    pub observed_at: DateTime<Utc>,
}

impl ScanRecord {
    /// Display label for the channel (e.g. "CH51")
    pub fn label(&self) -> String {
        format!("CH{}", self.channel)
    }

    /// Operator identity as "MCC-MNC"
    pub fn operator(&self) -> String {
        format!("{}-{}", self.mcc, self.mnc)
    }
}

/// Round to a fixed number of decimal places
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(935.2000000001, 2), 935.2);
        assert_eq!(round_to(-37.8202, 1), -37.8);
        assert_eq!(round_to(-100.0, 1), -100.0);
    }

    #[test]
    fn test_label_and_operator() {
        let record = ScanRecord {
            channel: 76,
            frequency_mhz: 950.0,
            signal_dbm: -31.0,
            power: 10_000.0,
            band: Band::Gsm900,
            mcc: DEFAULT_MCC.to_string(),
            mnc: DEFAULT_MNC.to_string(),
            lac: 0,
            cell_id: 0,
            simulated: false,
            observed_at: Utc::now(),
        };

        assert_eq!(record.label(), "CH76");
        assert_eq!(record.operator(), "510-10");
    }
}
