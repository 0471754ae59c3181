//! Scanner output parser
//!
//! Recognizes carrier reports of the form
//!
//! ```text
//! chan: 51 (935.2MHz + 320Hz)	power: 78202.95
//! ```
//!
//! Whitespace between fields may be spaces or tabs, and the frequency
//! parenthetical is optional. Anything else is skipped.

use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use tracing::trace;

use crate::band::Band;
use crate::record::{round_to, ScanRecord, DEFAULT_MCC, DEFAULT_MNC};

static CARRIER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"chan:\s*(?P<chan>\d+)(?:\s*\(\s*(?P<freq>\d+(?:\.\d+)?)\s*MHz[^)]*\))?[^\r\n]*?power:\s*(?P<power>[-+]?\d+(?:\.\d+)?)",
    )
    .expect("carrier line pattern is valid")
});

/// Signal level reported when the scanner gives no usable power figure
const NO_SIGNAL_DBM: f64 = -100.0;

/// Convert the scanner's raw power figure to an approximate dBm value
///
/// The `-30 - power / 10000` mapping is an uncalibrated empirical constant
/// kept for output compatibility with existing scan logs. Non-positive power
/// maps to -100 dBm.
pub fn power_to_dbm(power: f64) -> f64 {
    if power > 0.0 {
        -30.0 - power / 10_000.0
    } else {
        NO_SIGNAL_DBM
    }
}

/// Parse a single scanner output line into a record
///
/// Returns `None` for lines that are not carrier reports.
pub fn parse_line(raw: &str) -> Option<ScanRecord> {
    parse_line_with_hint(raw, None)
}

/// Parse a single scanner output line, using the band being scanned as a hint
///
/// The hint only matters when the line carries no frequency: PCS1900 and
/// DCS1800 share channel numbers, so the scanned band decides which linear
/// step applies.
pub fn parse_line_with_hint(raw: &str, hint: Option<Band>) -> Option<ScanRecord> {
    let line = raw.trim();
    let Some(caps) = CARRIER_LINE.captures(line) else {
        if !line.is_empty() {
            trace!("Skipping non-carrier line: {:?}", line);
        }
        return None;
    };

    let Ok(channel) = caps["chan"].parse::<u32>() else {
        trace!("Skipping line with out-of-range channel: {:?}", line);
        return None;
    };

    let frequency = match caps.name("freq").and_then(|m| m.as_str().parse::<f64>().ok()) {
        Some(mhz) => mhz,
        None => match hint {
            Some(band) if band.contains_channel(channel) => band.channel_frequency(channel),
            _ => Band::for_channel(channel).channel_frequency(channel),
        },
    };

    let power = caps["power"].parse::<f64>().unwrap_or(0.0);

    let band = match hint {
        Some(band) if band.contains_frequency(frequency) => band,
        _ => Band::for_frequency(frequency),
    };

    Some(ScanRecord {
        channel,
        frequency_mhz: round_to(frequency, 2),
        signal_dbm: round_to(power_to_dbm(power), 1),
        power: round_to(power, 2),
        band,
        mcc: DEFAULT_MCC.to_string(),
        mnc: DEFAULT_MNC.to_string(),
        lac: 0,
        cell_id: 0,
        simulated: false,
        observed_at: Utc::now(),
    })
}

/// Parse a complete captured output in one pass
///
/// Used as a fallback when line-by-line streaming produced nothing, e.g. for
/// tools that buffer their output or redraw lines with carriage returns.
pub fn parse_output(text: &str, hint: Option<Band>) -> Vec<ScanRecord> {
    text.split(['\n', '\r'])
        .filter_map(|line| parse_line_with_hint(line, hint))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kalibrate_line() {
        let record = parse_line("chan: 51 (935.2MHz + 320Hz)\tpower: 78202.95").unwrap();

        assert_eq!(record.channel, 51);
        assert_eq!(record.frequency_mhz, 935.2);
        assert_eq!(record.signal_dbm, -37.8);
        assert_eq!(record.power, 78202.95);
        assert_eq!(record.band, Band::Gsm900);
        assert_eq!(record.mcc, "510");
        assert_eq!(record.mnc, "10");
        assert!(!record.simulated);
    }

    #[test]
    fn test_three_line_stream() {
        let lines = [
            "chan: 51 (935.2MHz + 0Hz)\tpower: 50000.00",
            "garbage line",
            "chan: 76 (940.0MHz)\tpower: 10000.00",
        ];

        let records: Vec<_> = lines.iter().filter_map(|l| parse_line(l)).collect();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].frequency_mhz, 935.2);
        assert_eq!(records[0].signal_dbm, -35.0);
        assert_eq!(records[1].frequency_mhz, 940.0);
        assert_eq!(records[1].signal_dbm, -31.0);
    }

    #[test]
    fn test_whitespace_variance() {
        let spaced = parse_line("  chan:51   (935.2 MHz - 12Hz)    power:   50000  \n").unwrap();
        assert_eq!(spaced.channel, 51);
        assert_eq!(spaced.frequency_mhz, 935.2);
        assert_eq!(spaced.signal_dbm, -35.0);
    }

    #[test]
    fn test_frequency_derived_from_channel() {
        let gsm = parse_line("chan: 76\tpower: 10000.00").unwrap();
        assert_eq!(gsm.frequency_mhz, 950.0);
        assert_eq!(gsm.band, Band::Gsm900);

        let dcs = parse_line("chan: 600 power: 10000").unwrap();
        assert_eq!(dcs.frequency_mhz, 1822.8);
        assert_eq!(dcs.band, Band::Dcs1800);
    }

    #[test]
    fn test_hint_selects_pcs_numbering() {
        let record = parse_line_with_hint("chan: 661\tpower: 20000", Some(Band::Pcs1900)).unwrap();
        assert_eq!(record.frequency_mhz, 1960.0);
        assert_eq!(record.band, Band::Pcs1900);

        let unhinted = parse_line("chan: 661\tpower: 20000").unwrap();
        assert_eq!(unhinted.band, Band::Dcs1800);
    }

    #[test]
    fn test_zero_power_maps_to_floor() {
        let record = parse_line("chan: 51 (935.2MHz)\tpower: 0.00").unwrap();
        assert_eq!(record.signal_dbm, -100.0);

        assert_eq!(power_to_dbm(-5.0), -100.0);
        assert_eq!(power_to_dbm(10_000.0), -31.0);
    }

    #[test]
    fn test_non_carrier_lines_are_skipped() {
        assert!(parse_line("").is_none());
        assert!(parse_line("kal: Calculating clock frequency offset.").is_none());
        assert!(parse_line("GSM-900:").is_none());
        assert!(parse_line("chan: 51 (935.2MHz)").is_none());
        assert!(parse_line("power: 5000").is_none());
        assert!(parse_line("chan: abc power: 5000").is_none());
    }

    #[test]
    fn test_huge_channel_number_is_skipped() {
        assert!(parse_line("chan: 99999999999999 power: 5000").is_none());
    }

    #[test]
    fn test_parse_output_handles_carriage_returns() {
        let text = "kal: Scanning for GSM-900 base stations.\r\
                    chan: 51 (935.2MHz + 0Hz)\tpower: 50000.00\r\
                    chan: 76 (940.0MHz)\tpower: 10000.00\n";

        let records = parse_output(text, Some(Band::Gsm900));
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].channel, 51);
        assert_eq!(records[1].channel, 76);
    }
}
