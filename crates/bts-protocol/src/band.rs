//! GSM frequency bands
//!
//! Channel numbering follows the scanner tool: P-GSM channels 1-124 and the
//! E-GSM extension 975-1023 belong to GSM900, while 512-885 are read as
//! DCS1800 unless the caller knows the scan targets PCS1900.

use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// A contiguous GSM downlink allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Band {
    /// 900 MHz primary GSM (plus the E-GSM extension)
    #[cfg_attr(feature = "serde", serde(rename = "GSM900"))]
    Gsm900,
    /// 1800 MHz digital cellular system
    #[cfg_attr(feature = "serde", serde(rename = "DCS1800"))]
    Dcs1800,
    /// 1900 MHz personal communications service
    #[cfg_attr(feature = "serde", serde(rename = "PCS1900"))]
    Pcs1900,
}

/// Static description of a band, as shown in band pickers
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BandInfo {
    /// Band this entry describes
    pub band: Band,
    /// Canonical name (e.g. "GSM900")
    pub name: &'static str,
    /// Human-readable description
    pub description: &'static str,
    /// Downlink range in MHz (low, high)
    pub frequency_range_mhz: (f64, f64),
    /// Uplink is this many MHz below the downlink
    pub uplink_offset_mhz: f64,
}

impl BandInfo {
    /// Format the downlink range for display (e.g. "925-960 MHz")
    pub fn range_display(&self) -> String {
        format!(
            "{}-{} MHz",
            self.frequency_range_mhz.0, self.frequency_range_mhz.1
        )
    }
}

const BANDS: [BandInfo; 3] = [
    BandInfo {
        band: Band::Gsm900,
        name: "GSM900",
        description: "900 MHz (Primary GSM)",
        frequency_range_mhz: (925.0, 960.0),
        uplink_offset_mhz: 45.0,
    },
    BandInfo {
        band: Band::Dcs1800,
        name: "DCS1800",
        description: "1800 MHz (Digital Cellular)",
        frequency_range_mhz: (1805.0, 1880.0),
        uplink_offset_mhz: 95.0,
    },
    BandInfo {
        band: Band::Pcs1900,
        name: "PCS1900",
        description: "1900 MHz (Personal Comm)",
        frequency_range_mhz: (1930.0, 1990.0),
        uplink_offset_mhz: 80.0,
    },
];

/// All bands the scanner supports, in ascending frequency order
pub fn list_bands() -> &'static [BandInfo] {
    &BANDS
}

impl Band {
    /// All bands, in ascending frequency order
    pub const ALL: [Band; 3] = [Band::Gsm900, Band::Dcs1800, Band::Pcs1900];

    /// Static information for this band
    pub fn info(&self) -> &'static BandInfo {
        match self {
            Band::Gsm900 => &BANDS[0],
            Band::Dcs1800 => &BANDS[1],
            Band::Pcs1900 => &BANDS[2],
        }
    }

    /// Canonical name (e.g. "DCS1800")
    pub fn name(&self) -> &'static str {
        self.info().name
    }

    /// Band indicator understood by the scanner tool's `-s` option
    pub fn tool_arg(&self) -> &'static str {
        match self {
            Band::Gsm900 => "GSM900",
            Band::Dcs1800 => "DCS",
            Band::Pcs1900 => "PCS",
        }
    }

    /// Whether `channel` is a valid ARFCN in this band
    pub fn contains_channel(&self, channel: u32) -> bool {
        match self {
            Band::Gsm900 => (1..=124).contains(&channel) || (975..=1023).contains(&channel),
            Band::Dcs1800 => (512..=885).contains(&channel),
            Band::Pcs1900 => (512..=810).contains(&channel),
        }
    }

    /// Whether `mhz` lies inside this band's downlink range
    pub fn contains_frequency(&self, mhz: f64) -> bool {
        let (low, high) = self.info().frequency_range_mhz;
        (low..=high).contains(&mhz)
    }

    /// Downlink frequency in MHz for an ARFCN, using this band's linear step
    pub fn channel_frequency(&self, channel: u32) -> f64 {
        let channel = f64::from(channel);
        match self {
            Band::Gsm900 if channel >= 975.0 => 925.2 + 0.2 * (channel - 975.0),
            Band::Gsm900 => 935.0 + 0.2 * (channel - 1.0),
            Band::Dcs1800 => 1805.2 + 0.2 * (channel - 512.0),
            Band::Pcs1900 => 1930.2 + 0.2 * (channel - 512.0),
        }
    }

    /// Band implied by a bare channel number
    ///
    /// PCS1900 reuses the DCS1800 numbering, so without further context
    /// 512 and above resolve to DCS1800.
    pub fn for_channel(channel: u32) -> Band {
        if Band::Gsm900.contains_channel(channel) {
            Band::Gsm900
        } else {
            Band::Dcs1800
        }
    }

    /// Band implied by a downlink frequency
    pub fn for_frequency(mhz: f64) -> Band {
        Band::ALL
            .into_iter()
            .find(|band| band.contains_frequency(mhz))
            .unwrap_or(if mhz < 1000.0 {
                Band::Gsm900
            } else {
                Band::Dcs1800
            })
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Band {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GSM900" | "GSM" | "EGSM" => Ok(Band::Gsm900),
            "DCS1800" | "DCS" | "GSM1800" => Ok(Band::Dcs1800),
            "PCS1900" | "PCS" | "GSM1900" => Ok(Band::Pcs1900),
            _ => Err(ParseError::UnknownBand(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_bands_has_three_entries() {
        let bands = list_bands();
        assert_eq!(bands.len(), 3);
        assert_eq!(bands[0].name, "GSM900");
        assert_eq!(bands[1].name, "DCS1800");
        assert_eq!(bands[2].name, "PCS1900");
        assert_eq!(bands[0].range_display(), "925-960 MHz");
    }

    #[test]
    fn test_band_from_str() {
        assert_eq!("GSM900".parse::<Band>(), Ok(Band::Gsm900));
        assert_eq!("dcs1800".parse::<Band>(), Ok(Band::Dcs1800));
        assert_eq!(" PCS ".parse::<Band>(), Ok(Band::Pcs1900));
        assert_eq!(
            "LTE".parse::<Band>(),
            Err(ParseError::UnknownBand("LTE".to_string()))
        );
    }

    #[test]
    fn test_display_round_trips_through_from_str() {
        for band in Band::ALL {
            assert_eq!(band.to_string().parse::<Band>(), Ok(band));
        }
    }

    #[test]
    fn test_channel_frequency() {
        assert!((Band::Gsm900.channel_frequency(1) - 935.0).abs() < 1e-9);
        assert!((Band::Gsm900.channel_frequency(76) - 950.0).abs() < 1e-9);
        assert!((Band::Gsm900.channel_frequency(975) - 925.2).abs() < 1e-9);
        assert!((Band::Dcs1800.channel_frequency(512) - 1805.2).abs() < 1e-9);
        assert!((Band::Pcs1900.channel_frequency(661) - 1960.0).abs() < 1e-9);
    }

    #[test]
    fn test_for_channel() {
        assert_eq!(Band::for_channel(51), Band::Gsm900);
        assert_eq!(Band::for_channel(1000), Band::Gsm900);
        assert_eq!(Band::for_channel(600), Band::Dcs1800);
    }

    #[test]
    fn test_for_frequency() {
        assert_eq!(Band::for_frequency(935.2), Band::Gsm900);
        assert_eq!(Band::for_frequency(1842.6), Band::Dcs1800);
        assert_eq!(Band::for_frequency(1960.0), Band::Pcs1900);
        // Outside every range falls back on the 1 GHz split
        assert_eq!(Band::for_frequency(870.0), Band::Gsm900);
        assert_eq!(Band::for_frequency(2100.0), Band::Dcs1800);
    }
}
