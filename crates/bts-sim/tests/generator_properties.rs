//! Property tests for the simulation generator
//!
//! Whatever the seed and band, a simulated scan must:
//! - contain between 3 and 6 towers
//! - flag every tower as simulated
//! - list towers strictly strongest first
//! - keep signals within -85..=-45 dBm

use bts_protocol::Band;
use bts_sim::{SimulationGenerator, SIGNAL_RANGE_DBM};
use proptest::prelude::*;

fn band() -> impl Strategy<Value = Band> {
    prop_oneof![Just(Band::Gsm900), Just(Band::Dcs1800), Just(Band::Pcs1900)]
}

proptest! {
    #[test]
    fn simulated_scan_shape(seed in any::<u64>(), band in band()) {
        let records = SimulationGenerator::with_seed(seed).generate(band);

        prop_assert!((3..=6).contains(&records.len()));
        prop_assert!(records.iter().all(|r| r.simulated));
        prop_assert!(records.windows(2).all(|w| w[0].signal_dbm > w[1].signal_dbm));

        let low = f64::from(*SIGNAL_RANGE_DBM.start());
        let high = f64::from(*SIGNAL_RANGE_DBM.end());
        prop_assert!(records.iter().all(|r| (low..=high).contains(&r.signal_dbm)));
    }

    #[test]
    fn repeated_scans_keep_shape(seed in any::<u64>(), band in band()) {
        let mut generator = SimulationGenerator::with_seed(seed);
        for _ in 0..5 {
            let records = generator.generate(band);
            prop_assert!((3..=6).contains(&records.len()));
            prop_assert!(records.iter().all(|r| r.band == band));
        }
    }
}
