//! Fallback completion of partial pollutant vectors.
//!
//! The live sensor feed reliably reports particulates and the common gases
//! but not NO, CO, benzene, toluene, or xylene; those five are backfilled
//! with plausible synthetic magnitudes instead of zero, and a reported value
//! of exactly zero counts as missing for them. Everything else is assumed
//! genuinely near-zero when unreported.

use rand::Rng;

use crate::aqi::composite_aqi;
use crate::types::{MeasurementRecord, PartialReading};
use crate::utils::round2;

pub const NO_FILL_RANGE: (f64, f64) = (5.0, 50.0);
pub const CO_FILL_RANGE: (f64, f64) = (1.0, 5.0);
pub const BENZENE_FILL_RANGE: (f64, f64) = (1.0, 5.0);
pub const TOLUENE_FILL_RANGE: (f64, f64) = (5.0, 20.0);
pub const XYLENE_FILL_RANGE: (f64, f64) = (1.0, 10.0);

fn fill_or_synthesize(reported: Option<f64>, range: (f64, f64), rng: &mut impl Rng) -> f64 {
    match reported {
        Some(value) if value > 0.0 => round2(value),
        _ => round2(rng.gen_range(range.0..=range.1)),
    }
}

fn fill_or_zero(reported: Option<f64>) -> f64 {
    round2(reported.unwrap_or(0.0))
}

/// Complete a partial reading into a full record.
///
/// Recomputes `nox = no + no2` and the composite AQI after filling; the AQI
/// is never carried over from the source. Deterministic apart from the draws
/// taken from the injected random source.
pub fn complete_record(reading: &PartialReading, rng: &mut impl Rng) -> MeasurementRecord {
    let pm2_5 = fill_or_zero(reading.pm2_5);
    let pm10 = fill_or_zero(reading.pm10);
    let no = fill_or_synthesize(reading.no, NO_FILL_RANGE, rng);
    let no2 = fill_or_zero(reading.no2);
    let nox = round2(no + no2);
    let nh3 = fill_or_zero(reading.nh3);
    let co = fill_or_synthesize(reading.co, CO_FILL_RANGE, rng);
    let so2 = fill_or_zero(reading.so2);
    let o3 = fill_or_zero(reading.o3);
    let benzene = fill_or_synthesize(reading.benzene, BENZENE_FILL_RANGE, rng);
    let toluene = fill_or_synthesize(reading.toluene, TOLUENE_FILL_RANGE, rng);
    let xylene = fill_or_synthesize(reading.xylene, XYLENE_FILL_RANGE, rng);
    let aqi = composite_aqi(pm2_5, pm10);

    MeasurementRecord {
        pm2_5,
        pm10,
        no,
        no2,
        nox,
        nh3,
        co,
        so2,
        o3,
        benzene,
        toluene,
        xylene,
        aqi,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn seeded() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn synthesized_pollutants_are_never_zero_after_completion() {
        let mut rng = seeded();
        let record = complete_record(&PartialReading::default(), &mut rng);

        assert!(record.no >= NO_FILL_RANGE.0 && record.no <= NO_FILL_RANGE.1);
        assert!(record.co >= CO_FILL_RANGE.0 && record.co <= CO_FILL_RANGE.1);
        assert!(record.benzene >= BENZENE_FILL_RANGE.0 && record.benzene <= BENZENE_FILL_RANGE.1);
        assert!(record.toluene >= TOLUENE_FILL_RANGE.0 && record.toluene <= TOLUENE_FILL_RANGE.1);
        assert!(record.xylene >= XYLENE_FILL_RANGE.0 && record.xylene <= XYLENE_FILL_RANGE.1);
    }

    #[test]
    fn reported_zero_counts_as_missing_for_synthesized_pollutants() {
        let mut rng = seeded();
        let reading = PartialReading {
            no: Some(0.0),
            co: Some(0.0),
            benzene: Some(0.0),
            ..Default::default()
        };
        let record = complete_record(&reading, &mut rng);

        assert!(record.no > 0.0);
        assert!(record.co > 0.0);
        assert!(record.benzene > 0.0);
    }

    #[test]
    fn reported_values_survive_completion() {
        let mut rng = seeded();
        let reading = PartialReading {
            pm2_5: Some(20.0),
            pm10: Some(40.0),
            no: Some(12.345),
            no2: Some(8.0),
            so2: Some(3.5),
            ..Default::default()
        };
        let record = complete_record(&reading, &mut rng);

        assert_eq!(record.pm2_5, 20.0);
        assert_eq!(record.pm10, 40.0);
        assert_eq!(record.no, 12.35);
        assert_eq!(record.no2, 8.0);
        assert_eq!(record.so2, 3.5);
    }

    #[test]
    fn unreported_plain_pollutants_default_to_zero() {
        let mut rng = seeded();
        let record = complete_record(&PartialReading::default(), &mut rng);

        assert_eq!(record.pm2_5, 0.0);
        assert_eq!(record.pm10, 0.0);
        assert_eq!(record.no2, 0.0);
        assert_eq!(record.nh3, 0.0);
        assert_eq!(record.so2, 0.0);
        assert_eq!(record.o3, 0.0);
    }

    #[test]
    fn nox_is_rederived_from_no_and_no2() {
        let mut rng = seeded();
        let reading = PartialReading {
            no: Some(10.5),
            no2: Some(4.25),
            ..Default::default()
        };
        let record = complete_record(&reading, &mut rng);
        assert_eq!(record.nox, round2(record.no + record.no2));
        assert_eq!(record.nox, 14.75);
    }

    #[test]
    fn aqi_is_recomputed_from_filled_particulates() {
        let mut rng = seeded();
        let reading = PartialReading {
            pm2_5: Some(20.0),
            pm10: Some(40.0),
            ..Default::default()
        };
        assert_eq!(complete_record(&reading, &mut rng).aqi, 40);

        let mut rng = seeded();
        let reading = PartialReading {
            pm2_5: Some(140.0),
            ..Default::default()
        };
        assert_eq!(complete_record(&reading, &mut rng).aqi, 316);
    }

    #[test]
    fn identical_seeds_produce_identical_records() {
        let first = complete_record(&PartialReading::default(), &mut seeded());
        let second = complete_record(&PartialReading::default(), &mut seeded());
        assert_eq!(first, second);
    }
}
