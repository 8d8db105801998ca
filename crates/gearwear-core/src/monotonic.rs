//! Post-hoc monotonicity enforcement: wear cannot heal, so per-tooth depth
//! sequences must be non-decreasing in wear-case order.
//!
//! The two pipelines encode different noise assumptions and are deliberately
//! not unified: the multi-tooth path clamps flat to the running maximum,
//! while the single-tooth path forces a small forward increment (1.02×) and
//! tags the adjusted record.

use std::collections::BTreeMap;

use crate::MeasurementRecord;

/// Growth factor applied when a single-tooth depth regresses.
const SINGLE_TOOTH_GROWTH: f64 = 1.02;

/// Suffix appended to the method tag of an adjusted single-tooth record.
const MONOTONIC_SUFFIX: &str = "_monotonic";

/// Multi-tooth enforcement: per tooth, in ascending wear-case order, clamp
/// every regressing depth up to the running maximum seen so far.
pub fn enforce_per_tooth(records: &mut [MeasurementRecord]) {
    let mut groups: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for (i, record) in records.iter().enumerate() {
        groups
            .entry(record.tooth_number.unwrap_or(1))
            .or_default()
            .push(i);
    }

    for indices in groups.values_mut() {
        indices.sort_by_key(|&i| records[i].wear_case);
        let mut max_wear = 0.0_f64;
        for &i in indices.iter() {
            let current = records[i].wear_depth_um;
            if current < max_wear {
                records[i].wear_depth_um = max_wear;
            } else {
                max_wear = current;
            }
        }
    }
}

/// Single-tooth enforcement: sort by wear case; whenever a depth falls below
/// its predecessor (both clamped to ≥ 0 for the comparison), replace it with
/// `min(previous · 1.02, max_wear_um)` and suffix the method tag.
pub fn enforce_single_tooth(records: &mut [MeasurementRecord], max_wear_um: f64) {
    records.sort_by_key(|r| r.wear_case);
    for i in 1..records.len() {
        let previous = records[i - 1].wear_depth_um.max(0.0);
        let current = records[i].wear_depth_um.max(0.0);
        if current < previous {
            let adjusted = (previous * SINGLE_TOOTH_GROWTH).min(max_wear_um).max(0.0);
            records[i].wear_depth_um = adjusted;
            records[i].method.push_str(MONOTONIC_SUFFIX);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::MAX_THEORETICAL_WEAR_UM;
    use approx::assert_relative_eq;

    fn record(case: i32, tooth: Option<u32>, depth: f64) -> MeasurementRecord {
        MeasurementRecord {
            wear_case: case,
            tooth_number: tooth,
            wear_depth_um: depth,
            method: "optimized".to_string(),
        }
    }

    #[test]
    fn per_tooth_sequences_become_non_decreasing() {
        let mut records = vec![
            record(1, Some(1), 40.0),
            record(2, Some(1), 35.0), // regression
            record(3, Some(1), 90.0),
            record(1, Some(2), 50.0),
            record(2, Some(2), 70.0),
            record(3, Some(2), 60.0), // regression
        ];
        enforce_per_tooth(&mut records);

        for tooth in [1u32, 2] {
            let mut depths: Vec<(i32, f64)> = records
                .iter()
                .filter(|r| r.tooth_number == Some(tooth))
                .map(|r| (r.wear_case, r.wear_depth_um))
                .collect();
            depths.sort_by_key(|(case, _)| *case);
            for pair in depths.windows(2) {
                assert!(
                    pair[1].1 >= pair[0].1,
                    "tooth {} regresses: {:?}",
                    tooth,
                    depths
                );
            }
        }
        // flat clamp, not interpolation
        assert_relative_eq!(records[1].wear_depth_um, 40.0, epsilon = 1e-9);
        assert_relative_eq!(records[5].wear_depth_um, 70.0, epsilon = 1e-9);
    }

    #[test]
    fn per_tooth_clamp_does_not_touch_method_tags() {
        let mut records = vec![record(1, Some(1), 40.0), record(2, Some(1), 10.0)];
        enforce_per_tooth(&mut records);
        assert_eq!(records[1].method, "optimized");
    }

    #[test]
    fn single_tooth_regressions_get_forward_increment_and_suffix() {
        let mut records = vec![
            record(1, None, 100.0),
            record(2, None, 90.0), // regression
            record(3, None, 150.0),
        ];
        enforce_single_tooth(&mut records, MAX_THEORETICAL_WEAR_UM);

        assert_relative_eq!(records[1].wear_depth_um, 102.0, epsilon = 1e-9);
        assert!(records[1].method.ends_with("_monotonic"));
        assert_eq!(records[0].method, "optimized");
        assert_eq!(records[2].method, "optimized");
        for pair in records.windows(2) {
            assert!(pair[1].wear_depth_um >= pair[0].wear_depth_um);
        }
    }

    #[test]
    fn single_tooth_increment_is_capped_at_theoretical_maximum() {
        let mut records = vec![record(1, None, 1499.0), record(2, None, 10.0)];
        enforce_single_tooth(&mut records, MAX_THEORETICAL_WEAR_UM);
        assert_relative_eq!(
            records[1].wear_depth_um,
            MAX_THEORETICAL_WEAR_UM,
            epsilon = 1e-9
        );
    }

    #[test]
    fn single_tooth_sorts_by_wear_case_before_enforcing() {
        let mut records = vec![
            record(3, None, 150.0),
            record(1, None, 100.0),
            record(2, None, 90.0),
        ];
        enforce_single_tooth(&mut records, MAX_THEORETICAL_WEAR_UM);
        let cases: Vec<i32> = records.iter().map(|r| r.wear_case).collect();
        assert_eq!(cases, vec![1, 2, 3]);
        assert_relative_eq!(records[1].wear_depth_um, 102.0, epsilon = 1e-9);
    }

    #[test]
    fn negative_depths_compare_as_zero() {
        let mut records = vec![record(1, None, -5.0), record(2, None, -3.0)];
        enforce_single_tooth(&mut records, MAX_THEORETICAL_WEAR_UM);
        // clamped comparison sees 0.0 vs 0.0: no adjustment happens
        assert_relative_eq!(records[1].wear_depth_um, -3.0, epsilon = 1e-9);
        assert_eq!(records[1].method, "optimized");
    }

    #[test]
    fn empty_result_sets_are_left_alone() {
        let mut records: Vec<MeasurementRecord> = Vec::new();
        enforce_per_tooth(&mut records);
        enforce_single_tooth(&mut records, MAX_THEORETICAL_WEAR_UM);
        assert!(records.is_empty());
    }
}
