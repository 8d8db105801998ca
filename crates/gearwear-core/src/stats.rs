//! Per-wear-case summary statistics over a multi-tooth result set.

use std::collections::BTreeMap;

use crate::MeasurementRecord;

/// Spread of per-tooth depths within one wear case.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct CaseStatistics {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
    pub count: usize,
}

/// Compute mean/std/min/max/range/count of wear depth per wear case.
pub fn per_case_statistics(records: &[MeasurementRecord]) -> BTreeMap<i32, CaseStatistics> {
    let mut by_case: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
    for record in records {
        by_case
            .entry(record.wear_case)
            .or_default()
            .push(record.wear_depth_um);
    }

    by_case
        .into_iter()
        .map(|(case, depths)| {
            let count = depths.len();
            let mean = depths.iter().sum::<f64>() / count as f64;
            let variance =
                depths.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / count as f64;
            let min = depths.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = depths.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            (
                case,
                CaseStatistics {
                    mean,
                    std_dev: variance.sqrt(),
                    min,
                    max,
                    range: max - min,
                    count,
                },
            )
        })
        .collect()
}
