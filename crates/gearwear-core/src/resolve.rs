//! Wear-depth resolution: convert case/tooth identity and shape features
//! into a micrometer value with a provenance tag.
//!
//! Precedence, checked in order: manual overrides for known problematic
//! early-wear cases, the optimized table for later cases, the ground-truth
//! lookup, the trained regression strategy (if attached), and finally a
//! feature-derived heuristic. Every result is clamped to the physically
//! plausible range.

pub mod model;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::error::{Result, WearError};
use crate::features::FeatureVector;
use model::WearModel;

/// Relative standard deviation of the tooth-to-tooth variation applied to
/// teeth other than tooth 1 in the multi-tooth pipeline.
pub const TOOTH_VARIATION_SIGMA: f64 = 0.05;

/// Gain applied to the `area_loss` feature in the fallback heuristic.
const FEATURE_FALLBACK_GAIN: f64 = 1000.0;

const DEFAULT_SEED: u64 = 42;

/// Provenance of a resolved wear depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Method {
    /// Explicit manual override for a known problematic case.
    ManualAdjustment,
    /// Optimized-results table entry.
    Optimized,
    /// Ground-truth lookup entry.
    ActualMeasurement,
    /// Trained regression strategy.
    Model,
    /// Feature-derived heuristic fallback.
    FeatureBased,
    /// Per-tooth analysis failure; depth is zero.
    Error,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::ManualAdjustment => "manual_adjustment",
            Method::Optimized => "optimized",
            Method::ActualMeasurement => "actual_measurement",
            Method::Model => "model",
            Method::FeatureBased => "feature_based",
            Method::Error => "error",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wear-depth lookup tables keyed by wear case.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LookupTables {
    /// Manual corrections for problematic early-wear cases.
    pub manual_adjustments: BTreeMap<i32, f64>,
    /// Optimized results preserved for the later wear cases.
    pub optimized: BTreeMap<i32, f64>,
    /// Ground-truth measurements; replaceable from a CSV file.
    pub ground_truth: BTreeMap<i32, f64>,
}

impl Default for LookupTables {
    fn default() -> Self {
        let manual_adjustments = BTreeMap::from([
            (1, 38.0),
            (2, 77.0),
            (4, 152.0),
            (5, 166.0),
            (6, 185.0),
        ]);
        let optimized = BTreeMap::from([
            (7, 258.7),
            (8, 271.6),
            (9, 285.2),
            (10, 299.5),
            (11, 314.4),
            (12, 330.1),
            (13, 346.7),
            (14, 364.0),
            (15, 382.2),
            (16, 401.3),
            (17, 421.4),
            (18, 442.4),
            (19, 464.6),
            (20, 487.8),
            (21, 512.2),
            (22, 537.8),
            (23, 564.7),
            (24, 592.9),
            (25, 622.5),
            (26, 653.7),
            (27, 686.4),
            (28, 720.7),
            (29, 756.7),
            (30, 794.5),
            (31, 834.3),
            (32, 876.0),
            (33, 919.8),
            (34, 965.8),
            (35, 1000.0),
        ]);
        let ground_truth = BTreeMap::from([
            (1, 40.0),
            (2, 81.0),
            (3, 115.0),
            (4, 159.0),
            (5, 175.0),
            (6, 195.0),
            (7, 227.0),
            (8, 256.0),
            (9, 276.0),
            (10, 294.0),
            (11, 305.0),
            (12, 323.0),
            (13, 344.0),
            (14, 378.0),
            (15, 400.0),
            (16, 417.0),
            (17, 436.0),
            (18, 450.0),
            (19, 466.0),
            (20, 488.0),
            (21, 510.0),
            (22, 524.0),
            (23, 557.0),
            (24, 579.0),
            (25, 608.0),
            (26, 637.0),
            (27, 684.0),
            (28, 720.0),
            (29, 744.0),
            (30, 769.0),
            (31, 797.0),
            (32, 825.0),
            (33, 853.0),
            (34, 890.0),
            (35, 932.0),
        ]);
        Self {
            manual_adjustments,
            optimized,
            ground_truth,
        }
    }
}

impl LookupTables {
    /// Replace the ground-truth table from a two-column CSV
    /// (`wear_case,actual_wear_depth_um`).
    pub fn with_ground_truth_csv(mut self, path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(WearError::MissingResource(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        let mut table = BTreeMap::new();
        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line_no == 0 && line.to_ascii_lowercase().starts_with("wear_case") {
                continue;
            }
            let mut fields = line.split(',');
            let case = fields.next().and_then(|f| f.trim().parse::<i32>().ok());
            let depth = fields.next().and_then(|f| f.trim().parse::<f64>().ok());
            match (case, depth) {
                (Some(case), Some(depth)) => {
                    table.insert(case, depth);
                }
                _ => {
                    return Err(WearError::Table {
                        path: path.to_path_buf(),
                        reason: format!("line {}: expected `wear_case,depth`", line_no + 1),
                    })
                }
            }
        }
        self.ground_truth = table;
        Ok(self)
    }
}

/// Resolves wear depths with the fixed precedence chain and applies the
/// per-tooth variation for the multi-tooth pipeline.
#[derive(Debug)]
pub struct DepthResolver {
    tables: LookupTables,
    model: Option<WearModel>,
    rng: StdRng,
    variation: Normal<f64>,
    max_wear_um: f64,
}

impl DepthResolver {
    pub fn new(tables: LookupTables, max_wear_um: f64) -> Self {
        Self {
            tables,
            model: None,
            rng: StdRng::seed_from_u64(DEFAULT_SEED),
            variation: Normal::new(1.0, TOOTH_VARIATION_SIGMA)
                .expect("variation sigma is finite and positive"),
            max_wear_um,
        }
    }

    /// Reseed the tooth-variation RNG (reproducible batches).
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Attach the trained regression strategy. It slots in after the lookup
    /// tables, so it only fires for cases none of the tables cover.
    pub fn with_model(mut self, model: WearModel) -> Self {
        self.model = Some(model);
        self
    }

    /// Resolve a single-tooth wear depth for one wear case.
    pub fn resolve(&self, wear_case: i32, features: Option<&FeatureVector>) -> (f64, Method) {
        let (depth, method) = if let Some(&depth) = self.tables.manual_adjustments.get(&wear_case) {
            (depth, Method::ManualAdjustment)
        } else if let Some(&depth) = self.tables.optimized.get(&wear_case) {
            (depth, Method::Optimized)
        } else if let Some(&depth) = self.tables.ground_truth.get(&wear_case) {
            (depth, Method::ActualMeasurement)
        } else if let (Some(model), Some(features)) = (self.model.as_ref(), features) {
            (model.predict(features), Method::Model)
        } else {
            let area_loss = features.and_then(|f| f.get("area_loss")).unwrap_or(0.0);
            (area_loss * FEATURE_FALLBACK_GAIN, Method::FeatureBased)
        };
        (depth.clamp(0.0, self.max_wear_um), method)
    }

    /// Resolve a depth for one (wear case, tooth) pair.
    ///
    /// Tooth 1 reproduces the single-tooth value exactly so the two
    /// pipelines agree; other teeth get independent multiplicative Gaussian
    /// variation around the same base value.
    pub fn resolve_tooth(
        &mut self,
        wear_case: i32,
        tooth_number: u32,
        features: Option<&FeatureVector>,
    ) -> (f64, Method) {
        let (base, method) = self.resolve(wear_case, features);
        if tooth_number == 1 {
            return (base, method);
        }
        let factor = self.variation.sample(&mut self.rng);
        ((base * factor).clamp(0.0, self.max_wear_um), method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contour::ToothContour;
    use crate::features::extract_features;
    use crate::geometry::{GearGeometry, MAX_THEORETICAL_WEAR_UM};
    use approx::assert_relative_eq;
    use imageproc::point::Point;

    fn resolver() -> DepthResolver {
        DepthResolver::new(LookupTables::default(), MAX_THEORETICAL_WEAR_UM)
    }

    fn sample_features() -> FeatureVector {
        let healthy = ToothContour::new(vec![
            Point::new(0, 0),
            Point::new(50, 0),
            Point::new(50, 20),
            Point::new(0, 20),
        ]);
        let worn = ToothContour::new(vec![
            Point::new(0, 0),
            Point::new(50, 0),
            Point::new(50, 16),
            Point::new(0, 16),
        ]);
        extract_features(&healthy, &worn, 6.0, &GearGeometry::default())
    }

    #[test]
    fn manual_override_wins_regardless_of_features() {
        let r = resolver();
        let features = sample_features();
        let (depth, method) = r.resolve(1, Some(&features));
        assert_relative_eq!(depth, 38.0, epsilon = 1e-9);
        assert_eq!(method, Method::ManualAdjustment);
        assert_eq!(method.as_str(), "manual_adjustment");

        let (depth, method) = r.resolve(1, None);
        assert_relative_eq!(depth, 38.0, epsilon = 1e-9);
        assert_eq!(method, Method::ManualAdjustment);
    }

    #[test]
    fn precedence_falls_through_the_tables() {
        let r = resolver();
        // Case 3 has no manual or optimized entry: ground truth applies.
        let (depth, method) = r.resolve(3, None);
        assert_relative_eq!(depth, 115.0, epsilon = 1e-9);
        assert_eq!(method, Method::ActualMeasurement);
        // Case 7 is the first optimized entry.
        let (depth, method) = r.resolve(7, None);
        assert_relative_eq!(depth, 258.7, epsilon = 1e-9);
        assert_eq!(method, Method::Optimized);
    }

    #[test]
    fn uncovered_case_uses_feature_heuristic() {
        let r = resolver();
        let features = sample_features();
        let (depth, method) = r.resolve(99, Some(&features));
        assert_eq!(method, Method::FeatureBased);
        let expected = (features.get("area_loss").unwrap() * 1000.0)
            .clamp(0.0, MAX_THEORETICAL_WEAR_UM);
        assert_relative_eq!(depth, expected, epsilon = 1e-9);
    }

    #[test]
    fn uncovered_case_without_features_resolves_to_zero() {
        let r = resolver();
        let (depth, method) = r.resolve(99, None);
        assert_relative_eq!(depth, 0.0, epsilon = 1e-9);
        assert_eq!(method, Method::FeatureBased);
    }

    #[test]
    fn tooth_one_reproduces_single_tooth_value_exactly() {
        let mut r = resolver();
        let (single, _) = r.resolve(12, None);
        let (tooth1, _) = r.resolve_tooth(12, 1, None);
        assert_relative_eq!(single, tooth1, epsilon = 1e-12);
    }

    #[test]
    fn other_teeth_vary_but_stay_in_bounds() {
        let mut r = resolver();
        let (base, _) = r.resolve(20, None);
        for tooth in 2..=35 {
            let (depth, _) = r.resolve_tooth(20, tooth, None);
            assert!(depth >= 0.0 && depth <= MAX_THEORETICAL_WEAR_UM);
            // 5% sigma: anything further than 40% out indicates a bug
            assert!((depth - base).abs() < base * 0.4, "depth {} vs base {}", depth, base);
        }
    }

    #[test]
    fn variation_is_reproducible_for_a_fixed_seed() {
        let mut a = resolver().with_seed(7);
        let mut b = resolver().with_seed(7);
        for tooth in 2..=10 {
            assert_eq!(
                a.resolve_tooth(15, tooth, None).0,
                b.resolve_tooth(15, tooth, None).0
            );
        }
    }

    #[test]
    fn resolved_depths_are_clamped_to_theoretical_maximum() {
        let mut tables = LookupTables::default();
        tables.manual_adjustments.insert(50, 9000.0);
        let r = DepthResolver::new(tables, MAX_THEORETICAL_WEAR_UM);
        let (depth, _) = r.resolve(50, None);
        assert_relative_eq!(depth, MAX_THEORETICAL_WEAR_UM, epsilon = 1e-9);
    }

    /// The regression strategy exists behind the same interface but is
    /// shadowed by the lookup tables for every wear case the pipelines
    /// actually exercise. This duplication is intentional and preserved;
    /// the assertion documents it.
    #[test]
    fn model_is_shadowed_by_tables_for_all_cases() {
        let features = sample_features();
        let samples: Vec<(FeatureVector, f64)> = (0..5)
            .map(|i| (sample_features(), 40.0 + 10.0 * i as f64))
            .collect();
        let model = WearModel::fit(&samples).expect("enough samples to fit");
        let r = resolver().with_model(model);
        for case in 1..=35 {
            let (_, method) = r.resolve(case, Some(&features));
            assert_ne!(method, Method::Model, "case {} must come from a table", case);
        }
    }

    #[test]
    fn ground_truth_csv_replaces_default_table() {
        use std::io::Write;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ground_truth.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "wear_case,actual_wear_depth_um").unwrap();
        writeln!(file, "1,41.5").unwrap();
        writeln!(file, "2,80.0").unwrap();
        drop(file);

        let tables = LookupTables::default().with_ground_truth_csv(&path).unwrap();
        assert_eq!(tables.ground_truth.len(), 2);
        assert_relative_eq!(tables.ground_truth[&1], 41.5, epsilon = 1e-9);
    }

    #[test]
    fn missing_ground_truth_csv_is_a_missing_resource() {
        let err = LookupTables::default()
            .with_ground_truth_csv(Path::new("/nonexistent/gt.csv"))
            .unwrap_err();
        assert!(matches!(err, WearError::MissingResource(_)));
    }
}
