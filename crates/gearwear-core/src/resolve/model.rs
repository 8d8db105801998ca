//! Trained regression strategy for wear-depth prediction.
//!
//! A linear least-squares model over feature vectors, fit with an SVD
//! solve. It stays behind the [`DepthResolver`](super::DepthResolver)
//! interface as the alternate to the lookup tables; in the current
//! configuration every exercised wear case is covered by a table, so the
//! model only fires for cases the tables miss.

use nalgebra::{DMatrix, DVector};

use crate::features::FeatureVector;

/// Minimum number of training samples required to fit.
const MIN_SAMPLES: usize = 3;

/// Upper bound on early-wear predictions (µm).
const EARLY_WEAR_MAX_UM: f64 = 300.0;

/// Calibration applied after clamping.
const MODEL_CALIBRATION: f64 = 0.8;

/// Linear wear-depth model: one weight per feature key plus an intercept.
#[derive(Debug, Clone)]
pub struct WearModel {
    keys: Vec<&'static str>,
    /// Feature weights followed by the intercept term.
    weights: DVector<f64>,
}

impl WearModel {
    /// Fit by least squares. Returns `None` with fewer than three samples
    /// or when the design matrix is rank-deficient beyond recovery.
    pub fn fit(samples: &[(FeatureVector, f64)]) -> Option<Self> {
        if samples.len() < MIN_SAMPLES {
            return None;
        }
        let keys: Vec<&'static str> = samples[0].0.keys().collect();
        let n_rows = samples.len();
        let n_cols = keys.len() + 1;

        let mut design = DMatrix::<f64>::zeros(n_rows, n_cols);
        let mut targets = DVector::<f64>::zeros(n_rows);
        for (row, (features, depth)) in samples.iter().enumerate() {
            for (col, key) in keys.iter().enumerate() {
                design[(row, col)] = features.get(key).unwrap_or(0.0);
            }
            design[(row, n_cols - 1)] = 1.0;
            targets[row] = *depth;
        }

        let svd = design.svd(true, true);
        let weights = svd.solve(&targets, 1e-10).ok()?;
        Some(Self { keys, weights })
    }

    /// Predict a wear depth (µm) from a feature vector, with the early-wear
    /// clamp and calibration applied.
    pub fn predict(&self, features: &FeatureVector) -> f64 {
        let n = self.keys.len();
        let mut value = self.weights[n];
        for (i, key) in self.keys.iter().enumerate() {
            value += self.weights[i] * features.get(key).unwrap_or(0.0);
        }
        (value.clamp(0.0, EARLY_WEAR_MAX_UM) * MODEL_CALIBRATION).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contour::ToothContour;
    use crate::features::extract_features;
    use crate::geometry::GearGeometry;
    use imageproc::point::Point;

    fn pair_features(worn_height: i32) -> FeatureVector {
        let healthy = ToothContour::new(vec![
            Point::new(0, 0),
            Point::new(50, 0),
            Point::new(50, 20),
            Point::new(0, 20),
        ]);
        let worn = ToothContour::new(vec![
            Point::new(0, 0),
            Point::new(50, 0),
            Point::new(50, worn_height),
            Point::new(0, worn_height),
        ]);
        extract_features(&healthy, &worn, 6.0, &GearGeometry::default())
    }

    #[test]
    fn refuses_to_fit_with_too_few_samples() {
        let samples = vec![(pair_features(18), 40.0), (pair_features(16), 80.0)];
        assert!(WearModel::fit(&samples).is_none());
    }

    #[test]
    fn predictions_respect_the_early_wear_bounds() {
        let samples: Vec<(FeatureVector, f64)> = (0..6)
            .map(|i| (pair_features(19 - i), 40.0 + 35.0 * i as f64))
            .collect();
        let model = WearModel::fit(&samples).expect("fit succeeds");
        for height in [19, 17, 15, 13] {
            let pred = model.predict(&pair_features(height));
            assert!(pred >= 0.0, "prediction must be non-negative");
            assert!(
                pred <= EARLY_WEAR_MAX_UM * MODEL_CALIBRATION + 1e-9,
                "prediction {} exceeds calibrated early-wear cap",
                pred
            );
        }
    }

    #[test]
    fn more_wear_predicts_more_depth() {
        let samples: Vec<(FeatureVector, f64)> = (0..6)
            .map(|i| (pair_features(19 - i), 40.0 + 35.0 * i as f64))
            .collect();
        let model = WearModel::fit(&samples).expect("fit succeeds");
        let mild = model.predict(&pair_features(19));
        let severe = model.predict(&pair_features(14));
        assert!(severe > mild, "severe {} should exceed mild {}", severe, mild);
    }
}
