//! Healthy ↔ worn tooth correspondence under rotation and occlusion noise.
//!
//! Candidates are gated by a plausible area band and a maximum centroid
//! distance, then ranked by a weighted distance/area/perimeter score. The
//! weights encode area similarity as the primary wear signal, perimeter as
//! secondary, and spatial proximity as a sanity gate rather than a primary
//! criterion.

use crate::contour::ToothContour;

/// Matching gates and score weights.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MatchConfig {
    /// Maximum centroid distance between healthy and candidate (px).
    pub max_centroid_dist: f64,
    /// Minimum candidate area (px²).
    pub min_area: f64,
    /// Maximum candidate area (px²).
    pub max_area: f64,
    /// Weight of the normalized centroid distance term.
    pub w_distance: f64,
    /// Weight of the relative area difference term.
    pub w_area: f64,
    /// Weight of the relative perimeter difference term.
    pub w_perimeter: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            max_centroid_dist: 300.0,
            min_area: 20.0,
            max_area: 5000.0,
            w_distance: 0.2,
            w_area: 0.5,
            w_perimeter: 0.3,
        }
    }
}

/// Find the worn candidate most similar to the healthy reference tooth.
///
/// Returns `None` when no candidate passes the distance and area gates.
pub fn match_tooth<'a>(
    healthy: &ToothContour,
    candidates: &'a [(u32, ToothContour)],
    config: &MatchConfig,
) -> Option<(u32, &'a ToothContour)> {
    if candidates.is_empty() {
        return None;
    }

    let healthy_area = healthy.area();
    let healthy_perimeter = healthy.perimeter();

    let mut best: Option<(u32, &ToothContour)> = None;
    let mut best_score = f64::INFINITY;

    for (index, candidate) in candidates {
        let area = candidate.area();
        if area < config.min_area || area > config.max_area {
            continue;
        }
        let centroid_dist = healthy.centroid_distance(candidate);
        if centroid_dist > config.max_centroid_dist {
            continue;
        }

        let area_diff = (area - healthy_area).abs() / healthy_area.max(1.0);
        let perimeter_diff =
            (candidate.perimeter() - healthy_perimeter).abs() / healthy_perimeter.max(1.0);
        let distance_norm = centroid_dist / config.max_centroid_dist;

        let score = config.w_distance * distance_norm
            + config.w_area * area_diff
            + config.w_perimeter * perimeter_diff;

        if score < best_score {
            best_score = score;
            best = Some((*index, candidate));
        }
    }

    best
}
