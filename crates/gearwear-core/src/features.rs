//! Shape-difference features between a healthy and a worn tooth contour.
//!
//! Features are computed in pixel units, then every `loss`/`diff` keyed
//! entry is scaled into micrometers by an effective µm/px factor estimated
//! from the healthy contour's area and the gear's expected tooth
//! cross-section. Ratio keys stay dimensionless. Feature vectors are
//! transient: created for one (healthy, worn) pair and never persisted.

use image::GrayImage;
use imageproc::distance_transform::euclidean_squared_distance_transform;
use imageproc::edges::canny;

use crate::contour::ToothContour;
use crate::geometry::GearGeometry;

/// Side length of the raster used for distance-transform and edge-density
/// measurements.
const MASK_SIZE: u32 = 512;

/// Multiplier applied to the geometry-derived scale estimate before
/// blending; absorbs the systematic bias of silhouette areas running large.
const SCALE_CALIBRATION: f64 = 0.8;

/// Fallback µm/px when the healthy contour area is degenerate.
const SCALE_FALLBACK_UM_PER_PX: f64 = 6.0;

/// Plausible µm/px range; the blended estimate is clamped into it.
const SCALE_MIN_UM_PER_PX: f64 = 4.0;
const SCALE_MAX_UM_PER_PX: f64 = 10.0;

/// Canny thresholds for the edge-density measurement on filled masks.
const EDGE_LOW: f32 = 50.0;
const EDGE_HIGH: f32 = 150.0;

/// Named shape-difference measurements for one (healthy, worn) pair.
///
/// Insertion order is stable, so vectors extracted with the same code path
/// always agree on key order (the regression strategy relies on this).
#[derive(Debug, Clone, Default)]
pub struct FeatureVector {
    entries: Vec<(&'static str, f64)>,
}

impl FeatureVector {
    fn insert(&mut self, key: &'static str, value: f64) {
        self.entries.push((key, value));
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(k, _)| *k)
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.entries.iter().map(|(_, v)| *v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Estimate a µm/px scale factor from the healthy contour's pixel area and
/// the expected physical tooth cross-section.
pub fn estimate_scale_um_per_px(healthy_area_px: f64, geometry: &GearGeometry) -> f64 {
    if healthy_area_px <= 0.0 {
        return SCALE_FALLBACK_UM_PER_PX;
    }
    let mm_per_px = (geometry.tooth_cross_section_mm2() / healthy_area_px).sqrt();
    mm_per_px * 1000.0 * SCALE_CALIBRATION
}

/// Blend the geometry-derived estimate with the caller-supplied target
/// scale (30/70) and clamp into the plausible range. Guards against
/// degenerate contour areas producing wildly wrong calibration.
fn effective_scale_um_per_px(
    target_um_per_px: f64,
    healthy_area_px: f64,
    geometry: &GearGeometry,
) -> f64 {
    let estimated = estimate_scale_um_per_px(healthy_area_px, geometry);
    (target_um_per_px * 0.3 + estimated * 0.7).clamp(SCALE_MIN_UM_PER_PX, SCALE_MAX_UM_PER_PX)
}

/// Compute the full shape-difference feature vector for a matched pair.
///
/// All denominators are guarded with `max(x, 1)` so degenerate contours
/// produce zeros rather than errors.
pub fn extract_features(
    healthy: &ToothContour,
    worn: &ToothContour,
    target_um_per_px: f64,
    geometry: &GearGeometry,
) -> FeatureVector {
    let mut features = FeatureVector::default();

    let healthy_area = healthy.area();
    let worn_area = worn.area();
    let healthy_perimeter = healthy.perimeter();
    let worn_perimeter = worn.perimeter();

    let scale = effective_scale_um_per_px(target_um_per_px, healthy_area, geometry);

    let area_loss = (healthy_area - worn_area) / healthy_area.max(1.0);
    features.insert("area_ratio", worn_area / healthy_area.max(1.0));
    features.insert("area_loss", area_loss);
    features.insert("area_loss_squared", area_loss.powi(2));
    features.insert("area_loss_cubic", area_loss.powi(3));
    features.insert("area_loss_sqrt", area_loss.max(0.0).sqrt());

    features.insert(
        "perimeter_ratio",
        worn_perimeter / healthy_perimeter.max(1.0),
    );
    features.insert(
        "perimeter_loss",
        (healthy_perimeter - worn_perimeter) / healthy_perimeter.max(1.0),
    );

    let healthy_bbox = healthy.bounding_box();
    let worn_bbox = worn.bounding_box();
    let height_loss =
        (healthy_bbox.height - worn_bbox.height) as f64 / (healthy_bbox.height.max(1)) as f64;
    features.insert(
        "height_ratio",
        worn_bbox.height as f64 / (healthy_bbox.height.max(1)) as f64,
    );
    features.insert(
        "width_ratio",
        worn_bbox.width as f64 / (healthy_bbox.width.max(1)) as f64,
    );
    features.insert("height_loss", height_loss);
    features.insert(
        "width_loss",
        (healthy_bbox.width - worn_bbox.width) as f64 / (healthy_bbox.width.max(1)) as f64,
    );
    features.insert("height_loss_squared", height_loss.powi(2));

    let healthy_hull_area = healthy.hull().area();
    let worn_hull_area = worn.hull().area();
    features.insert("hull_area_ratio", worn_hull_area / healthy_hull_area.max(1.0));
    features.insert(
        "hull_area_loss",
        (healthy_hull_area - worn_hull_area) / healthy_hull_area.max(1.0),
    );

    let healthy_solidity = healthy_area / healthy_hull_area.max(1.0);
    let worn_solidity = worn_area / worn_hull_area.max(1.0);
    features.insert("solidity_ratio", worn_solidity / healthy_solidity.max(1.0));
    features.insert("solidity_loss", healthy_solidity - worn_solidity);

    let healthy_mask = healthy.fill_mask(MASK_SIZE, MASK_SIZE);
    let worn_mask = worn.fill_mask(MASK_SIZE, MASK_SIZE);

    let healthy_dt = DistanceStats::of_mask(&healthy_mask);
    let worn_dt = DistanceStats::of_mask(&worn_mask);
    features.insert("dt_max_diff", healthy_dt.max - worn_dt.max);
    features.insert("dt_mean_diff", healthy_dt.mean - worn_dt.mean);
    features.insert("dt_median_diff", healthy_dt.median - worn_dt.median);
    features.insert("dt_std_diff", healthy_dt.std - worn_dt.std);

    let healthy_edges = edge_pixel_count(&healthy_mask);
    let worn_edges = edge_pixel_count(&worn_mask);
    features.insert(
        "edge_density_ratio",
        worn_edges as f64 / (healthy_edges.max(1)) as f64,
    );
    features.insert(
        "edge_density_loss",
        (healthy_edges as f64 - worn_edges as f64) / (healthy_edges.max(1)) as f64,
    );

    // Losses and diffs carry pixel units; convert them to micrometers.
    for (key, value) in features.entries.iter_mut() {
        if key.contains("loss") || key.contains("diff") {
            *value *= scale;
        }
    }

    features
}

/// Summary statistics of the Euclidean distance-to-boundary field over a
/// filled silhouette mask.
struct DistanceStats {
    max: f64,
    mean: f64,
    median: f64,
    std: f64,
}

impl DistanceStats {
    fn of_mask(mask: &GrayImage) -> Self {
        // Interior-depth semantics: distance from each foreground pixel to
        // the nearest background pixel, zero outside the silhouette. The
        // transform measures distance to the nearest foreground pixel, so
        // run it on the inverted mask.
        let mut inverted = mask.clone();
        for px in inverted.pixels_mut() {
            px[0] = 255 - px[0];
        }
        let squared = euclidean_squared_distance_transform(&inverted);
        let mut field: Vec<f64> = squared.pixels().map(|p| p[0].sqrt()).collect();

        let n = field.len().max(1) as f64;
        let sum: f64 = field.iter().sum();
        let mean = sum / n;
        let var = field.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n;
        let max = field.iter().cloned().fold(0.0, f64::max);
        field.sort_by(f64::total_cmp);
        let median = median_of_sorted(&field);

        Self {
            max,
            mean,
            median,
            std: var.sqrt(),
        }
    }
}

fn median_of_sorted(sorted: &[f64]) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn edge_pixel_count(mask: &GrayImage) -> u32 {
    let edges = canny(mask, EDGE_LOW, EDGE_HIGH);
    edges.pixels().filter(|p| p[0] > 0).count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use imageproc::point::Point;

    fn rect(x0: i32, y0: i32, w: i32, h: i32) -> ToothContour {
        ToothContour::new(vec![
            Point::new(x0, y0),
            Point::new(x0 + w, y0),
            Point::new(x0 + w, y0 + h),
            Point::new(x0, y0 + h),
        ])
    }

    #[test]
    fn area_loss_matches_relative_shrinkage() {
        // healthy 1000 px², worn 900 px², same centroid
        let healthy = rect(100, 100, 50, 20);
        let worn = rect(100, 101, 50, 18);
        let geometry = GearGeometry::default();

        let features = extract_features(&healthy, &worn, 6.0, &geometry);
        let scale = effective_scale_um_per_px(6.0, healthy.area(), &geometry);

        let scaled_loss = features.get("area_loss").unwrap();
        assert_relative_eq!(scaled_loss / scale, 0.10, epsilon = 1e-9);
        assert!(scaled_loss > 0.0);
    }

    #[test]
    fn ratio_keys_stay_dimensionless() {
        let healthy = rect(50, 50, 40, 40);
        let worn = rect(50, 50, 40, 30);
        let features = extract_features(&healthy, &worn, 6.0, &GearGeometry::default());

        assert_relative_eq!(
            features.get("area_ratio").unwrap(),
            worn.area() / healthy.area(),
            epsilon = 1e-9
        );
        assert_relative_eq!(features.get("height_ratio").unwrap(), 31.0 / 41.0, epsilon = 1e-9);
    }

    #[test]
    fn degenerate_contours_never_divide_by_zero() {
        let empty = ToothContour::new(vec![]);
        let features = extract_features(&empty, &empty, 6.0, &GearGeometry::default());
        for value in features.values() {
            assert!(value.is_finite(), "all features must stay finite");
        }
    }

    #[test]
    fn scale_estimate_clamps_into_plausible_range() {
        let geometry = GearGeometry::default();
        // Tiny healthy area → huge raw estimate → clamped to the maximum.
        let high = effective_scale_um_per_px(6.0, 10.0, &geometry);
        assert_relative_eq!(high, SCALE_MAX_UM_PER_PX, epsilon = 1e-9);
        // Enormous healthy area → near-zero raw estimate → clamped to the minimum.
        let low = effective_scale_um_per_px(6.0, 1.0e9, &geometry);
        assert_relative_eq!(low, SCALE_MIN_UM_PER_PX, epsilon = 1e-9);
    }

    #[test]
    fn degenerate_area_uses_fallback_scale() {
        let geometry = GearGeometry::default();
        assert_relative_eq!(
            estimate_scale_um_per_px(0.0, &geometry),
            SCALE_FALLBACK_UM_PER_PX,
            epsilon = 1e-9
        );
    }

    #[test]
    fn deeper_silhouette_has_larger_distance_transform_mean() {
        let big = rect(100, 100, 200, 200).fill_mask(512, 512);
        let small = rect(100, 100, 50, 50).fill_mask(512, 512);
        let big_stats = DistanceStats::of_mask(&big);
        let small_stats = DistanceStats::of_mask(&small);
        assert!(big_stats.max > small_stats.max);
        assert!(big_stats.mean > small_stats.mean);
    }

    #[test]
    fn feature_key_order_is_stable() {
        let healthy = rect(50, 50, 40, 40);
        let worn = rect(50, 50, 40, 30);
        let a = extract_features(&healthy, &worn, 6.0, &GearGeometry::default());
        let b = extract_features(&healthy, &worn, 6.0, &GearGeometry::default());
        assert!(a.keys().eq(b.keys()));
        assert_eq!(a.len(), 22);
    }
}
