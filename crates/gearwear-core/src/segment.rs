//! Tooth segmentation: grayscale gear image → ordered (index, contour) pairs.
//!
//! The stage runs several candidate binarizations, cleans each with a
//! close/open pass, filters external contours by area, distance from the
//! image center and bounding-box aspect ratio, and keeps whichever
//! binarization yielded the most valid candidates. Survivors are ordered by
//! their angle around the image center and normalized to the expected tooth
//! count before 1-based indices are assigned.

use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use imageproc::distance_transform::Norm;
use imageproc::filter::{box_filter, gaussian_blur_f32};
use imageproc::morphology::{close, open};

use crate::contour::ToothContour;

/// Policy for reducing surplus candidates down to the expected tooth count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ReducePolicy {
    /// Keep the largest-area candidates, then restore angular order.
    LargestArea,
    /// For each ideal slot at `i · 360/N` degrees, keep the single
    /// closest-angle candidate; surplus candidates are implicitly dropped.
    IdealSlots,
}

/// Segmentation parameters. Bounds are tuned per use case; see the
/// [`contact_sheet`](SegmentConfig::contact_sheet) and
/// [`single_gear`](SegmentConfig::single_gear) presets.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SegmentConfig {
    /// Gaussian denoise sigma applied before binarization.
    pub blur_sigma: f32,
    /// Radius of the local-mean window for the adaptive binarizations.
    pub block_radius: u32,
    /// Offset subtracted from the local mean; a pixel is foreground when it
    /// is darker than `mean - offset`.
    pub threshold_offset: u8,
    /// Structuring-element radius for the close/open cleanup.
    pub morph_radius: u8,
    /// Minimum contour area (px²).
    pub min_area: f64,
    /// Maximum contour area (px²).
    pub max_area: f64,
    /// Minimum centroid distance from the image center (px).
    pub min_center_dist: f64,
    /// Maximum centroid distance from the image center (px).
    pub max_center_dist: f64,
    /// Minimum bounding-box aspect ratio (width / height).
    pub min_aspect: f64,
    /// Maximum bounding-box aspect ratio.
    pub max_aspect: f64,
    /// Number of teeth the gear is known to have.
    pub expected_tooth_count: u32,
    /// How surplus candidates are reduced to the expected count.
    pub reduce: ReducePolicy,
}

impl SegmentConfig {
    /// Bounds for contact-sheet photographs where all teeth appear in one
    /// frame and individual blobs can be small.
    pub fn contact_sheet(expected_tooth_count: u32) -> Self {
        Self {
            blur_sigma: 1.1,
            block_radius: 10,
            threshold_offset: 10,
            morph_radius: 1,
            min_area: 20.0,
            max_area: 15000.0,
            min_center_dist: 10.0,
            max_center_dist: 500.0,
            min_aspect: 0.1,
            max_aspect: 10.0,
            expected_tooth_count,
            reduce: ReducePolicy::LargestArea,
        }
    }

    /// Tighter bounds for single-gear photographs normalized to 512×512,
    /// where teeth sit on a known annulus around the hub.
    pub fn single_gear(expected_tooth_count: u32) -> Self {
        Self {
            blur_sigma: 0.8,
            block_radius: 7,
            threshold_offset: 5,
            morph_radius: 1,
            min_area: 50.0,
            max_area: 8000.0,
            min_center_dist: 30.0,
            max_center_dist: 300.0,
            min_aspect: 0.2,
            max_aspect: 5.0,
            expected_tooth_count,
            reduce: ReducePolicy::IdealSlots,
        }
    }
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self::contact_sheet(35)
    }
}

/// A filtered contour candidate with its precomputed ordering keys.
struct Candidate {
    contour: ToothContour,
    area: f64,
    angle_deg: f64,
}

/// Segment individual teeth from a grayscale gear image.
///
/// Returns `(tooth_index, contour)` pairs with indices `1..=N` assigned by
/// ascending angle around the image center, or an empty vector when no
/// candidate binarization produces a valid contour — callers treat that as
/// "no usable teeth in this image" and skip it.
pub fn segment_teeth(gray: &GrayImage, config: &SegmentConfig) -> Vec<(u32, ToothContour)> {
    let (w, h) = gray.dimensions();
    if w < 4 || h < 4 {
        return Vec::new();
    }

    let blurred = gaussian_blur_f32(gray, config.blur_sigma.max(0.1));
    let binarizations = [
        binarize_adaptive_gaussian(&blurred, config),
        binarize_adaptive_mean(&blurred, config),
        binarize_otsu(&blurred),
    ];

    let center = ((w / 2) as f64, (h / 2) as f64);

    // More detected candidates is treated as the better segmentation.
    let mut best: Vec<Candidate> = Vec::new();
    for binary in &binarizations {
        let cleaned = open(
            &close(binary, Norm::LInf, config.morph_radius),
            Norm::LInf,
            config.morph_radius,
        );
        let valid = collect_valid_candidates(&cleaned, center, config);
        if valid.len() > best.len() {
            best = valid;
        }
    }

    if best.is_empty() {
        tracing::debug!("no valid tooth contours in any candidate binarization");
        return Vec::new();
    }

    best.sort_by(|a, b| a.angle_deg.total_cmp(&b.angle_deg));

    let expected = config.expected_tooth_count as usize;
    if best.len() > expected {
        best = match config.reduce {
            ReducePolicy::LargestArea => {
                let mut by_area = best;
                by_area.sort_by(|a, b| b.area.total_cmp(&a.area));
                by_area.truncate(expected);
                by_area.sort_by(|a, b| a.angle_deg.total_cmp(&b.angle_deg));
                by_area
            }
            ReducePolicy::IdealSlots => reduce_to_ideal_slots(best, config.expected_tooth_count),
        };
    }

    best.into_iter()
        .enumerate()
        .map(|(i, c)| (i as u32 + 1, c.contour))
        .collect()
}

/// Adaptive binarization against a Gaussian-weighted local mean; foreground
/// where the pixel is darker than `mean - offset` (teeth are dark on a
/// bright background after inversion).
fn binarize_adaptive_gaussian(gray: &GrayImage, config: &SegmentConfig) -> GrayImage {
    let sigma = (config.block_radius as f32 / 2.0).max(0.5);
    let local_mean = gaussian_blur_f32(gray, sigma);
    binarize_below_mean(gray, &local_mean, config.threshold_offset)
}

/// Adaptive binarization against a box-filter local mean.
fn binarize_adaptive_mean(gray: &GrayImage, config: &SegmentConfig) -> GrayImage {
    let local_mean = box_filter(gray, config.block_radius, config.block_radius);
    binarize_below_mean(gray, &local_mean, config.threshold_offset)
}

/// Global Otsu threshold, inverted so dark teeth become foreground.
fn binarize_otsu(gray: &GrayImage) -> GrayImage {
    let level = otsu_level(gray);
    threshold(gray, level, ThresholdType::BinaryInverted)
}

fn binarize_below_mean(gray: &GrayImage, local_mean: &GrayImage, offset: u8) -> GrayImage {
    let (w, h) = gray.dimensions();
    let mut out = GrayImage::new(w, h);
    for (src, (mean, dst)) in gray
        .pixels()
        .zip(local_mean.pixels().zip(out.pixels_mut()))
    {
        let cutoff = mean[0].saturating_sub(offset);
        *dst = Luma([if src[0] <= cutoff { 255 } else { 0 }]);
    }
    out
}

/// Trace external contours of the cleaned binarization and keep those whose
/// area, center distance and aspect ratio pass the configured bounds.
fn collect_valid_candidates(
    cleaned: &GrayImage,
    center: (f64, f64),
    config: &SegmentConfig,
) -> Vec<Candidate> {
    let mut valid = Vec::new();
    for traced in find_contours::<i32>(cleaned) {
        if traced.border_type != BorderType::Outer || traced.parent.is_some() {
            continue;
        }
        let contour = ToothContour::new(traced.points);
        let area = contour.area();
        if area < config.min_area || area > config.max_area {
            continue;
        }
        let (cx, cy) = contour.centroid();
        let dist = ((cx - center.0).powi(2) + (cy - center.1).powi(2)).sqrt();
        if dist < config.min_center_dist || dist > config.max_center_dist {
            continue;
        }
        let aspect = contour.bounding_box().aspect_ratio();
        if aspect < config.min_aspect || aspect > config.max_aspect {
            continue;
        }
        let angle_deg = (cy - center.1)
            .atan2(cx - center.0)
            .to_degrees()
            .rem_euclid(360.0);
        valid.push(Candidate {
            contour,
            area,
            angle_deg,
        });
    }
    valid
}

/// Select, for each ideal angular slot, the candidate with the closest
/// angle. Candidates arrive sorted by angle; the output stays slot-ordered.
fn reduce_to_ideal_slots(candidates: Vec<Candidate>, expected: u32) -> Vec<Candidate> {
    let spacing = 360.0 / expected as f64;
    let mut selected = Vec::with_capacity(expected as usize);
    for i in 0..expected {
        let ideal = i as f64 * spacing;
        if let Some(best) = candidates
            .iter()
            .min_by(|a, b| (a.angle_deg - ideal).abs().total_cmp(&(b.angle_deg - ideal).abs()))
        {
            selected.push(Candidate {
                contour: best.contour.clone(),
                area: best.area,
                angle_deg: best.angle_deg,
            });
        }
    }
    selected
}
