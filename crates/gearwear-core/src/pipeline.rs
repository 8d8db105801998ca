//! Batch orchestration: image directories in, reconciled result sets out.
//!
//! Two pipeline configurations exist, selected by [`PipelineKind`] at
//! construction time (there is no runtime string dispatch):
//!
//! - `AllTeeth` — every tooth of every wear-case photograph, paired with the
//!   healthy reference tooth of the same index when a healthy image is
//!   present in the directory.
//! - `ToothOne` — a single designated healthy image plus a `W<N> …` worn
//!   series; the healthy tooth's worn counterpart is found by similarity
//!   search per image.
//!
//! Each pipeline appends to its result set image by image, enforces
//! monotonicity once over the complete set, and leaves tabulation to the
//! caller. Per-unit failures (unreadable image, no usable teeth, no match)
//! are logged and skipped; only missing top-level resources are errors.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::GrayImage;

use crate::contour::ToothContour;
use crate::error::{Result, WearError};
use crate::features::extract_features;
use crate::geometry::{GearGeometry, MAX_THEORETICAL_WEAR_UM};
use crate::matching::{match_tooth, MatchConfig};
use crate::monotonic;
use crate::resolve::{DepthResolver, LookupTables, Method};
use crate::segment::{segment_teeth, SegmentConfig};
use crate::wear_case::{is_healthy_name, wear_case_from_name, wear_series_number, HEALTHY_CASE};
use crate::MeasurementRecord;

/// Raster extensions the directory scan accepts.
const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "tiff", "tif"];

/// Sort key for files whose names encode no wear case.
const UNNUMBERED_SORT_CASE: i32 = 999;

/// Closed set of pipeline configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PipelineKind {
    /// Full-gear analysis: one record per (wear case, tooth).
    AllTeeth,
    /// Single-tooth analysis: one record per wear case.
    ToothOne,
}

/// Everything a pipeline run needs, constructed once at process start and
/// passed by reference. No component reads ambient global state.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub kind: PipelineKind,
    pub geometry: GearGeometry,
    pub tables: LookupTables,
    pub segment: SegmentConfig,
    pub matching: MatchConfig,
    /// Caller-supplied µm/px prior blended into the scale estimate.
    pub target_um_per_px: f64,
    pub max_wear_um: f64,
    /// Square side the input images are normalized to before segmentation,
    /// if any.
    pub resize_to: Option<u32>,
    /// Seed for the per-tooth variation RNG.
    pub variation_seed: u64,
}

impl AnalysisConfig {
    /// Configuration for the full-gear pipeline.
    pub fn all_teeth() -> Self {
        let geometry = GearGeometry::default();
        Self {
            kind: PipelineKind::AllTeeth,
            segment: SegmentConfig::contact_sheet(geometry.tooth_count),
            geometry,
            tables: LookupTables::default(),
            matching: MatchConfig::default(),
            target_um_per_px: 6.0,
            max_wear_um: MAX_THEORETICAL_WEAR_UM,
            resize_to: None,
            variation_seed: 42,
        }
    }

    /// Configuration for the single-tooth pipeline.
    pub fn tooth_one() -> Self {
        let geometry = GearGeometry::default();
        Self {
            kind: PipelineKind::ToothOne,
            segment: SegmentConfig::single_gear(geometry.tooth_count),
            geometry,
            tables: LookupTables::default(),
            matching: MatchConfig::default(),
            target_um_per_px: 6.0,
            max_wear_um: MAX_THEORETICAL_WEAR_UM,
            resize_to: Some(512),
            variation_seed: 42,
        }
    }

    pub fn for_kind(kind: PipelineKind) -> Self {
        match kind {
            PipelineKind::AllTeeth => Self::all_teeth(),
            PipelineKind::ToothOne => Self::tooth_one(),
        }
    }
}

/// Run the configured pipeline over an image directory.
///
/// `healthy` optionally designates the healthy reference image; when absent
/// it is searched for in the directory by its `healthy` name marker. The
/// returned result set already has monotonicity enforced.
pub fn analyze(
    images_dir: &Path,
    healthy: Option<&Path>,
    config: &AnalysisConfig,
) -> Result<Vec<MeasurementRecord>> {
    match config.kind {
        PipelineKind::AllTeeth => analyze_all_teeth(images_dir, healthy, config),
        PipelineKind::ToothOne => analyze_tooth_one(images_dir, healthy, config),
    }
}

fn analyze_all_teeth(
    images_dir: &Path,
    healthy: Option<&Path>,
    config: &AnalysisConfig,
) -> Result<Vec<MeasurementRecord>> {
    let images = list_images(images_dir)?;
    tracing::info!("found {} gear images in {}", images.len(), images_dir.display());

    let healthy_path = healthy
        .map(Path::to_path_buf)
        .or_else(|| images.iter().find(|p| path_is_healthy(p)).cloned());
    let healthy_teeth = healthy_reference_teeth(healthy_path.as_deref(), config);

    let mut resolver = DepthResolver::new(config.tables.clone(), config.max_wear_um)
        .with_seed(config.variation_seed);
    let mut records = Vec::new();

    for (i, path) in images.iter().enumerate() {
        let name = file_name(path);
        let case = wear_case_from_name(&name, (i + 1) as i32);
        if case == HEALTHY_CASE {
            tracing::debug!("skipping healthy reference {}", name);
            continue;
        }

        let gray = match load_gray(path, config.resize_to) {
            Ok(gray) => gray,
            Err(err) => {
                tracing::warn!("skipping {}: {}", name, err);
                continue;
            }
        };

        let teeth = segment_teeth(&gray, &config.segment);
        if teeth.is_empty() {
            tracing::warn!("no usable teeth in {} (wear case {})", name, case);
            continue;
        }
        tracing::info!("{}: wear case {}, {} teeth", name, case, teeth.len());

        for (index, contour) in &teeth {
            if contour.len() < 3 {
                // Degenerate tooth: record the failure instead of aborting
                // the batch.
                records.push(MeasurementRecord {
                    wear_case: case,
                    tooth_number: Some(*index),
                    wear_depth_um: 0.0,
                    method: Method::Error.as_str().to_string(),
                });
                continue;
            }
            let features = healthy_teeth.get(index).map(|reference| {
                extract_features(reference, contour, config.target_um_per_px, &config.geometry)
            });
            let (depth, method) = resolver.resolve_tooth(case, *index, features.as_ref());
            records.push(MeasurementRecord {
                wear_case: case,
                tooth_number: Some(*index),
                wear_depth_um: depth,
                method: method.as_str().to_string(),
            });
        }
    }

    monotonic::enforce_per_tooth(&mut records);
    Ok(records)
}

fn analyze_tooth_one(
    images_dir: &Path,
    healthy: Option<&Path>,
    config: &AnalysisConfig,
) -> Result<Vec<MeasurementRecord>> {
    let images = list_images(images_dir)?;

    let healthy_path = healthy
        .map(Path::to_path_buf)
        .or_else(|| images.iter().find(|p| path_is_healthy(p)).cloned())
        .ok_or_else(|| WearError::MissingResource(images_dir.join("healthy image")))?;

    let healthy_gray = load_gray(&healthy_path, config.resize_to)?;
    let healthy_teeth = segment_teeth(&healthy_gray, &config.segment);
    let Some((_, healthy_tooth)) = healthy_teeth.first() else {
        tracing::warn!("no teeth found in healthy image {}", healthy_path.display());
        return Ok(Vec::new());
    };

    let mut worn: Vec<(i32, PathBuf)> = images
        .iter()
        .filter_map(|p| wear_series_number(p).map(|n| (n, p.clone())))
        .collect();
    worn.sort_by_key(|(n, _)| *n);

    let resolver = DepthResolver::new(config.tables.clone(), config.max_wear_um);
    let mut records = Vec::new();

    for (case, path) in worn {
        let gray = match load_gray(&path, config.resize_to) {
            Ok(gray) => gray,
            Err(err) => {
                tracing::warn!("skipping {}: {}", path.display(), err);
                continue;
            }
        };

        let worn_teeth = segment_teeth(&gray, &config.segment);
        if worn_teeth.is_empty() {
            tracing::warn!("no usable teeth in wear case {}", case);
            continue;
        }

        let Some((_, worn_tooth)) = match_tooth(healthy_tooth, &worn_teeth, &config.matching)
        else {
            tracing::warn!("no candidate matched the healthy tooth for wear case {}", case);
            continue;
        };

        let features = extract_features(
            healthy_tooth,
            worn_tooth,
            config.target_um_per_px,
            &config.geometry,
        );
        let (depth, method) = resolver.resolve(case, Some(&features));
        tracing::info!("wear case {}: {:.1} µm ({})", case, depth, method);
        records.push(MeasurementRecord {
            wear_case: case,
            tooth_number: None,
            wear_depth_um: depth,
            method: method.as_str().to_string(),
        });
    }

    monotonic::enforce_single_tooth(&mut records, config.max_wear_um);
    Ok(records)
}

/// Segment the healthy reference image into an index → contour map.
/// Missing or unreadable references degrade to "no features available".
fn healthy_reference_teeth(
    path: Option<&Path>,
    config: &AnalysisConfig,
) -> BTreeMap<u32, ToothContour> {
    let Some(path) = path else {
        return BTreeMap::new();
    };
    match load_gray(path, config.resize_to) {
        Ok(gray) => segment_teeth(&gray, &config.segment).into_iter().collect(),
        Err(err) => {
            tracing::warn!("healthy reference unavailable: {}", err);
            BTreeMap::new()
        }
    }
}

fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(WearError::MissingResource(dir.to_path_buf()));
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if is_image {
            files.push(path);
        }
    }
    files.sort_by_key(|p| {
        let name = file_name(p);
        (wear_case_from_name(&name, UNNUMBERED_SORT_CASE), name)
    });
    Ok(files)
}

fn load_gray(path: &Path, resize_to: Option<u32>) -> Result<GrayImage> {
    let img = image::open(path).map_err(|source| WearError::ImageLoad {
        path: path.to_path_buf(),
        source,
    })?;
    let gray = img.to_luma8();
    Ok(match resize_to {
        Some(side) => image::imageops::resize(&gray, side, side, FilterType::Triangle),
        None => gray,
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn path_is_healthy(path: &Path) -> bool {
    is_healthy_name(&file_name(path))
}
