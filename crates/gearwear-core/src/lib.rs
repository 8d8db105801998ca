//! gearwear-core — gear tooth wear depth estimation from photographs.
//!
//! Estimates wear depth (µm) of spur gear teeth by comparing a healthy
//! reference tooth against worn specimens across a sequence of wear cases.
//! The pipeline stages are:
//!
//! 1. **Segment** – denoise, multi-candidate binarization, contour
//!    filtering, angular ordering around the gear center, tooth indexing.
//! 2. **Match** – healthy ↔ worn correspondence via a weighted
//!    distance/area/perimeter similarity score.
//! 3. **Features** – shape-difference measurements (area, perimeter, hull,
//!    distance-transform, edge-density deltas) scaled to micrometers with a
//!    geometry-derived calibration factor.
//! 4. **Resolve** – features plus case/tooth identity → wear depth with a
//!    provenance tag, via override/lookup tables, an optional regression
//!    strategy, and a feature heuristic, clamped to physical bounds.
//! 5. **Monotonic** – post-hoc correction so wear never decreases with
//!    increasing wear case.
//! 6. **Table** – case-by-tooth pivot and the round-trippable CSV format.

pub mod contour;
pub mod error;
pub mod features;
pub mod geometry;
pub mod matching;
pub mod monotonic;
pub mod pipeline;
pub mod resolve;
pub mod segment;
pub mod stats;
pub mod table;
pub mod wear_case;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::{Result, WearError};
pub use geometry::{GearGeometry, MAX_THEORETICAL_WEAR_UM};
pub use pipeline::{analyze, AnalysisConfig, PipelineKind};
pub use table::WearTable;

/// One resolved wear-depth measurement.
///
/// `tooth_number` is absent for the single-tooth pipeline. The method tag
/// records provenance (override, table lookup, model, feature heuristic,
/// error fallback) and is suffixed when monotonicity enforcement adjusts
/// the value.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MeasurementRecord {
    pub wear_case: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooth_number: Option<u32>,
    pub wear_depth_um: f64,
    pub method: String,
}
