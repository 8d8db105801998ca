//! Gear geometry constants used for scale estimation and plausibility bounds.
//!
//! All derived values follow the standard spur gear formulas: reference
//! diameter `d = z·m`, tip diameter `d + 2m`, root diameter `d - 2.5m`,
//! addendum `1.00m`, dedendum `1.25m`, tooth thickness `πm/2`.

/// Absolute upper bound on physically plausible wear depth (µm).
///
/// Wear beyond this would mean the tooth is gone; every resolved depth is
/// clamped against it.
pub const MAX_THEORETICAL_WEAR_UM: f64 = 1500.0;

/// Immutable gear geometry, computed once from the base constants and passed
/// by reference into every component that needs a pixel-to-physical scale.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct GearGeometry {
    /// Gear module in millimeters.
    pub module_mm: f64,
    /// Number of teeth.
    pub tooth_count: u32,
    /// Pressure angle in degrees.
    pub pressure_angle_deg: f64,
    /// Reference diameter `z·m` (mm).
    pub reference_diameter_mm: f64,
    /// Tip diameter `d + 2m` (mm).
    pub tip_diameter_mm: f64,
    /// Root diameter `d - 2.5m` (mm).
    pub root_diameter_mm: f64,
    /// Addendum `1.00m` (mm).
    pub addendum_mm: f64,
    /// Dedendum `1.25m` (mm).
    pub dedendum_mm: f64,
    /// Tooth thickness at the pitch circle `πm/2` (mm).
    pub tooth_thickness_mm: f64,
    /// Total tooth height, addendum + dedendum (mm).
    pub tooth_height_mm: f64,
    /// Circular pitch `πm` (mm).
    pub circular_pitch_mm: f64,
    /// Base circle diameter `d·cos(α)` (mm).
    pub base_diameter_mm: f64,
}

impl GearGeometry {
    /// Derive the full geometry from the three base constants.
    pub fn new(module_mm: f64, tooth_count: u32, pressure_angle_deg: f64) -> Self {
        let reference_diameter_mm = tooth_count as f64 * module_mm;
        let addendum_mm = 1.00 * module_mm;
        let dedendum_mm = 1.25 * module_mm;
        Self {
            module_mm,
            tooth_count,
            pressure_angle_deg,
            reference_diameter_mm,
            tip_diameter_mm: reference_diameter_mm + 2.0 * module_mm,
            root_diameter_mm: reference_diameter_mm - 2.5 * module_mm,
            addendum_mm,
            dedendum_mm,
            tooth_thickness_mm: std::f64::consts::PI * module_mm / 2.0,
            tooth_height_mm: addendum_mm + dedendum_mm,
            circular_pitch_mm: std::f64::consts::PI * module_mm,
            base_diameter_mm: reference_diameter_mm * pressure_angle_deg.to_radians().cos(),
        }
    }

    /// Expected cross-section of one healthy tooth (mm²), tooth thickness
    /// times tooth height. This is the physical area the healthy contour's
    /// pixel area is calibrated against.
    pub fn tooth_cross_section_mm2(&self) -> f64 {
        self.tooth_thickness_mm * self.tooth_height_mm
    }
}

impl Default for GearGeometry {
    /// The 3 mm module, 35-tooth, 20° spur gear the specimens were cut from.
    fn default() -> Self {
        Self::new(3.0, 35, 20.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn derived_values_follow_standard_formulas() {
        let g = GearGeometry::default();
        assert_relative_eq!(g.reference_diameter_mm, 105.0, epsilon = 1e-9);
        assert_relative_eq!(g.tip_diameter_mm, 111.0, epsilon = 1e-9);
        assert_relative_eq!(g.root_diameter_mm, 97.5, epsilon = 1e-9);
        assert_relative_eq!(g.addendum_mm, 3.0, epsilon = 1e-9);
        assert_relative_eq!(g.dedendum_mm, 3.75, epsilon = 1e-9);
        assert_relative_eq!(g.tooth_height_mm, 6.75, epsilon = 1e-9);
        assert_relative_eq!(
            g.tooth_thickness_mm,
            std::f64::consts::PI * 1.5,
            epsilon = 1e-9
        );
    }

    #[test]
    fn cross_section_is_thickness_times_height() {
        let g = GearGeometry::new(2.0, 20, 20.0);
        assert_relative_eq!(
            g.tooth_cross_section_mm2(),
            g.tooth_thickness_mm * g.tooth_height_mm,
            epsilon = 1e-12
        );
    }
}
