//! Tooth contour representation and shape metrics.
//!
//! A [`ToothContour`] is the boundary of one segmented tooth region in
//! image-pixel coordinates, immutable once extracted. All metrics are
//! computed from the polygon directly; the only rasterization happens in
//! [`ToothContour::fill_mask`], which the feature stage uses for
//! distance-transform and edge-density measurements.

use image::{GrayImage, Luma};
use imageproc::drawing::draw_polygon_mut;
use imageproc::geometry::{arc_length, convex_hull};
use imageproc::point::Point;

/// Axis-aligned bounding box of a contour, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    /// Width / height, guarded against zero height.
    pub fn aspect_ratio(&self) -> f64 {
        if self.height > 0 {
            self.width as f64 / self.height as f64
        } else {
            0.0
        }
    }
}

/// Ordered boundary of one segmented tooth region.
#[derive(Debug, Clone, PartialEq)]
pub struct ToothContour {
    points: Vec<Point<i32>>,
}

impl ToothContour {
    pub fn new(points: Vec<Point<i32>>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Point<i32>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Signed shoelace area; positive for counter-clockwise winding.
    fn signed_area(&self) -> f64 {
        if self.points.len() < 3 {
            return 0.0;
        }
        let n = self.points.len();
        let mut sum = 0.0;
        for i in 0..n {
            let p = self.points[i];
            let q = self.points[(i + 1) % n];
            sum += p.x as f64 * q.y as f64 - q.x as f64 * p.y as f64;
        }
        sum / 2.0
    }

    /// Enclosed area in px² (shoelace formula).
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Closed-boundary perimeter in pixels.
    pub fn perimeter(&self) -> f64 {
        if self.points.len() < 2 {
            return 0.0;
        }
        arc_length(&self.points, true)
    }

    /// Area-weighted centroid from the polygon moments, falling back to
    /// (0, 0) when the contour has zero mass (degenerate or collinear).
    pub fn centroid(&self) -> (f64, f64) {
        let a = self.signed_area();
        if a.abs() < f64::EPSILON {
            return (0.0, 0.0);
        }
        let n = self.points.len();
        let mut cx = 0.0;
        let mut cy = 0.0;
        for i in 0..n {
            let p = self.points[i];
            let q = self.points[(i + 1) % n];
            let cross = p.x as f64 * q.y as f64 - q.x as f64 * p.y as f64;
            cx += (p.x as f64 + q.x as f64) * cross;
            cy += (p.y as f64 + q.y as f64) * cross;
        }
        (cx / (6.0 * a), cy / (6.0 * a))
    }

    /// Euclidean distance between this contour's centroid and another's.
    pub fn centroid_distance(&self, other: &ToothContour) -> f64 {
        let (ax, ay) = self.centroid();
        let (bx, by) = other.centroid();
        ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt()
    }

    pub fn bounding_box(&self) -> BoundingBox {
        if self.points.is_empty() {
            return BoundingBox {
                x: 0,
                y: 0,
                width: 0,
                height: 0,
            };
        }
        let min_x = self.points.iter().map(|p| p.x).min().unwrap_or(0);
        let max_x = self.points.iter().map(|p| p.x).max().unwrap_or(0);
        let min_y = self.points.iter().map(|p| p.y).min().unwrap_or(0);
        let max_y = self.points.iter().map(|p| p.y).max().unwrap_or(0);
        BoundingBox {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        }
    }

    /// Convex hull of the boundary points, as a new contour.
    pub fn hull(&self) -> ToothContour {
        if self.points.len() < 3 {
            return self.clone();
        }
        ToothContour::new(convex_hull(self.points.clone()))
    }

    /// Area / hull-area, guarded against degenerate hulls.
    pub fn solidity(&self) -> f64 {
        self.area() / self.hull().area().max(1.0)
    }

    /// Rasterize the filled contour into a `width` × `height` binary mask
    /// (foreground 255). Points outside the mask are clamped to its border.
    pub fn fill_mask(&self, width: u32, height: u32) -> GrayImage {
        let mut mask = GrayImage::new(width, height);
        if self.points.len() < 3 {
            return mask;
        }
        let mut poly: Vec<Point<i32>> = self
            .points
            .iter()
            .map(|p| {
                Point::new(
                    p.x.clamp(0, width as i32 - 1),
                    p.y.clamp(0, height as i32 - 1),
                )
            })
            .collect();
        poly.dedup();
        // draw_polygon_mut requires an open vertex list
        if poly.len() > 1 && poly.first() == poly.last() {
            poly.pop();
        }
        if poly.len() >= 3 {
            draw_polygon_mut(&mut mask, &poly, Luma([255u8]));
        }
        mask
    }
}
