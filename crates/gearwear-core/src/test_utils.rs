//! Shared test utilities for image-based unit tests.

use image::{GrayImage, Luma};

/// Render a synthetic gear silhouette: `n_teeth` filled circular blobs of
/// radius `tooth_radius`, evenly spaced on a ring of radius `ring_radius`
/// around the image center, drawn in `tooth_pix` on a `bg_pix` background.
pub(crate) fn draw_gear_image(
    w: u32,
    h: u32,
    n_teeth: u32,
    ring_radius: f32,
    tooth_radius: f32,
    tooth_pix: u8,
    bg_pix: u8,
) -> GrayImage {
    let cx = (w / 2) as f32;
    let cy = (h / 2) as f32;
    let centers: Vec<(f32, f32)> = (0..n_teeth)
        .map(|i| {
            let theta = i as f32 * std::f32::consts::TAU / n_teeth as f32;
            (cx + ring_radius * theta.cos(), cy + ring_radius * theta.sin())
        })
        .collect();

    let mut img = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let inside = centers.iter().any(|&(bx, by)| {
                let dx = x as f32 - bx;
                let dy = y as f32 - by;
                dx * dx + dy * dy <= tooth_radius * tooth_radius
            });
            let pix = if inside { tooth_pix } else { bg_pix };
            img.put_pixel(x, y, Luma([pix]));
        }
    }
    img
}
