//! Connected-region extraction from binary masks.

use image::GrayImage;
use imageproc::contours::{BorderType, Contour, find_contours};

use crate::tracking::Rect;

/// Extract the bounding rectangle of every outer connected region in a
/// binary mask. Zero pixels are background, anything else is foreground.
pub fn find_regions(mask: &GrayImage) -> Vec<Rect> {
    find_contours::<i32>(mask)
        .iter()
        .filter(|c| c.border_type == BorderType::Outer)
        .filter_map(bounding_rect)
        .collect()
}

/// Number of foreground pixels in a binary mask.
pub fn foreground_area(mask: &GrayImage) -> u64 {
    mask.pixels().filter(|p| p.0[0] != 0).count() as u64
}

fn bounding_rect(contour: &Contour<i32>) -> Option<Rect> {
    let first = contour.points.first()?;
    let (mut min_x, mut min_y) = (first.x, first.y);
    let (mut max_x, mut max_y) = (first.x, first.y);
    for p in &contour.points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some(Rect::new(
        min_x as f32,
        min_y as f32,
        (max_x - min_x + 1) as f32,
        (max_y - min_y + 1) as f32,
    ))
}
