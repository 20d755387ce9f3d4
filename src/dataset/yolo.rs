use std::fmt;

use super::labels::LabelEntry;

/// One YOLO annotation line; coordinates are normalized to the image size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YoloAnnotation {
    pub class_id: usize,
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
}

impl fmt::Display for YoloAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.class_id, self.x_center, self.y_center, self.width, self.height
        )
    }
}

/// Annotations for an image of `width` x `height` pixels.
///
/// Only points are labeled, so every box gets the same size: `box_fraction`
/// of the image in each dimension. Invalid entries yield no annotations.
pub fn annotations_for(
    entry: &LabelEntry,
    width: u32,
    height: u32,
    box_fraction: f64,
    class_id: usize,
) -> Vec<YoloAnnotation> {
    if !entry.is_valid() || width == 0 || height == 0 {
        return Vec::new();
    }
    entry
        .points()
        .iter()
        .map(|p| YoloAnnotation {
            class_id,
            x_center: p.x / width as f64,
            y_center: p.y / height as f64,
            width: box_fraction,
            height: box_fraction,
        })
        .collect()
}
