//! Builder for creating RawDetection objects from various box formats.

use crate::integration::detector::RawDetection;
use crate::tracker::Rect;

/// Builder for creating `RawDetection` objects from various input formats.
///
/// Model decoders emit boxes in whatever layout the network was trained
/// with, often in model-input coordinates; `scale` maps them back onto the
/// frame.
#[derive(Debug, Clone)]
pub struct DetectionBuilder {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    score: f32,
    class_id: usize,
    scale_x: f32,
    scale_y: f32,
}

impl Default for DetectionBuilder {
    fn default() -> Self {
        Self {
            x1: 0.0,
            y1: 0.0,
            x2: 0.0,
            y2: 0.0,
            score: 0.0,
            class_id: 0,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }
}

impl DetectionBuilder {
    /// Create a new detection builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set bounding box in TLBR format (x1, y1, x2, y2).
    pub fn tlbr(mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        self.x1 = x1;
        self.y1 = y1;
        self.x2 = x2;
        self.y2 = y2;
        self
    }

    /// Set bounding box in XYWH format (center_x, center_y, width, height).
    pub fn xywh(mut self, cx: f32, cy: f32, w: f32, h: f32) -> Self {
        self.x1 = cx - w / 2.0;
        self.y1 = cy - h / 2.0;
        self.x2 = cx + w / 2.0;
        self.y2 = cy + h / 2.0;
        self
    }

    /// Set bounding box in TLWH format (left, top, width, height).
    pub fn tlwh(mut self, l: f32, t: f32, w: f32, h: f32) -> Self {
        self.x1 = l;
        self.y1 = t;
        self.x2 = l + w;
        self.y2 = t + h;
        self
    }

    /// Multiply coordinates by these factors when building.
    pub fn scale(mut self, sx: f32, sy: f32) -> Self {
        self.scale_x = sx;
        self.scale_y = sy;
        self
    }

    /// Set the confidence score.
    pub fn score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    pub fn class_id(mut self, class_id: usize) -> Self {
        self.class_id = class_id;
        self
    }

    /// Build the final `RawDetection`.
    pub fn build(self) -> RawDetection {
        let bbox = Rect::from_tlbr(
            self.x1 * self.scale_x,
            self.y1 * self.scale_y,
            self.x2 * self.scale_x,
            self.y2 * self.scale_y,
        );
        RawDetection::new(bbox, self.class_id, self.score)
    }
}
