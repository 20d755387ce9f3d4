//! Short-term visual tracking between detector runs.

use image::imageops;
use image::{GrayImage, RgbImage};

use crate::tracker::config::ShortTermConfig;
use crate::tracker::rect::Rect;

/// Re-seedable single-object box tracker.
pub trait ShortTermTracker: Send {
    /// Seed on `bbox` in `frame`. Returns false if the box holds no pixels.
    fn init(&mut self, frame: &RgbImage, bbox: Rect) -> bool;

    /// Follow the object into `frame`; `None` means the lock is lost.
    fn update(&mut self, frame: &RgbImage) -> Option<Rect>;
}

/// Template matching tracker.
///
/// Captures a grayscale patch at seeding and searches a square window around
/// the last position for the offset with the smallest sum of squared
/// differences. Similarity is `1 - rms / 255`; below `min_similarity` the
/// lock is dropped.
#[derive(Debug, Clone)]
pub struct TemplateTracker {
    template: Option<GrayImage>,
    position: (u32, u32),
    search_radius: u32,
    min_similarity: f32,
    last_similarity: f32,
}

impl TemplateTracker {
    pub fn new(config: ShortTermConfig) -> Self {
        Self {
            template: None,
            position: (0, 0),
            search_radius: config.search_radius,
            min_similarity: config.min_similarity,
            last_similarity: 0.0,
        }
    }

    /// Similarity of the most recent match.
    pub fn last_similarity(&self) -> f32 {
        self.last_similarity
    }

    pub fn is_seeded(&self) -> bool {
        self.template.is_some()
    }

    fn find_best_match(&self, frame: &GrayImage, template: &GrayImage) -> Option<((u32, u32), f32)> {
        let (tw, th) = template.dimensions();
        if tw > frame.width() || th > frame.height() {
            return None;
        }

        let (last_x, last_y) = self.position;
        let min_x = last_x.saturating_sub(self.search_radius);
        let max_x = (last_x + self.search_radius).min(frame.width() - tw);
        let min_y = last_y.saturating_sub(self.search_radius);
        let max_y = (last_y + self.search_radius).min(frame.height() - th);

        let mut best: Option<((u32, u32), u64)> = None;
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let ssd = sum_squared_difference(frame, template, x, y);
                if best.is_none_or(|(_, best_ssd)| ssd < best_ssd) {
                    best = Some(((x, y), ssd));
                }
            }
        }

        let (pos, ssd) = best?;
        let rms = (ssd as f64 / (tw as f64 * th as f64)).sqrt();
        Some((pos, (1.0 - rms / 255.0) as f32))
    }
}

impl ShortTermTracker for TemplateTracker {
    fn init(&mut self, frame: &RgbImage, bbox: Rect) -> bool {
        let clamped = bbox.clamp_to(frame.width(), frame.height());
        let x = clamped.x.round() as u32;
        let y = clamped.y.round() as u32;
        let w = (clamped.width.round() as u32).min(frame.width().saturating_sub(x));
        let h = (clamped.height.round() as u32).min(frame.height().saturating_sub(y));
        if w == 0 || h == 0 {
            self.template = None;
            return false;
        }

        let gray = imageops::grayscale(frame);
        self.template = Some(imageops::crop_imm(&gray, x, y, w, h).to_image());
        self.position = (x, y);
        self.last_similarity = 1.0;
        true
    }

    fn update(&mut self, frame: &RgbImage) -> Option<Rect> {
        let template = self.template.as_ref()?;
        let gray = imageops::grayscale(frame);

        let Some(((x, y), similarity)) = self.find_best_match(&gray, template) else {
            self.template = None;
            return None;
        };
        self.last_similarity = similarity;

        if similarity < self.min_similarity {
            tracing::debug!(similarity, "template match below threshold");
            self.template = None;
            return None;
        }

        let (tw, th) = template.dimensions();
        self.position = (x, y);
        Some(Rect::new(x as f32, y as f32, tw as f32, th as f32))
    }
}

fn sum_squared_difference(frame: &GrayImage, template: &GrayImage, x: u32, y: u32) -> u64 {
    let mut ssd = 0u64;
    for (tx, ty, t) in template.enumerate_pixels() {
        let f = frame.get_pixel(x + tx, y + ty)[0] as i64;
        let d = f - t[0] as i64;
        ssd += (d * d) as u64;
    }
    ssd
}
