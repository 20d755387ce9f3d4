//! Color-segmentation candidate detector.

use image::{GrayImage, Luma, RgbImage};
use imageproc::contours::{BorderType, find_contours};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{close, open};

use crate::tracker::{Candidate, TrackerConfig};

const FOREGROUND: u8 = 255;

/// Proposes every dark blob in the frame as a candidate.
///
/// Pipeline: RGB -> HSV, inclusive range threshold, opening then closing with
/// a square structuring element, outer contours only.
#[derive(Debug, Clone)]
pub struct HeuristicDetector {
    hsv_lower: [u8; 3],
    hsv_upper: [u8; 3],
    /// Chessboard radius of the structuring element: 2 for a 5x5 square.
    kernel_radius: u8,
}

impl Default for HeuristicDetector {
    fn default() -> Self {
        Self::new(&TrackerConfig::default())
    }
}

impl HeuristicDetector {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            hsv_lower: config.hsv_lower,
            hsv_upper: config.hsv_upper,
            kernel_radius: config.morph_kernel_size / 2,
        }
    }

    /// Binary mask of in-range pixels after speckle removal.
    pub fn mask(&self, frame: &RgbImage) -> GrayImage {
        let raw = GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
            let hsv = rgb_to_hsv(frame.get_pixel(x, y).0);
            let inside = (0..3).all(|i| self.hsv_lower[i] <= hsv[i] && hsv[i] <= self.hsv_upper[i]);
            Luma([if inside { FOREGROUND } else { 0 }])
        });

        if self.kernel_radius == 0 {
            return raw;
        }
        let opened = open(&raw, Norm::LInf, self.kernel_radius);
        close(&opened, Norm::LInf, self.kernel_radius)
    }

    /// One candidate per outermost contour of the mask; empty when nothing matches.
    pub fn detect(&self, frame: &RgbImage) -> Vec<Candidate> {
        let mask = self.mask(frame);
        find_contours::<i32>(&mask)
            .iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .filter_map(Candidate::from_contour)
            .collect()
    }
}

/// 8-bit HSV with the hue halved into 0..=180.
pub fn rgb_to_hsv([r, g, b]: [u8; 3]) -> [u8; 3] {
    let (r, g, b) = (r as f32, g as f32, b as f32);
    let v = r.max(g).max(b);
    let diff = v - r.min(g).min(b);

    let s = if v > 0.0 { diff * 255.0 / v } else { 0.0 };
    let mut h = if diff == 0.0 {
        0.0
    } else if v == r {
        60.0 * (g - b) / diff
    } else if v == g {
        120.0 + 60.0 * (b - r) / diff
    } else {
        240.0 + 60.0 * (r - g) / diff
    };
    if h < 0.0 {
        h += 360.0;
    }

    [(h / 2.0).round() as u8, s.round() as u8, v as u8]
}
