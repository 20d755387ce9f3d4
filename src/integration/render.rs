//! Overlay drawing for tracking output.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect as DrawRect;

use crate::tracker::{MotionHistory, Point, TrackingResult};

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const CENTER_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const PREDICTION_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
const TRAIL_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
const DOT_RADIUS: i32 = 4;

/// Draw box, center, prediction and the history trail onto `frame`.
pub fn draw_tracking(frame: &mut RgbImage, result: &TrackingResult, history: &MotionHistory) {
    let trail: Vec<Point> = history.trail().collect();
    for pair in trail.windows(2) {
        draw_segment(frame, pair[0], pair[1], TRAIL_COLOR);
    }

    if let Some(bbox) = result.bbox {
        let w = bbox.width.round().max(1.0) as u32;
        let h = bbox.height.round().max(1.0) as u32;
        let rect = DrawRect::at(bbox.x.round() as i32, bbox.y.round() as i32).of_size(w, h);
        draw_hollow_rect_mut(frame, rect, BOX_COLOR);
        // second pass for a 2 px outline
        if w > 2 && h > 2 {
            let inner = DrawRect::at(rect.left() + 1, rect.top() + 1).of_size(w - 2, h - 2);
            draw_hollow_rect_mut(frame, inner, BOX_COLOR);
        }
    }

    if let (Some(center), Some(prediction)) = (result.center, result.prediction) {
        draw_segment(frame, center, prediction, PREDICTION_COLOR);
    }
    if let Some(prediction) = result.prediction {
        draw_dot(frame, prediction, PREDICTION_COLOR);
    }
    if let Some(center) = result.center {
        draw_dot(frame, center, CENTER_COLOR);
    }
}

fn draw_segment(frame: &mut RgbImage, from: Point, to: Point, color: Rgb<u8>) {
    draw_line_segment_mut(frame, (from.x, from.y), (to.x, to.y), color);
}

fn draw_dot(frame: &mut RgbImage, at: Point, color: Rgb<u8>) {
    let p = at.round();
    draw_filled_circle_mut(frame, (p.x as i32, p.y as i32), DOT_RADIUS, color);
}
