//! Candidate scoring and winner selection.

use crate::tracker::candidate::{Candidate, CandidateKind, ContourShape};
use crate::tracker::config::TrackerConfig;
use crate::tracker::rect::{Point, Rect};

/// The candidate chosen for a frame, reduced to a box and a center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    /// Bounding box (use `to_tlbr` for x1, y1, x2, y2)
    pub bbox: Rect,
    /// Box center on the pixel grid
    pub center: Point,
    /// Composite shape score or model confidence
    pub score: f32,
}

impl Detection {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, score: f32) -> Self {
        Self::from_rect(Rect::from_tlbr(x1, y1, x2, y2), score)
    }

    pub fn from_rect(bbox: Rect, score: f32) -> Self {
        Self {
            bbox,
            center: bbox.pixel_center(),
            score,
        }
    }
}

/// Why a contour candidate was turned down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Area,
    Circularity,
    AspectRatio,
}

/// Shape filters and the composite score for contour candidates.
#[derive(Debug, Clone)]
pub struct CandidateSelector {
    min_area: f64,
    max_area: f64,
    min_circularity: f64,
    max_aspect_deviation: f64,
    velocity_scale: f64,
    min_score: f64,
}

impl Default for CandidateSelector {
    fn default() -> Self {
        Self::new(&TrackerConfig::default())
    }
}

impl CandidateSelector {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            min_area: config.min_area,
            max_area: config.max_area,
            min_circularity: config.min_circularity,
            max_aspect_deviation: config.max_aspect_deviation,
            velocity_scale: config.velocity_scale,
            min_score: config.min_score,
        }
    }

    /// Apply the area, circularity and squareness filters in that order.
    pub fn check(&self, shape: &ContourShape, aspect_ratio: f64) -> Result<(), Rejection> {
        if shape.area < self.min_area || shape.area > self.max_area {
            return Err(Rejection::Area);
        }
        if shape.circularity() < self.min_circularity {
            return Err(Rejection::Circularity);
        }
        if (1.0 - aspect_ratio).abs() > self.max_aspect_deviation {
            return Err(Rejection::AspectRatio);
        }
        Ok(())
    }

    /// `exp(-distance / scale)` from the previous frame's point, 1 without one.
    pub fn velocity_score(&self, centroid: Option<Point>, last_point: Option<Point>) -> f64 {
        match (centroid, last_point) {
            (Some(c), Some(last)) => (-(c.distance(&last) as f64) / self.velocity_scale).exp(),
            _ => 1.0,
        }
    }

    /// Composite score of a contour candidate, or `None` if a filter rejects it.
    pub fn score(&self, candidate: &Candidate, last_point: Option<Point>) -> Option<f64> {
        let shape = candidate.shape()?;
        let aspect_ratio = candidate.aspect_ratio();
        self.check(shape, aspect_ratio).ok()?;

        let velocity_score = self.velocity_score(shape.centroid, last_point);
        Some(shape.circularity() * velocity_score * (1.0 - (1.0 - aspect_ratio).abs()))
    }

    /// Pick at most one detection among the frame's candidates.
    ///
    /// Contour candidates compete on composite score, which must exceed the
    /// configured minimum. Model candidates compete on confidence alone; the
    /// model already filtered them by class and threshold. `last_point` is the
    /// previous frame's history entry.
    pub fn select(&self, candidates: &[Candidate], last_point: Option<Point>) -> Option<Detection> {
        let mut best_contour: Option<(f64, &Candidate)> = None;
        let mut best_model: Option<(f32, &Candidate)> = None;

        for candidate in candidates {
            match candidate.kind {
                CandidateKind::Contour(_) => {
                    let Some(score) = self.score(candidate, last_point) else {
                        continue;
                    };
                    tracing::trace!(?candidate.bbox, score, "contour candidate");
                    if best_contour.is_none_or(|(best, _)| score > best) {
                        best_contour = Some((score, candidate));
                    }
                }
                CandidateKind::Model { confidence, .. } => {
                    if best_model.is_none_or(|(best, _)| confidence > best) {
                        best_model = Some((confidence, candidate));
                    }
                }
            }
        }

        if let Some((confidence, candidate)) = best_model {
            return Some(Detection::from_rect(candidate.bbox, confidence));
        }

        match best_contour {
            Some((score, candidate)) if score > self.min_score => {
                Some(Detection::from_rect(candidate.bbox, score as f32))
            }
            Some((score, _)) => {
                tracing::debug!(score, min_score = self.min_score, "best candidate below threshold");
                None
            }
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::point::Point as ContourPoint;
    use std::f64::consts::PI;

    /// Regular polygon approximating a disk of the given area.
    fn disk(cx: f64, cy: f64, area: f64) -> Candidate {
        let r = (area / PI).sqrt();
        let points: Vec<ContourPoint<f64>> = (0..180)
            .map(|i| {
                let t = 2.0 * PI * i as f64 / 180.0;
                ContourPoint::new(cx + r * t.cos(), cy + r * t.sin())
            })
            .collect();
        Candidate::from_polygon(&points).unwrap()
    }

    fn rectangle(x: f64, y: f64, w: f64, h: f64) -> Candidate {
        Candidate::from_polygon(&[
            ContourPoint::new(x, y),
            ContourPoint::new(x + w, y),
            ContourPoint::new(x + w, y + h),
            ContourPoint::new(x, y + h),
        ])
        .unwrap()
    }

    #[test]
    fn test_thin_rectangle_rejected_regardless_of_area() {
        let selector = CandidateSelector::default();
        // 150 x 4 = 600, comfortably inside the area range
        let strip = rectangle(0.0, 0.0, 150.0, 4.0);
        let shape = strip.shape().unwrap();
        assert_eq!(
            selector.check(shape, strip.aspect_ratio()),
            Err(Rejection::Circularity)
        );
        assert!(selector.select(&[strip], None).is_none());
    }

    #[test]
    fn test_area_filter() {
        let selector = CandidateSelector::default();
        let small = disk(50.0, 50.0, 100.0);
        let large = disk(50.0, 50.0, 5000.0);
        assert_eq!(
            selector.check(small.shape().unwrap(), small.aspect_ratio()),
            Err(Rejection::Area)
        );
        assert_eq!(
            selector.check(large.shape().unwrap(), large.aspect_ratio()),
            Err(Rejection::Area)
        );
    }

    #[test]
    fn test_aspect_filter() {
        let selector = CandidateSelector::default();
        let shape = disk(50.0, 50.0, 600.0);
        assert_eq!(
            selector.check(shape.shape().unwrap(), 1.5),
            Err(Rejection::AspectRatio)
        );
    }

    #[test]
    fn test_accepts_puck_sized_disk() {
        let selector = CandidateSelector::default();
        let puck = disk(100.0, 100.0, 600.0);
        let detection = selector.select(&[puck], None).unwrap();
        assert!(detection.score > 0.7);
        assert!((detection.center.x - 100.0).abs() <= 1.0);
        assert!((detection.center.y - 100.0).abs() <= 1.0);
    }

    #[test]
    fn test_score_decreases_with_distance() {
        let selector = CandidateSelector::default();
        let last = Some(Point::new(100.0, 100.0));
        let near = disk(110.0, 100.0, 600.0);
        let far = disk(160.0, 100.0, 600.0);

        let near_score = selector.score(&near, last).unwrap();
        let far_score = selector.score(&far, last).unwrap();
        assert!(near_score > far_score);

        let picked = selector.select(&[far, near], last).unwrap();
        assert!((picked.center.x - 110.0).abs() <= 1.0);
    }

    #[test]
    fn test_velocity_score_without_history() {
        let selector = CandidateSelector::default();
        assert_eq!(selector.velocity_score(Some(Point::new(3.0, 4.0)), None), 1.0);
        let s = selector.velocity_score(Some(Point::new(50.0, 0.0)), Some(Point::new(0.0, 0.0)));
        assert!((s - (-1.0f64).exp()).abs() < 1e-9);
    }

    #[test]
    fn test_far_jump_falls_below_min_score() {
        let selector = CandidateSelector::default();
        let puck = disk(400.0, 100.0, 600.0);
        // 300 px from the last point: velocity score ~ e^-6
        assert!(selector.select(&[puck], Some(Point::new(100.0, 100.0))).is_none());
    }

    #[test]
    fn test_model_candidates_pick_highest_confidence() {
        let selector = CandidateSelector::default();
        let candidates = vec![
            Candidate::from_model(Rect::new(0.0, 0.0, 10.0, 10.0), 0, 0.4),
            Candidate::from_model(Rect::new(50.0, 50.0, 10.0, 10.0), 0, 0.9),
            Candidate::from_model(Rect::new(90.0, 90.0, 10.0, 10.0), 0, 0.6),
        ];
        let detection = selector.select(&candidates, None).unwrap();
        assert_eq!(detection.score, 0.9);
        assert_eq!(detection.center, Point::new(55.0, 55.0));
    }

    #[test]
    fn test_detection_from_tlbr() {
        let det = Detection::new(10.0, 20.0, 40.0, 60.0, 0.8);
        assert_eq!(det.bbox.to_tlwh(), [10.0, 20.0, 30.0, 40.0]);
        assert_eq!(det.center, Point::new(25.0, 40.0));
    }
}
