//! Per-frame candidate regions and their shape attributes.

use std::f64::consts::PI;

use imageproc::contours::Contour;
use imageproc::geometry::arc_length;
use imageproc::point::Point as ContourPoint;

use crate::tracker::rect::{Point, Rect};

/// Shape attributes of a closed contour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContourShape {
    /// Enclosed polygon area.
    pub area: f64,
    /// Closed arc length.
    pub perimeter: f64,
    /// Area-weighted centroid; `None` for a degenerate (zero-area) contour.
    pub centroid: Option<Point>,
}

impl ContourShape {
    /// Measure a closed polygon given as an ordered vertex list.
    pub fn from_points(points: &[ContourPoint<f64>]) -> Self {
        let (area, centroid) = polygon_moments(points);
        let perimeter = if points.len() > 1 {
            arc_length(points, true)
        } else {
            0.0
        };
        Self {
            area,
            perimeter,
            centroid,
        }
    }

    /// 4π·area / perimeter², 1.0 for a perfect circle; 0 when the perimeter is 0.
    pub fn circularity(&self) -> f64 {
        if self.perimeter > 0.0 {
            4.0 * PI * self.area / (self.perimeter * self.perimeter)
        } else {
            0.0
        }
    }
}

/// Where a candidate came from and what the selector judges it by.
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateKind {
    /// Segmented region from the heuristic detector.
    Contour(ContourShape),
    /// Detection reported by a learned model.
    Model { class_id: usize, confidence: f32 },
}

/// A region proposed as possibly being the puck in one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Axis-aligned bounding box in pixels.
    pub bbox: Rect,
    pub kind: CandidateKind,
}

impl Candidate {
    /// Build a candidate from a contour traced in a binary mask.
    pub fn from_contour(contour: &Contour<i32>) -> Option<Self> {
        let points: Vec<ContourPoint<f64>> = contour
            .points
            .iter()
            .map(|p| ContourPoint::new(p.x as f64, p.y as f64))
            .collect();
        Self::from_polygon(&points)
    }

    /// Build a candidate from an arbitrary closed polygon.
    pub fn from_polygon(points: &[ContourPoint<f64>]) -> Option<Self> {
        let bbox = bounding_rect(points)?;
        Some(Self {
            bbox,
            kind: CandidateKind::Contour(ContourShape::from_points(points)),
        })
    }

    pub fn from_model(bbox: Rect, class_id: usize, confidence: f32) -> Self {
        Self {
            bbox,
            kind: CandidateKind::Model {
                class_id,
                confidence,
            },
        }
    }

    /// Bounding-box width over height.
    pub fn aspect_ratio(&self) -> f64 {
        self.bbox.aspect_ratio() as f64
    }

    pub fn shape(&self) -> Option<&ContourShape> {
        match &self.kind {
            CandidateKind::Contour(shape) => Some(shape),
            CandidateKind::Model { .. } => None,
        }
    }

    pub fn confidence(&self) -> Option<f32> {
        match self.kind {
            CandidateKind::Model { confidence, .. } => Some(confidence),
            CandidateKind::Contour(_) => None,
        }
    }

    /// Contour centroid for segmented candidates, box center for model ones.
    pub fn centroid(&self) -> Option<Point> {
        match &self.kind {
            CandidateKind::Contour(shape) => shape.centroid,
            CandidateKind::Model { .. } => Some(self.bbox.center()),
        }
    }
}

/// Pixel-inclusive bounding box: a contour spanning columns 3..=7 is 5 wide.
fn bounding_rect(points: &[ContourPoint<f64>]) -> Option<Rect> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &points[1..] {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    let (x, y) = (min_x.floor(), min_y.floor());
    Some(Rect::new(
        x as f32,
        y as f32,
        (max_x.floor() - x + 1.0) as f32,
        (max_y.floor() - y + 1.0) as f32,
    ))
}

/// Shoelace area and centroid of a closed polygon.
fn polygon_moments(points: &[ContourPoint<f64>]) -> (f64, Option<Point>) {
    let n = points.len();
    if n < 3 {
        return (0.0, None);
    }

    let (mut a2, mut cx, mut cy) = (0.0, 0.0, 0.0);
    for i in 0..n {
        let p = points[i];
        let q = points[(i + 1) % n];
        let cross = p.x * q.y - q.x * p.y;
        a2 += cross;
        cx += (p.x + q.x) * cross;
        cy += (p.y + q.y) * cross;
    }

    let area = a2.abs() / 2.0;
    if a2.abs() < f64::EPSILON {
        return (0.0, None);
    }
    let centroid = Point::new((cx / (3.0 * a2)) as f32, (cy / (3.0 * a2)) as f32);
    (area, Some(centroid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn circle(cx: f64, cy: f64, r: f64, n: usize) -> Vec<ContourPoint<f64>> {
        (0..n)
            .map(|i| {
                let t = 2.0 * PI * i as f64 / n as f64;
                ContourPoint::new(cx + r * t.cos(), cy + r * t.sin())
            })
            .collect()
    }

    fn rectangle(x: f64, y: f64, w: f64, h: f64) -> Vec<ContourPoint<f64>> {
        vec![
            ContourPoint::new(x, y),
            ContourPoint::new(x + w, y),
            ContourPoint::new(x + w, y + h),
            ContourPoint::new(x, y + h),
        ]
    }

    #[test]
    fn test_circle_is_circular() {
        let shape = ContourShape::from_points(&circle(200.0, 150.0, 100.0, 720));
        assert_abs_diff_eq!(shape.area, PI * 100.0 * 100.0, epsilon = 10.0);
        assert_abs_diff_eq!(shape.perimeter, 2.0 * PI * 100.0, epsilon = 0.1);
        assert_abs_diff_eq!(shape.circularity(), 1.0, epsilon = 1e-3);

        let c = shape.centroid.unwrap();
        assert_abs_diff_eq!(c.x, 200.0, epsilon = 1e-3);
        assert_abs_diff_eq!(c.y, 150.0, epsilon = 1e-3);
    }

    #[test]
    fn test_thin_rectangle_is_not_circular() {
        let shape = ContourShape::from_points(&rectangle(0.0, 0.0, 100.0, 4.0));
        assert_abs_diff_eq!(shape.area, 400.0, epsilon = 1e-9);
        assert_abs_diff_eq!(shape.perimeter, 208.0, epsilon = 1e-9);
        assert!(shape.circularity() < 0.2);
    }

    #[test]
    fn test_orientation_does_not_change_area() {
        let mut pts = rectangle(10.0, 10.0, 20.0, 10.0);
        let forward = ContourShape::from_points(&pts);
        pts.reverse();
        let backward = ContourShape::from_points(&pts);
        assert_eq!(forward.area, backward.area);
        assert_eq!(forward.centroid, backward.centroid);
    }

    #[test]
    fn test_degenerate_contour() {
        let shape = ContourShape::from_points(&[ContourPoint::new(5.0, 5.0)]);
        assert_eq!(shape.area, 0.0);
        assert_eq!(shape.perimeter, 0.0);
        assert_eq!(shape.circularity(), 0.0);
        assert!(shape.centroid.is_none());
    }

    #[test]
    fn test_bounding_rect_is_pixel_inclusive() {
        let candidate = Candidate::from_polygon(&rectangle(3.0, 4.0, 4.0, 9.0)).unwrap();
        assert_eq!(candidate.bbox, Rect::new(3.0, 4.0, 5.0, 10.0));
        assert_abs_diff_eq!(candidate.aspect_ratio(), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_empty_polygon_is_rejected() {
        assert!(Candidate::from_polygon(&[]).is_none());
    }

    #[test]
    fn test_model_candidate() {
        let c = Candidate::from_model(Rect::new(0.0, 0.0, 10.0, 20.0), 0, 0.9);
        assert_eq!(c.confidence(), Some(0.9));
        assert_eq!(c.centroid(), Some(Point::new(5.0, 10.0)));
        assert!(c.shape().is_none());
    }
}
