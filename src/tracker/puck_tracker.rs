//! Per-frame tracking controller.

use image::RgbImage;

use crate::error::Result;
use crate::integration::CandidateDetector;
use crate::tracker::config::TrackerConfig;
use crate::tracker::estimator::{StateEstimator, build_estimator};
use crate::tracker::history::MotionHistory;
use crate::tracker::rect::{Point, Rect};
use crate::tracker::selector::{CandidateSelector, Detection};
use crate::tracker::track_state::TrackState;
use crate::tracker::visual_tracker::{ShortTermTracker, TemplateTracker};

/// What the tracker reports for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrackingResult {
    /// Box of the puck in this frame
    pub bbox: Option<Rect>,
    /// Center of the puck in this frame
    pub center: Option<Point>,
    /// Where the puck is expected on the next frame
    pub prediction: Option<Point>,
}

impl TrackingResult {
    pub fn is_detected(&self) -> bool {
        self.bbox.is_some()
    }
}

/// Single-puck tracker.
///
/// Owns its motion history and estimator state; one instance per video
/// stream. With a short-term tracker it alternates between SEARCHING (run the
/// candidate detector) and LOCKED (follow the last detection visually);
/// without one it re-detects on every frame.
pub struct PuckTracker {
    detector: CandidateDetector,
    selector: CandidateSelector,
    history: MotionHistory,
    estimator: Box<dyn StateEstimator>,
    short_term: Option<Box<dyn ShortTermTracker>>,
    state: TrackState,
    frame_id: u64,
}

impl PuckTracker {
    /// Build a tracker from a configuration.
    ///
    /// Loads the detector model when `model_path` is set; a model that fails
    /// to load is reported here, before any frame is processed.
    pub fn new(config: TrackerConfig) -> Result<Self> {
        config.validate()?;
        let detector = CandidateDetector::from_config(&config)?;
        Self::with_detector(config, detector)
    }

    /// Build a tracker around an already constructed detector.
    ///
    /// The configuration is validated here too; `model_path` is ignored.
    pub fn with_detector(config: TrackerConfig, detector: CandidateDetector) -> Result<Self> {
        config.validate()?;
        let short_term = config
            .short_term_tracker
            .map(|st| Box::new(TemplateTracker::new(st)) as Box<dyn ShortTermTracker>);
        Ok(Self {
            detector,
            selector: CandidateSelector::new(&config),
            history: MotionHistory::new(config.history_capacity),
            estimator: build_estimator(&config),
            short_term,
            state: TrackState::Searching,
            frame_id: 0,
        })
    }

    /// Replace the estimator chosen by the configuration.
    pub fn with_estimator(mut self, estimator: Box<dyn StateEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    /// Replace (or remove) the short-term tracker chosen by the configuration.
    pub fn with_short_term_tracker(mut self, tracker: Option<Box<dyn ShortTermTracker>>) -> Self {
        self.short_term = tracker;
        self
    }

    /// Process one frame.
    pub fn update(&mut self, frame: &RgbImage) -> TrackingResult {
        self.frame_id += 1;

        if self.state == TrackState::Locked {
            if let Some(result) = self.follow(frame) {
                return result;
            }
            tracing::info!(frame = self.frame_id, "lock lost, searching");
            self.state = TrackState::Searching;
            self.history.push(None);
            return TrackingResult {
                prediction: self.estimator.predict_only(&self.history),
                ..TrackingResult::default()
            };
        }

        let last_point = self.history.last_point();
        let candidates = self.detector.detect(frame);
        let detection = self.selector.select(&candidates, last_point);
        tracing::debug!(
            frame = self.frame_id,
            candidates = candidates.len(),
            detected = detection.is_some(),
            "searched frame"
        );

        match detection {
            Some(detection) => {
                self.try_lock(frame, &detection);
                self.emit(detection)
            }
            None => {
                self.history.push(None);
                TrackingResult {
                    prediction: self.estimator.predict_only(&self.history),
                    ..TrackingResult::default()
                }
            }
        }
    }

    /// LOCKED step: `None` when the short-term tracker lost the puck.
    fn follow(&mut self, frame: &RgbImage) -> Option<TrackingResult> {
        let bbox = self.short_term.as_mut()?.update(frame)?;
        Some(self.emit(Detection::from_rect(bbox, 1.0)))
    }

    fn try_lock(&mut self, frame: &RgbImage, detection: &Detection) {
        if let Some(short_term) = self.short_term.as_mut() {
            if short_term.init(frame, detection.bbox) {
                tracing::info!(frame = self.frame_id, bbox = ?detection.bbox, "locked");
                self.state = TrackState::Locked;
            }
        }
    }

    fn emit(&mut self, detection: Detection) -> TrackingResult {
        self.history.push(Some(detection.center));
        let prediction = self.estimator.update(detection.center, &self.history);
        TrackingResult {
            bbox: Some(detection.bbox),
            center: Some(detection.center),
            prediction,
        }
    }

    pub fn history(&self) -> &MotionHistory {
        &self.history
    }

    pub fn state(&self) -> TrackState {
        self.state
    }

    /// Number of frames processed so far.
    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    pub fn detector(&self) -> &CandidateDetector {
        &self.detector
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::{DetectionModel, LearnedModelDetector, RawDetection};
    use crate::tracker::config::{EstimatorKind, ShortTermConfig};
    use image::Rgb;
    use imageproc::drawing::draw_filled_circle_mut;

    fn frame_with_puck(center: Option<(i32, i32)>) -> RgbImage {
        let mut frame = RgbImage::from_pixel(320, 160, Rgb([235, 235, 235]));
        if let Some(c) = center {
            draw_filled_circle_mut(&mut frame, c, 14, Rgb([5, 5, 5]));
        }
        frame
    }

    /// Replays a fixed list of per-frame detections.
    struct Scripted {
        frames: std::vec::IntoIter<Vec<RawDetection>>,
    }

    impl DetectionModel for Scripted {
        fn infer(&mut self, _frame: &RgbImage) -> Result<Vec<RawDetection>> {
            Ok(self.frames.next().unwrap_or_default())
        }
    }

    fn scripted(frames: Vec<Vec<RawDetection>>) -> CandidateDetector {
        CandidateDetector::LearnedModel(LearnedModelDetector::new(
            Box::new(Scripted {
                frames: frames.into_iter(),
            }),
            0,
            0.25,
        ))
    }

    fn puck_at(x: f32) -> Vec<RawDetection> {
        vec![RawDetection::new(Rect::new(x, 40.0, 20.0, 20.0), 0, 0.9)]
    }

    #[test]
    fn test_no_detection_yields_nothing() {
        let mut tracker = PuckTracker::new(TrackerConfig::default()).unwrap();
        let result = tracker.update(&frame_with_puck(None));
        assert_eq!(result, TrackingResult::default());
        assert_eq!(tracker.history().last(), Some(None));
    }

    #[test]
    fn test_heuristic_detection() {
        let mut tracker = PuckTracker::new(TrackerConfig::default()).unwrap();
        let result = tracker.update(&frame_with_puck(Some((100, 80))));
        let center = result.center.unwrap();
        assert!((center.x - 100.0).abs() <= 1.0);
        assert!((center.y - 80.0).abs() <= 1.0);
        assert!(result.prediction.is_none());
        assert_eq!(tracker.state(), TrackState::Searching);
    }

    #[test]
    fn test_locked_tracking_and_fallback() {
        let config = TrackerConfig {
            estimator: EstimatorKind::Kalman,
            short_term_tracker: Some(ShortTermConfig::default()),
            ..TrackerConfig::default()
        };
        let mut tracker = PuckTracker::new(config).unwrap();

        let first = tracker.update(&frame_with_puck(Some((60, 80))));
        assert!(first.is_detected());
        assert_eq!(tracker.state(), TrackState::Locked);

        for i in 1..5 {
            let result = tracker.update(&frame_with_puck(Some((60 + 5 * i, 80))));
            let center = result.center.unwrap();
            let expected = first.center.unwrap().x + 5.0 * i as f32;
            assert_eq!(center.x, expected);
            assert_eq!(tracker.state(), TrackState::Locked);
        }

        // Puck disappears: lock lost, prediction only
        let lost = tracker.update(&frame_with_puck(None));
        assert!(lost.bbox.is_none());
        assert!(lost.center.is_none());
        assert!(lost.prediction.is_some());
        assert_eq!(tracker.state(), TrackState::Searching);
        assert_eq!(tracker.history().last(), Some(None));

        // Detector re-acquires and re-locks
        let back = tracker.update(&frame_with_puck(Some((90, 80))));
        assert!(back.is_detected());
        assert_eq!(tracker.state(), TrackState::Locked);
    }

    #[test]
    fn test_learned_model_with_difference_predictor() {
        let detector = scripted(vec![
            puck_at(10.0),
            puck_at(16.0),
            vec![],
            puck_at(28.0),
            puck_at(34.0),
        ]);
        let mut tracker = PuckTracker::with_detector(TrackerConfig::default(), detector).unwrap();
        let frame = frame_with_puck(None);

        assert!(tracker.update(&frame).prediction.is_none());
        let second = tracker.update(&frame);
        assert_eq!(second.center, Some(Point::new(26.0, 50.0)));
        assert_eq!(second.prediction, Some(Point::new(32.0, 50.0)));

        let missed = tracker.update(&frame);
        assert_eq!(missed, TrackingResult::default());

        // Previous frame missed: no velocity to extrapolate with
        let fourth = tracker.update(&frame);
        assert_eq!(fourth.center, Some(Point::new(38.0, 50.0)));
        assert_eq!(fourth.prediction, None);

        let fifth = tracker.update(&frame);
        assert_eq!(fifth.center, Some(Point::new(44.0, 50.0)));
        assert_eq!(fifth.prediction, Some(Point::new(50.0, 50.0)));
        assert_eq!(tracker.frame_id(), 5);
    }

    #[test]
    fn test_with_detector_validates_config() {
        let config = TrackerConfig {
            velocity_scale: 0.0,
            ..TrackerConfig::default()
        };
        let err = PuckTracker::with_detector(config, scripted(vec![])).err().unwrap();
        assert!(matches!(err, crate::error::TrackerError::Config(_)));

        let config = TrackerConfig {
            history_capacity: 0,
            ..TrackerConfig::default()
        };
        assert!(PuckTracker::with_detector(config, scripted(vec![])).is_err());
    }

    #[test]
    fn test_history_bounded_by_capacity() {
        let config = TrackerConfig {
            history_capacity: 3,
            ..TrackerConfig::default()
        };
        let mut tracker = PuckTracker::new(config).unwrap();
        for _ in 0..10 {
            tracker.update(&frame_with_puck(None));
        }
        assert_eq!(tracker.history().len(), 3);
    }
}
