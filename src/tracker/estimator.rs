//! State estimators: predict where the puck will be on the next frame.

use crate::tracker::config::{EstimatorKind, TrackerConfig};
use crate::tracker::history::MotionHistory;
use crate::tracker::kalman_filter::{KalmanFilter, StateCovariance, StateMean};
use crate::tracker::rect::Point;

/// Belief about the puck's motion, advanced once per frame.
///
/// `history` already contains the current frame's entry when either method
/// is called.
pub trait StateEstimator: Send {
    /// Fold in this frame's measured center and return the predicted next position.
    fn update(&mut self, measurement: Point, history: &MotionHistory) -> Option<Point>;

    /// Advance one frame without a measurement.
    fn predict_only(&mut self, history: &MotionHistory) -> Option<Point>;

    /// Current velocity estimate in pixels per frame, when there is one.
    fn velocity(&self) -> Option<(f32, f32)>;
}

/// Build the estimator named by the configuration.
pub fn build_estimator(config: &TrackerConfig) -> Box<dyn StateEstimator> {
    match config.estimator {
        EstimatorKind::Difference => Box::new(DifferencePredictor::default()),
        EstimatorKind::Kalman => Box::new(KalmanEstimator::new(KalmanFilter::new(
            config.measurement_noise,
            config.process_noise,
            config.initial_covariance,
        ))),
    }
}

/// Predicts `last + (last - previous)` from the detections of this frame and
/// the one before it.
///
/// Holds no belief of its own beyond the velocity it last derived. A frame
/// without a detection, or one right after a missed frame, yields no
/// prediction.
#[derive(Debug, Clone, Default)]
pub struct DifferencePredictor {
    velocity: Option<(f32, f32)>,
}

impl StateEstimator for DifferencePredictor {
    fn update(&mut self, _measurement: Point, history: &MotionHistory) -> Option<Point> {
        let Some((previous, last)) = history.last_pair() else {
            self.velocity = None;
            return None;
        };
        let (vx, vy) = last.delta_from(&previous);
        self.velocity = Some((vx, vy));
        Some(last.translate(vx, vy))
    }

    fn predict_only(&mut self, _history: &MotionHistory) -> Option<Point> {
        None
    }

    fn velocity(&self) -> Option<(f32, f32)> {
        self.velocity
    }
}

/// Recursive constant-velocity estimator.
///
/// Keeps the predicted (prior) state between frames. A measurement corrects
/// that prior; every frame then ends with a prediction step, so without
/// measurements the estimate keeps extrapolating along the last velocity.
#[derive(Debug, Clone)]
pub struct KalmanEstimator {
    kalman_filter: KalmanFilter,
    mean: Option<StateMean>,
    covariance: Option<StateCovariance>,
}

impl KalmanEstimator {
    pub fn new(kalman_filter: KalmanFilter) -> Self {
        Self {
            kalman_filter,
            mean: None,
            covariance: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.mean.is_some()
    }

    fn predicted_position(&self) -> Option<Point> {
        self.mean
            .as_ref()
            .map(|m| Point::new(m[0] as f32, m[1] as f32))
    }

    fn advance(&mut self) {
        if let (Some(mean), Some(cov)) = (&self.mean, &self.covariance) {
            let (new_mean, new_cov) = self.kalman_filter.predict(mean, cov);
            self.mean = Some(new_mean);
            self.covariance = Some(new_cov);
        }
    }
}

impl StateEstimator for KalmanEstimator {
    fn update(&mut self, measurement: Point, _history: &MotionHistory) -> Option<Point> {
        let z = [measurement.x as f64, measurement.y as f64];

        match (&self.mean, &self.covariance) {
            (Some(mean), Some(cov)) => {
                let (new_mean, new_cov) = self.kalman_filter.update(mean, cov, z);
                self.mean = Some(new_mean);
                self.covariance = Some(new_cov);
            }
            _ => {
                let (mean, cov) = self.kalman_filter.initiate(z);
                self.mean = Some(mean);
                self.covariance = Some(cov);
            }
        }

        self.advance();
        self.predicted_position()
    }

    fn predict_only(&mut self, _history: &MotionHistory) -> Option<Point> {
        self.advance();
        self.predicted_position()
    }

    fn velocity(&self) -> Option<(f32, f32)> {
        self.mean.as_ref().map(|m| (m[2] as f32, m[3] as f32))
    }
}
