mod candidate;
mod config;
mod estimator;
mod history;
mod kalman_filter;
mod puck_tracker;
mod rect;
mod selector;
mod track_state;
mod visual_tracker;

pub use candidate::{Candidate, CandidateKind, ContourShape};
pub use config::{EstimatorKind, ShortTermConfig, TrackerConfig};
pub use estimator::{DifferencePredictor, KalmanEstimator, StateEstimator, build_estimator};
pub use history::MotionHistory;
pub use kalman_filter::{KalmanFilter, StateCovariance, StateMean};
pub use puck_tracker::{PuckTracker, TrackingResult};
pub use rect::{Point, Rect};
pub use selector::{CandidateSelector, Detection, Rejection};
pub use track_state::TrackState;
pub use visual_tracker::{ShortTermTracker, TemplateTracker};
