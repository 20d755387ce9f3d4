//! Real-time hockey puck tracking.
//!
//! Each frame goes through candidate detection (a color/shape heuristic or a
//! learned detector), candidate selection against the last known position,
//! and motion prediction. An optional short-term visual tracker follows the
//! puck between detections.
//!
//! ```ignore
//! use pucktrack_rs::{ImageSequence, TrackerConfig, TrackerPipeline};
//!
//! let source = ImageSequence::open("frames/")?;
//! let mut pipeline = TrackerPipeline::with_config(source, TrackerConfig::default())?;
//! pipeline.run(|_frame, result, _history| {
//!     println!("{:?}", result.center);
//!     std::ops::ControlFlow::Continue(())
//! })?;
//! ```

pub mod dataset;
pub mod error;
pub mod integration;
pub mod tracker;

pub use error::{Result, TrackerError};
pub use integration::{
    CandidateDetector, DetectionModel, FrameSource, ImageSequence, RawDetection, TrackerPipeline,
    draw_tracking,
};
pub use tracker::{
    Candidate, EstimatorKind, MotionHistory, Point, PuckTracker, Rect, TrackState, TrackerConfig,
    TrackingResult,
};
