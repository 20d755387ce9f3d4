//! TrackerPipeline for driving a tracker from a frame source.

use std::ops::ControlFlow;

use image::RgbImage;

use crate::error::Result;
use crate::integration::source::FrameSource;
use crate::tracker::{MotionHistory, PuckTracker, TrackerConfig, TrackingResult};

/// Pulls frames from a source and runs each one through the tracker.
///
/// Frames are processed strictly one at a time; the next frame is requested
/// only after the sink has handled the previous result.
pub struct TrackerPipeline<S: FrameSource> {
    source: S,
    tracker: PuckTracker,
}

impl<S: FrameSource> TrackerPipeline<S> {
    /// Create a new pipeline around an existing tracker.
    pub fn new(source: S, tracker: PuckTracker) -> Self {
        Self { source, tracker }
    }

    /// Create a pipeline with a tracker built from `config`.
    pub fn with_config(source: S, config: TrackerConfig) -> Result<Self> {
        Ok(Self::new(source, PuckTracker::new(config)?))
    }

    /// Process a single frame.
    pub fn process_frame(&mut self, frame: &RgbImage) -> TrackingResult {
        self.tracker.update(frame)
    }

    /// Run until the source is exhausted or the sink breaks.
    ///
    /// The sink receives each frame with its result and the tracker's motion
    /// history, and returns `ControlFlow::Break(())` to stop (for example on
    /// a user quit). Returns the number of frames processed.
    pub fn run<F>(&mut self, mut sink: F) -> Result<u64>
    where
        F: FnMut(RgbImage, &TrackingResult, &MotionHistory) -> ControlFlow<()>,
    {
        let mut processed = 0;
        while let Some(frame) = self.source.next_frame()? {
            let result = self.tracker.update(&frame);
            processed += 1;
            if sink(frame, &result, self.tracker.history()).is_break() {
                tracing::info!(processed, "pipeline stopped by sink");
                break;
            }
        }
        Ok(processed)
    }

    /// Get a reference to the frame source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Get a reference to the underlying tracker.
    pub fn tracker(&self) -> &PuckTracker {
        &self.tracker
    }

    /// Get a mutable reference to the underlying tracker.
    pub fn tracker_mut(&mut self) -> &mut PuckTracker {
        &mut self.tracker
    }
}
