//! Integration module for connecting frames and detection backends with the
//! puck tracker.
//!
//! This module provides the candidate detectors (color/shape heuristic or a
//! learned model), frame sources, the processing pipeline and overlay
//! rendering. Inference backends (ONNX Runtime, Burn) sit behind features.

mod builder;
mod detector;
mod heuristic;
mod pipeline;
mod render;
mod source;

pub use builder::DetectionBuilder;
pub use detector::{CandidateDetector, DetectionModel, LearnedModelDetector, RawDetection};
pub use heuristic::{HeuristicDetector, rgb_to_hsv};
pub use pipeline::TrackerPipeline;
pub use render::draw_tracking;
pub use source::{FrameSource, ImageSequence, MemorySource, is_image_file};

#[cfg(feature = "onnx")]
mod onnx_backend;

#[cfg(feature = "onnx")]
pub use onnx_backend::OnnxModel;

#[cfg(feature = "burn-backend")]
mod burn_backend;

#[cfg(feature = "burn-backend")]
pub use burn_backend::{BurnDetector, BurnModel, BurnOutput};
