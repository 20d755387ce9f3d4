//! Burn inference backend for puck detection.
//!
//! This module provides a `BurnDetector` that implements `DetectionModel`
//! for running detection networks built with the Burn framework.
//!
//! # Example
//!
//! ```ignore
//! use pucktrack_rs::integration::{BurnDetector, BurnModel, BurnOutput};
//! use burn::backend::NdArray;
//!
//! struct MyYoloModel { /* ... */ }
//!
//! impl BurnModel<NdArray> for MyYoloModel {
//!     fn forward(&self, input: burn::tensor::Tensor<NdArray, 4>) -> Vec<BurnOutput> {
//!         // Run inference
//!     }
//! }
//!
//! let detector = BurnDetector::new(MyYoloModel::load("puck.bin"), Default::default());
//! let tracker = PuckTracker::with_detector(config, CandidateDetector::LearnedModel(
//!     LearnedModelDetector::new(Box::new(detector), 0, 0.25),
//! ))?;
//! ```

use burn::prelude::*;
use burn::tensor::Tensor;
use image::RgbImage;
use image::imageops::{self, FilterType};

use super::builder::DetectionBuilder;
use super::detector::{DetectionModel, RawDetection};
use crate::error::{Result, TrackerError};

/// Raw network output for one box, in model-input pixels.
#[derive(Debug, Clone)]
pub struct BurnOutput {
    /// Bounding box: [x1, y1, x2, y2] or [cx, cy, w, h] depending on model
    pub bbox: [f32; 4],
    pub score: f32,
    pub class_id: usize,
}

/// Trait for Burn-based detection models.
///
/// Implement this trait for your specific model architecture.
pub trait BurnModel<B: Backend>: Send + Sync {
    /// Run forward pass on a `[1, channels, height, width]` tensor.
    fn forward(&self, input: Tensor<B, 4>) -> Vec<BurnOutput>;

    /// Get the expected input size (channels, height, width).
    fn input_size(&self) -> (u32, u32, u32) {
        (3, 640, 640)
    }

    /// Whether bbox output is in XYWH format (vs TLBR).
    fn bbox_is_xywh(&self) -> bool {
        true
    }
}

/// Burn-based detector implementing `DetectionModel`.
pub struct BurnDetector<B: Backend, M: BurnModel<B>> {
    model: M,
    device: B::Device,
    conf_threshold: f32,
}

impl<B: Backend, M: BurnModel<B>> BurnDetector<B, M> {
    /// Create a new Burn detector with the given model and device.
    pub fn new(model: M, device: B::Device) -> Self {
        Self {
            model,
            device,
            conf_threshold: 0.25,
        }
    }

    /// Set the confidence threshold for filtering detections.
    pub fn with_conf_threshold(mut self, threshold: f32) -> Self {
        self.conf_threshold = threshold;
        self
    }

    /// Resize the frame to the model input and convert to a normalized
    /// `[1, C, H, W]` tensor.
    pub fn preprocess(&self, frame: &RgbImage) -> Result<Tensor<B, 4>> {
        let (channels, target_h, target_w) = self.model.input_size();
        if channels != 3 {
            return Err(TrackerError::Inference(format!(
                "model expects {channels} channels, frames have 3"
            )));
        }

        let resized = imageops::resize(frame, target_w, target_h, FilterType::Triangle);
        let plane = (target_w * target_h) as usize;
        let mut data = vec![0.0f32; plane * 3];
        for (i, pixel) in resized.pixels().enumerate() {
            for c in 0..3 {
                data[c * plane + i] = pixel[c] as f32 / 255.0;
            }
        }

        Ok(Tensor::<B, 1>::from_floats(data.as_slice(), &self.device).reshape([
            1,
            3,
            target_h as usize,
            target_w as usize,
        ]))
    }

    /// Map raw outputs back onto the frame.
    fn postprocess(&self, outputs: Vec<BurnOutput>, scale: (f32, f32)) -> Vec<RawDetection> {
        outputs
            .into_iter()
            .filter(|d| d.score >= self.conf_threshold)
            .map(|d| {
                let builder = DetectionBuilder::new()
                    .score(d.score)
                    .class_id(d.class_id)
                    .scale(scale.0, scale.1);
                if self.model.bbox_is_xywh() {
                    builder
                        .xywh(d.bbox[0], d.bbox[1], d.bbox[2], d.bbox[3])
                        .build()
                } else {
                    builder
                        .tlbr(d.bbox[0], d.bbox[1], d.bbox[2], d.bbox[3])
                        .build()
                }
            })
            .collect()
    }
}

impl<B: Backend, M: BurnModel<B>> DetectionModel for BurnDetector<B, M> {
    fn infer(&mut self, frame: &RgbImage) -> Result<Vec<RawDetection>> {
        let tensor = self.preprocess(frame)?;
        let outputs = self.model.forward(tensor);
        let (_, target_h, target_w) = self.model.input_size();
        let scale = (
            frame.width() as f32 / target_w as f32,
            frame.height() as f32 / target_h as f32,
        );
        Ok(self.postprocess(outputs, scale))
    }
}
