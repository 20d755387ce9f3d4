//! ONNX Runtime inference backend for YOLO-style detectors.
//!
//! Expects the layout produced by an Ultralytics export: one `[1, 3, H, W]`
//! float input in `[0, 1]` and one `[1, 4 + classes, anchors]` output whose
//! first four rows are `cx, cy, w, h` in model-input pixels.

use std::path::Path;

use image::RgbImage;
use image::imageops::{self, FilterType};
use ndarray::{Array4, ArrayView2};
use ort::session::Session;
use tracing::info;

use super::builder::DetectionBuilder;
use super::detector::{DetectionModel, RawDetection};
use crate::error::{Result, TrackerError};
use crate::tracker::TrackerConfig;

/// YOLO detector running on ONNX Runtime.
pub struct OnnxModel {
    session: Session,
    input_name: String,
    output_name: String,
    input_size: (u32, u32),
    conf_threshold: f32,
}

impl std::fmt::Debug for OnnxModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxModel")
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .field("input_size", &self.input_size)
            .field("conf_threshold", &self.conf_threshold)
            .finish()
    }
}

impl OnnxModel {
    /// Load a model file. Fails if the file is missing or not a valid model.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!(?path, "loading ONNX detector");

        let session = Session::builder()
            .map_err(|e| TrackerError::model_load(path, format!("session builder: {e}")))?
            .commit_from_file(path)
            .map_err(|e| TrackerError::model_load(path, e))?;

        Ok(Self {
            session,
            input_name: "images".to_string(),
            output_name: "output0".to_string(),
            input_size: (640, 640),
            conf_threshold: 0.25,
        })
    }

    /// Load a model that decodes with `config.confidence_threshold`.
    pub fn from_config(path: impl AsRef<Path>, config: &TrackerConfig) -> Result<Self> {
        Ok(Self::load(path)?.with_conf_threshold(config.confidence_threshold))
    }

    /// Tensor names, for exports that do not use `images` / `output0`.
    pub fn with_io_names(mut self, input: impl Into<String>, output: impl Into<String>) -> Self {
        self.input_name = input.into();
        self.output_name = output.into();
        self
    }

    /// Model input width and height.
    pub fn with_input_size(mut self, width: u32, height: u32) -> Self {
        self.input_size = (width, height);
        self
    }

    /// Set the confidence threshold for filtering decoded detections.
    pub fn with_conf_threshold(mut self, threshold: f32) -> Self {
        self.conf_threshold = threshold;
        self
    }

    /// Resize to the model input and lay out as normalized NCHW.
    fn preprocess(&self, frame: &RgbImage) -> Array4<f32> {
        let (w, h) = self.input_size;
        let resized = imageops::resize(frame, w, h, FilterType::Triangle);
        let mut input = Array4::<f32>::zeros((1, 3, h as usize, w as usize));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                input[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
            }
        }
        input
    }
}

/// Decode a `[4 + classes, anchors]` prediction matrix.
fn decode(
    predictions: ArrayView2<'_, f32>,
    conf_threshold: f32,
    scale: (f32, f32),
) -> Vec<RawDetection> {
    let rows = predictions.nrows();
    if rows <= 4 {
        return Vec::new();
    }

    predictions
        .columns()
        .into_iter()
        .filter_map(|anchor| {
            let (class_id, score) = (4..rows)
                .map(|r| (r - 4, anchor[r]))
                .max_by(|a, b| a.1.total_cmp(&b.1))?;
            if score < conf_threshold {
                return None;
            }
            Some(
                DetectionBuilder::new()
                    .xywh(anchor[0], anchor[1], anchor[2], anchor[3])
                    .scale(scale.0, scale.1)
                    .class_id(class_id)
                    .score(score)
                    .build(),
            )
        })
        .collect()
}

impl DetectionModel for OnnxModel {
    fn infer(&mut self, frame: &RgbImage) -> Result<Vec<RawDetection>> {
        let input = self.preprocess(frame);
        let shape: Vec<i64> = input.shape().iter().map(|&d| d as i64).collect();
        let data: Vec<f32> = input.iter().copied().collect();

        let tensor = ort::value::Tensor::from_array((shape, data))
            .map_err(|e| TrackerError::Inference(format!("input tensor: {e}")))?;
        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => tensor])
            .map_err(|e| TrackerError::Inference(e.to_string()))?;

        let output = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| TrackerError::Inference(format!("missing output {}", self.output_name)))?;
        let (out_shape, out_data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| TrackerError::Inference(e.to_string()))?;

        let dims: Vec<usize> = out_shape.iter().map(|&d| d as usize).collect();
        let [1, rows, anchors] = dims.as_slice() else {
            return Err(TrackerError::Inference(format!(
                "unexpected output shape {dims:?}"
            )));
        };
        let predictions = ArrayView2::from_shape((*rows, *anchors), out_data)
            .map_err(|e| TrackerError::Inference(e.to_string()))?;

        let scale = (
            frame.width() as f32 / self.input_size.0 as f32,
            frame.height() as f32 / self.input_size.1 as f32,
        );
        Ok(decode(predictions, self.conf_threshold, scale))
    }
}
