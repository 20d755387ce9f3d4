//! Candidate detector strategies and the learned-model seam.

use image::RgbImage;

use crate::error::Result;
use crate::integration::heuristic::HeuristicDetector;
use crate::tracker::{Candidate, Rect, TrackerConfig};

/// One detection reported by a learned model, in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
    /// Bounding box in frame pixels
    pub bbox: Rect,
    /// Predicted class index
    pub class_id: usize,
    /// Confidence score
    pub score: f32,
}

impl RawDetection {
    pub fn new(bbox: Rect, class_id: usize, score: f32) -> Self {
        Self {
            bbox,
            class_id,
            score,
        }
    }
}

/// Trait for object detection inference backends.
///
/// Implement this trait to connect any detection model to the tracker.
///
/// # Example
///
/// ```ignore
/// use pucktrack_rs::{DetectionModel, RawDetection};
///
/// struct MyDetector {
///     // Your model here
/// }
///
/// impl DetectionModel for MyDetector {
///     fn infer(&mut self, frame: &image::RgbImage) -> pucktrack_rs::Result<Vec<RawDetection>> {
///         // Run inference and return detections
///         Ok(vec![])
///     }
/// }
/// ```
pub trait DetectionModel: Send {
    /// Run inference on one frame.
    fn infer(&mut self, frame: &RgbImage) -> Result<Vec<RawDetection>>;
}

/// Wraps a model and keeps only confident detections of the target class.
pub struct LearnedModelDetector {
    model: Box<dyn DetectionModel>,
    class_id: usize,
    confidence_threshold: f32,
}

impl LearnedModelDetector {
    pub fn new(model: Box<dyn DetectionModel>, class_id: usize, confidence_threshold: f32) -> Self {
        Self {
            model,
            class_id,
            confidence_threshold,
        }
    }

    /// Candidates for this frame. Inference failures are logged and yield an
    /// empty set.
    pub fn detect(&mut self, frame: &RgbImage) -> Vec<Candidate> {
        let raw = match self.model.infer(frame) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "model inference failed, treating frame as empty");
                return Vec::new();
            }
        };

        raw.into_iter()
            .filter(|d| d.class_id == self.class_id && d.score >= self.confidence_threshold)
            .map(|d| Candidate::from_model(d.bbox, d.class_id, d.score))
            .collect()
    }
}

/// The two interchangeable per-frame detection strategies.
pub enum CandidateDetector {
    Heuristic(HeuristicDetector),
    LearnedModel(LearnedModelDetector),
}

impl CandidateDetector {
    /// Heuristic detector unless the configuration names a model artifact.
    pub fn from_config(config: &TrackerConfig) -> Result<Self> {
        match &config.model_path {
            None => Ok(Self::Heuristic(HeuristicDetector::new(config))),
            Some(path) => {
                let model = load_model(path, config)?;
                Ok(Self::LearnedModel(LearnedModelDetector::new(
                    model,
                    config.class_id,
                    config.confidence_threshold,
                )))
            }
        }
    }

    pub fn detect(&mut self, frame: &RgbImage) -> Vec<Candidate> {
        match self {
            Self::Heuristic(detector) => detector.detect(frame),
            Self::LearnedModel(detector) => detector.detect(frame),
        }
    }

    pub fn is_learned(&self) -> bool {
        matches!(self, Self::LearnedModel(_))
    }
}

#[cfg(feature = "onnx")]
fn load_model(path: &std::path::Path, config: &TrackerConfig) -> Result<Box<dyn DetectionModel>> {
    Ok(Box::new(super::onnx_backend::OnnxModel::from_config(path, config)?))
}

#[cfg(not(feature = "onnx"))]
fn load_model(path: &std::path::Path, _config: &TrackerConfig) -> Result<Box<dyn DetectionModel>> {
    Err(crate::error::TrackerError::model_load(
        path,
        "model inference requires the `onnx` feature",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrackerError;

    struct Fixed(Vec<RawDetection>);

    impl DetectionModel for Fixed {
        fn infer(&mut self, _frame: &RgbImage) -> Result<Vec<RawDetection>> {
            Ok(self.0.clone())
        }
    }

    struct Broken;

    impl DetectionModel for Broken {
        fn infer(&mut self, _frame: &RgbImage) -> Result<Vec<RawDetection>> {
            Err(TrackerError::Inference("device lost".into()))
        }
    }

    fn frame() -> RgbImage {
        RgbImage::new(64, 64)
    }

    #[test]
    fn test_filters_class_and_confidence() {
        let model = Fixed(vec![
            RawDetection::new(Rect::new(0.0, 0.0, 8.0, 8.0), 0, 0.9),
            RawDetection::new(Rect::new(10.0, 0.0, 8.0, 8.0), 1, 0.95),
            RawDetection::new(Rect::new(20.0, 0.0, 8.0, 8.0), 0, 0.1),
            RawDetection::new(Rect::new(30.0, 0.0, 8.0, 8.0), 0, 0.25),
        ]);
        let mut detector = LearnedModelDetector::new(Box::new(model), 0, 0.25);
        let candidates = detector.detect(&frame());
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].confidence(), Some(0.9));
        assert_eq!(candidates[1].confidence(), Some(0.25));
    }

    #[test]
    fn test_inference_failure_is_empty() {
        let mut detector = LearnedModelDetector::new(Box::new(Broken), 0, 0.25);
        assert!(detector.detect(&frame()).is_empty());
    }

    #[cfg(not(feature = "onnx"))]
    #[test]
    fn test_model_path_without_backend_fails_at_construction() {
        let config = TrackerConfig {
            model_path: Some("runs/train/best.onnx".into()),
            ..TrackerConfig::default()
        };
        let err = CandidateDetector::from_config(&config).err().unwrap();
        assert!(matches!(err, TrackerError::ModelLoad { .. }));
    }

    #[test]
    fn test_default_config_is_heuristic() {
        let detector = CandidateDetector::from_config(&TrackerConfig::default()).unwrap();
        assert!(!detector.is_learned());
    }
}
