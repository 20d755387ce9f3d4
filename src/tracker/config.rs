//! Tracker configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};

/// Which state estimator the tracker runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EstimatorKind {
    /// Last position plus last frame-to-frame displacement.
    #[default]
    Difference,
    /// Constant-velocity Kalman filter.
    Kalman,
}

/// Settings for the template-matching short-term tracker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShortTermConfig {
    /// Half-size in pixels of the window searched around the last position.
    pub search_radius: u32,
    /// Lock is lost when the best match falls below this similarity.
    pub min_similarity: f32,
}

impl Default for ShortTermConfig {
    fn default() -> Self {
        Self {
            search_radius: 24,
            min_similarity: 0.85,
        }
    }
}

/// Configuration for the PuckTracker.
///
/// The defaults are tuned for a black puck roughly 20-40 px wide on a bright
/// surface; none of them are calibrated automatically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Inclusive lower HSV bound (H in 0..=180, S and V in 0..=255).
    pub hsv_lower: [u8; 3],
    /// Inclusive upper HSV bound.
    pub hsv_upper: [u8; 3],
    /// Side of the square structuring element used for opening and closing.
    pub morph_kernel_size: u8,
    pub min_area: f64,
    pub max_area: f64,
    pub min_circularity: f64,
    /// Largest accepted |1 - w/h| of a candidate's bounding box.
    pub max_aspect_deviation: f64,
    /// Distance (px) over which the velocity score decays by a factor of e.
    pub velocity_scale: f64,
    /// A winner must score strictly above this.
    pub min_score: f64,
    pub history_capacity: usize,
    pub estimator: EstimatorKind,
    /// Measurement noise scale (R = r * I).
    pub measurement_noise: f64,
    /// Process noise scale (Q = q * I).
    pub process_noise: f64,
    /// Covariance scale assigned on the first measurement.
    pub initial_covariance: f64,
    /// Learned detector artifact; `None` selects the heuristic detector.
    pub model_path: Option<PathBuf>,
    pub class_id: usize,
    pub confidence_threshold: f32,
    /// Enables the SEARCHING/LOCKED hybrid when set.
    pub short_term_tracker: Option<ShortTermConfig>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            hsv_lower: [0, 0, 0],
            hsv_upper: [180, 80, 50],
            morph_kernel_size: 5,
            min_area: 300.0,
            max_area: 1200.0,
            min_circularity: 0.8,
            max_aspect_deviation: 0.3,
            velocity_scale: 50.0,
            min_score: 0.7,
            history_capacity: 30,
            estimator: EstimatorKind::Difference,
            measurement_noise: 10.0,
            process_noise: 0.1,
            initial_covariance: 1.0,
            model_path: None,
            class_id: 0,
            confidence_threshold: 0.25,
            short_term_tracker: None,
        }
    }
}

impl TrackerConfig {
    /// Load a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the tracker cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.hsv_upper[0] > 180 {
            return Err(TrackerError::config("hue upper bound exceeds 180"));
        }
        if (0..3).any(|i| self.hsv_lower[i] > self.hsv_upper[i]) {
            return Err(TrackerError::config("hsv_lower exceeds hsv_upper"));
        }
        if self.morph_kernel_size == 0 || self.morph_kernel_size % 2 == 0 {
            return Err(TrackerError::config(format!(
                "morph_kernel_size must be odd and positive, got {}",
                self.morph_kernel_size
            )));
        }
        if self.min_area < 0.0 || self.min_area > self.max_area {
            return Err(TrackerError::config(format!(
                "area range [{}, {}] is empty",
                self.min_area, self.max_area
            )));
        }
        if !(0.0..=1.0).contains(&self.min_circularity) || !(0.0..=1.0).contains(&self.min_score)
        {
            return Err(TrackerError::config(
                "min_circularity and min_score must lie in [0, 1]",
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(TrackerError::config("confidence_threshold must lie in [0, 1]"));
        }
        if self.max_aspect_deviation < 0.0 || self.velocity_scale <= 0.0 {
            return Err(TrackerError::config(
                "max_aspect_deviation must be >= 0 and velocity_scale > 0",
            ));
        }
        if self.history_capacity == 0 {
            return Err(TrackerError::config("history_capacity must be at least 1"));
        }
        if self.measurement_noise <= 0.0
            || self.process_noise <= 0.0
            || self.initial_covariance <= 0.0
        {
            return Err(TrackerError::config("noise and covariance scales must be positive"));
        }
        if let Some(st) = &self.short_term_tracker {
            if !(0.0..=1.0).contains(&st.min_similarity) {
                return Err(TrackerError::config("min_similarity must lie in [0, 1]"));
            }
        }
        Ok(())
    }
}
