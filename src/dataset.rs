//! Training-data preparation for the learned detector.
//!
//! Turns point labels (one click per puck) into a YOLO-format dataset:
//! a train/val split of images with one normalized annotation file each and
//! a `data.yaml` describing the layout.

mod labels;
mod prepare;
mod yolo;

pub use labels::{LabelEntry, LabelPoint, load_labels, parse_labels};
pub use prepare::{DatasetPreparer, PrepareConfig, PrepareReport};
pub use yolo::{YoloAnnotation, annotations_for};
