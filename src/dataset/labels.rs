use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// One clicked puck position, in image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelPoint {
    pub x: f64,
    pub y: f64,
}

/// Label stored for one image.
///
/// Older label files hold a single `{x, y}`; newer ones hold every puck in
/// the image plus a flag marking images that should not be trained on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabelEntry {
    Annotated {
        points: Vec<LabelPoint>,
        #[serde(default = "default_valid")]
        valid: bool,
    },
    Point(LabelPoint),
}

fn default_valid() -> bool {
    true
}

impl LabelEntry {
    pub fn points(&self) -> &[LabelPoint] {
        match self {
            Self::Annotated { points, .. } => points,
            Self::Point(point) => std::slice::from_ref(point),
        }
    }

    pub fn is_valid(&self) -> bool {
        match self {
            Self::Annotated { valid, .. } => *valid,
            Self::Point(_) => true,
        }
    }
}

/// Parse a labels document: a JSON object mapping image name to entry.
///
/// A document that is not a JSON object is an error. Individual entries
/// that do not match either label shape are skipped with a warning.
pub fn parse_labels(text: &str) -> Result<BTreeMap<String, LabelEntry>> {
    let raw: serde_json::Map<String, Value> = serde_json::from_str(text)?;
    let mut labels = BTreeMap::new();
    for (name, value) in raw {
        match serde_json::from_value::<LabelEntry>(value) {
            Ok(entry) => {
                labels.insert(name, entry);
            }
            Err(e) => tracing::warn!(image = %name, error = %e, "skipping malformed label entry"),
        }
    }
    Ok(labels)
}

pub fn load_labels(path: impl AsRef<Path>) -> Result<BTreeMap<String, LabelEntry>> {
    let text = std::fs::read_to_string(path)?;
    parse_labels(&text)
}
