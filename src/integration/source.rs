//! Frame sources.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use image::RgbImage;

use crate::error::Result;

/// Blocking pull source of frames.
pub trait FrameSource {
    /// Next frame, or `Ok(None)` once the stream is exhausted.
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;
}

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Whether `path` has one of the image extensions the tools read.
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.iter().any(|known| e.eq_ignore_ascii_case(known)))
}

/// Frames read from a directory of still images in file-name order.
#[derive(Debug, Clone)]
pub struct ImageSequence {
    paths: VecDeque<PathBuf>,
}

impl ImageSequence {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir.as_ref())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_image_file(p))
            .collect();
        paths.sort();
        tracing::info!(dir = %dir.as_ref().display(), frames = paths.len(), "opened image sequence");
        Ok(Self {
            paths: paths.into(),
        })
    }

    pub fn from_paths(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            paths: paths.into_iter().collect(),
        }
    }

    /// Frames not yet read.
    pub fn remaining(&self) -> usize {
        self.paths.len()
    }
}

impl FrameSource for ImageSequence {
    /// An unreadable frame ends the stream.
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        let Some(path) = self.paths.pop_front() else {
            return Ok(None);
        };
        match image::open(&path) {
            Ok(img) => Ok(Some(img.to_rgb8())),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "frame read failed, ending stream");
                self.paths.clear();
                Ok(None)
            }
        }
    }
}

/// Frames held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    frames: VecDeque<RgbImage>,
}

impl MemorySource {
    pub fn new(frames: impl IntoIterator<Item = RgbImage>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    pub fn push(&mut self, frame: RgbImage) {
        self.frames.push_back(frame);
    }
}

impl FrameSource for MemorySource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        Ok(self.frames.pop_front())
    }
}
