use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use super::labels::{LabelEntry, load_labels};
use super::yolo::annotations_for;
use crate::error::{Result, TrackerError};

/// Settings for building a YOLO dataset from point labels.
#[derive(Debug, Clone, PartialEq)]
pub struct PrepareConfig {
    /// Directories searched, in order, for each labeled image.
    pub image_dirs: Vec<PathBuf>,
    pub output_dir: PathBuf,
    /// Share of images held out for validation.
    pub val_fraction: f64,
    /// Box side as a fraction of the image side.
    pub box_fraction: f64,
    pub class_id: usize,
    pub class_name: String,
    /// Fixed shuffle seed; `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl PrepareConfig {
    pub fn new(image_dirs: Vec<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            image_dirs,
            output_dir: output_dir.into(),
            val_fraction: 0.2,
            box_fraction: 0.03,
            class_id: 0,
            class_name: "puck".to_string(),
            seed: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.image_dirs.is_empty() {
            return Err(TrackerError::config("no image directories given"));
        }
        if !(0.0..=1.0).contains(&self.val_fraction) {
            return Err(TrackerError::config(format!(
                "val_fraction must be in [0, 1], got {}",
                self.val_fraction
            )));
        }
        if !(self.box_fraction > 0.0 && self.box_fraction <= 1.0) {
            return Err(TrackerError::config(format!(
                "box_fraction must be in (0, 1], got {}",
                self.box_fraction
            )));
        }
        Ok(())
    }
}

/// Outcome of a preparation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrepareReport {
    pub train: usize,
    pub val: usize,
    /// Annotation lines written across both splits.
    pub annotations: usize,
    /// Entries marked invalid by the labeler.
    pub invalid: usize,
    /// Labeled images not found in any image directory.
    pub missing: usize,
    pub unreadable: usize,
    /// Names that are not a bare file name, such as `../x.png`.
    pub rejected: usize,
}

#[derive(Debug, Clone, Copy)]
enum Split {
    Train,
    Val,
}

impl Split {
    fn dir_name(self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Val => "val",
        }
    }
}

/// Writes `images/{train,val}`, `labels/{train,val}` and `data.yaml` under
/// the output directory.
#[derive(Debug, Clone)]
pub struct DatasetPreparer {
    config: PrepareConfig,
}

impl DatasetPreparer {
    pub fn new(config: PrepareConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn prepare_from_file(&self, labels_path: impl AsRef<Path>) -> Result<PrepareReport> {
        let labels = load_labels(labels_path)?;
        self.prepare(&labels)
    }

    /// Build the dataset. Per-image problems are logged, counted and skipped;
    /// only failures to create the output layout are errors.
    pub fn prepare(&self, labels: &BTreeMap<String, LabelEntry>) -> Result<PrepareReport> {
        let out = &self.config.output_dir;
        for kind in ["images", "labels"] {
            for split in [Split::Train, Split::Val] {
                fs::create_dir_all(out.join(kind).join(split.dir_name()))?;
            }
        }

        let mut report = PrepareReport::default();
        let mut names = Vec::with_capacity(labels.len());
        for (name, entry) in labels {
            if entry.is_valid() {
                names.push(name.as_str());
            } else {
                tracing::info!(image = %name, "skipping image marked invalid");
                report.invalid += 1;
            }
        }

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        names.shuffle(&mut rng);
        let n_val = ((names.len() as f64 * self.config.val_fraction).ceil() as usize).min(names.len());
        let (val, train) = names.split_at(n_val);

        for (split, set) in [(Split::Train, train), (Split::Val, val)] {
            for &name in set {
                if let Some(lines) = self.process_image(name, &labels[name], split, &mut report)? {
                    report.annotations += lines;
                    match split {
                        Split::Train => report.train += 1,
                        Split::Val => report.val += 1,
                    }
                }
            }
        }

        self.write_data_yaml()?;
        tracing::info!(
            train = report.train,
            val = report.val,
            annotations = report.annotations,
            invalid = report.invalid,
            missing = report.missing,
            unreadable = report.unreadable,
            rejected = report.rejected,
            "dataset prepared"
        );
        Ok(report)
    }

    /// Copy one image and write its label file. `Ok(None)` when skipped.
    fn process_image(
        &self,
        name: &str,
        entry: &LabelEntry,
        split: Split,
        report: &mut PrepareReport,
    ) -> Result<Option<usize>> {
        if !is_bare_file_name(name) {
            tracing::warn!(image = %name, "label name is not a plain file name");
            report.rejected += 1;
            return Ok(None);
        }
        let Some(src) = self.locate(name) else {
            tracing::warn!(image = %name, "image not found in any image directory");
            report.missing += 1;
            return Ok(None);
        };
        // Full decode so truncated files are caught, not just bad headers
        let (width, height) = match image::open(&src) {
            Ok(img) => (img.width(), img.height()),
            Err(e) => {
                tracing::warn!(path = %src.display(), error = %e, "could not read image");
                report.unreadable += 1;
                return Ok(None);
            }
        };

        let out = &self.config.output_dir;
        let file_name = Path::new(name);
        fs::copy(&src, out.join("images").join(split.dir_name()).join(file_name))?;

        let annotations =
            annotations_for(entry, width, height, self.config.box_fraction, self.config.class_id);
        let mut text = String::new();
        for annotation in &annotations {
            text.push_str(&annotation.to_string());
            text.push('\n');
        }
        let label_path = out
            .join("labels")
            .join(split.dir_name())
            .join(file_name.with_extension("txt"));
        fs::write(label_path, text)?;
        Ok(Some(annotations.len()))
    }

    fn locate(&self, name: &str) -> Option<PathBuf> {
        self.config
            .image_dirs
            .iter()
            .map(|dir| dir.join(name))
            .find(|path| path.is_file())
    }

    fn write_data_yaml(&self) -> Result<()> {
        let out = &self.config.output_dir;
        let root = fs::canonicalize(out).unwrap_or_else(|_| out.clone());
        let yaml = format!(
            "path: {}\ntrain: images/train\nval: images/val\nnc: {}\nnames:\n  {}: {}\n",
            root.display(),
            self.config.class_id + 1,
            self.config.class_id,
            self.config.class_name,
        );
        fs::write(out.join("data.yaml"), yaml)?;
        Ok(())
    }
}

/// A single normal path component: no separators, `..`, or roots.
fn is_bare_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{LabelPoint, parse_labels};
    use image::RgbImage;

    struct Fixture {
        _root: tempfile::TempDir,
        config: PrepareConfig,
    }

    fn fixture(images: &[(&str, u32, u32)]) -> Fixture {
        let root = tempfile::tempdir().unwrap();
        let on_ice = root.path().join("on_ice");
        let close_up = root.path().join("close_up");
        fs::create_dir_all(&on_ice).unwrap();
        fs::create_dir_all(&close_up).unwrap();
        for (i, (name, w, h)) in images.iter().enumerate() {
            let dir = if i % 2 == 0 { &on_ice } else { &close_up };
            RgbImage::new(*w, *h).save(dir.join(name)).unwrap();
        }
        let config = PrepareConfig {
            val_fraction: 0.0,
            seed: Some(7),
            ..PrepareConfig::new(vec![on_ice, close_up], root.path().join("yolo"))
        };
        Fixture {
            _root: root,
            config,
        }
    }

    #[test]
    fn test_prepare_writes_layout_and_labels() {
        let fx = fixture(&[("a.png", 1000, 500), ("b.png", 100, 100), ("c.png", 50, 50)]);
        let labels = parse_labels(
            r#"{
                "a.png": {"points": [{"x": 100, "y": 50}], "valid": true},
                "b.png": {"x": 10, "y": 20},
                "c.png": {"points": [{"x": 5, "y": 5}], "valid": false},
                "gone.png": {"x": 1, "y": 1}
            }"#,
        )
        .unwrap();

        let report = DatasetPreparer::new(fx.config.clone()).unwrap().prepare(&labels).unwrap();
        assert_eq!(
            report,
            PrepareReport {
                train: 2,
                val: 0,
                annotations: 2,
                invalid: 1,
                missing: 1,
                unreadable: 0,
                rejected: 0,
            }
        );

        let out = &fx.config.output_dir;
        let a = fs::read_to_string(out.join("labels/train/a.txt")).unwrap();
        assert_eq!(a, "0 0.1 0.1 0.03 0.03\n");
        assert!(out.join("images/train/b.png").is_file());
        assert!(!out.join("images/train/c.png").exists());
        assert!(!out.join("labels/train/c.txt").exists());

        let yaml = fs::read_to_string(out.join("data.yaml")).unwrap();
        assert!(yaml.contains("train: images/train"));
        assert!(yaml.contains("nc: 1"));
        assert!(yaml.contains("0: puck"));
    }

    #[test]
    fn test_split_is_seeded() {
        let names = ["p0.png", "p1.png", "p2.png", "p3.png", "p4.png"];
        let images: Vec<_> = names.iter().map(|n| (*n, 10, 10)).collect();
        let labels: BTreeMap<String, LabelEntry> = names
            .iter()
            .map(|n| (n.to_string(), LabelEntry::Point(LabelPoint { x: 5.0, y: 5.0 })))
            .collect();

        let run = || {
            let fx = fixture(&images);
            let config = PrepareConfig {
                val_fraction: 0.4,
                ..fx.config.clone()
            };
            let report = DatasetPreparer::new(config.clone()).unwrap().prepare(&labels).unwrap();
            let mut val: Vec<String> = fs::read_dir(config.output_dir.join("images/val"))
                .unwrap()
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect();
            val.sort();
            (report, val)
        };

        let (report, first) = run();
        assert_eq!(report.train, 3);
        assert_eq!(report.val, 2);
        assert_eq!(first.len(), 2);
        let (_, second) = run();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unreadable_image_is_skipped() {
        let fx = fixture(&[]);
        fs::write(fx.config.image_dirs[0].join("corrupt.png"), b"not a png").unwrap();
        let labels = parse_labels(r#"{"corrupt.png": {"x": 1, "y": 1}}"#).unwrap();

        let report = DatasetPreparer::new(fx.config.clone()).unwrap().prepare(&labels).unwrap();
        assert_eq!(report.unreadable, 1);
        assert_eq!(report.train, 0);
    }

    #[test]
    fn test_truncated_image_is_unreadable() {
        let fx = fixture(&[]);
        let dir = &fx.config.image_dirs[0];
        let full = dir.join("full.png");
        RgbImage::from_fn(64, 64, |x, y| image::Rgb([(x * 4) as u8, (y * 4) as u8, (x ^ y) as u8]))
            .save(&full)
            .unwrap();
        let bytes = fs::read(&full).unwrap();
        fs::write(dir.join("cut.png"), &bytes[..bytes.len() / 2]).unwrap();
        // Header survives the cut
        assert_eq!(image::image_dimensions(dir.join("cut.png")).unwrap(), (64, 64));

        let labels = parse_labels(r#"{"cut.png": {"x": 1, "y": 1}}"#).unwrap();
        let report = DatasetPreparer::new(fx.config.clone()).unwrap().prepare(&labels).unwrap();
        assert_eq!(report.unreadable, 1);
        assert_eq!(report.train, 0);
        assert!(!fx.config.output_dir.join("images/train/cut.png").exists());
    }

    #[test]
    fn test_names_outside_image_dirs_are_rejected() {
        let fx = fixture(&[]);
        // Reachable from an image directory through `..`
        let root = fx.config.output_dir.parent().unwrap();
        RgbImage::new(10, 10).save(root.join("escape.png")).unwrap();
        let labels = parse_labels(
            r#"{"../escape.png": {"x": 1, "y": 1}, "nested/inner.png": {"x": 1, "y": 1}}"#,
        )
        .unwrap();

        let report = DatasetPreparer::new(fx.config.clone()).unwrap().prepare(&labels).unwrap();
        assert_eq!(report.rejected, 2);
        assert_eq!(report.train, 0);
        let out = &fx.config.output_dir;
        assert!(!out.join("images/escape.png").exists());
        assert!(!out.join("labels/escape.txt").exists());
    }

    #[test]
    fn test_bare_file_names() {
        assert!(is_bare_file_name("rink_01.jpg"));
        assert!(!is_bare_file_name("../x.png"));
        assert!(!is_bare_file_name("/tmp/x.png"));
        assert!(!is_bare_file_name("a/b.png"));
        assert!(!is_bare_file_name(""));
    }

    #[test]
    fn test_rejects_bad_fraction() {
        let config = PrepareConfig {
            val_fraction: 1.5,
            ..PrepareConfig::new(vec![PathBuf::from("imgs")], "out")
        };
        assert!(DatasetPreparer::new(config).is_err());
    }
}
