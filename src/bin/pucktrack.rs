//! pucktrack command-line entry point.
//!
//! `track` runs the tracker over a directory of frames; `prepare-dataset`
//! turns point labels into a YOLO training set.

use std::ops::ControlFlow;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use pucktrack_rs::dataset::{DatasetPreparer, PrepareConfig};
use pucktrack_rs::tracker::ShortTermConfig;
use pucktrack_rs::{EstimatorKind, ImageSequence, TrackerConfig, TrackerPipeline, draw_tracking};

#[derive(Parser)]
#[command(name = "pucktrack", version, about = "Real-time hockey puck tracker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Track the puck through a directory of frames
    Track(TrackArgs),
    /// Build a YOLO dataset from point labels
    PrepareDataset(PrepareArgs),
}

#[derive(Args)]
struct TrackArgs {
    /// Directory of frames, processed in file-name order
    #[arg(long)]
    frames: PathBuf,

    /// Write annotated frames here
    #[arg(long)]
    output: Option<PathBuf>,

    /// JSON tracker configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Detector model; overrides the configuration
    #[arg(long)]
    model: Option<PathBuf>,

    /// State estimator; overrides the configuration
    #[arg(long, value_enum)]
    estimator: Option<EstimatorKind>,

    /// Follow the puck with the short-term tracker between detections
    #[arg(long)]
    lock: bool,

    /// Stop after this many frames
    #[arg(long)]
    max_frames: Option<u64>,
}

#[derive(Args)]
struct PrepareArgs {
    /// Labels JSON produced by the labeling tool
    #[arg(long)]
    labels: PathBuf,

    /// Image directories, searched in order
    #[arg(long = "images", required = true, num_args = 1..)]
    image_dirs: Vec<PathBuf>,

    /// Dataset output directory
    #[arg(long)]
    output: PathBuf,

    #[arg(long, default_value_t = 0.2)]
    val_fraction: f64,

    /// Shuffle seed for a reproducible split
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Track(args) => track(args),
        Commands::PrepareDataset(args) => prepare_dataset(args),
    }
}

fn track(args: TrackArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => TrackerConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TrackerConfig::default(),
    };
    if args.model.is_some() {
        config.model_path = args.model;
    }
    if let Some(estimator) = args.estimator {
        config.estimator = estimator;
    }
    if args.lock && config.short_term_tracker.is_none() {
        config.short_term_tracker = Some(ShortTermConfig::default());
    }

    if let Some(dir) = &args.output {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let source = ImageSequence::open(&args.frames)
        .with_context(|| format!("opening frames in {}", args.frames.display()))?;
    let mut pipeline = TrackerPipeline::with_config(source, config)?;

    let mut frame_index = 0u64;
    let mut detected = 0u64;
    let mut write_error = None;
    let processed = pipeline.run(|mut frame, result, history| {
        frame_index += 1;
        if result.is_detected() {
            detected += 1;
        }
        tracing::info!(
            frame = frame_index,
            center = ?result.center,
            prediction = ?result.prediction,
            "tracked"
        );

        if let Some(dir) = &args.output {
            draw_tracking(&mut frame, result, history);
            let path = dir.join(format!("frame_{frame_index:06}.png"));
            if let Err(e) = frame.save(&path) {
                write_error = Some(anyhow::Error::new(e).context(format!("writing {}", path.display())));
                return ControlFlow::Break(());
            }
        }

        match args.max_frames {
            Some(max) if frame_index >= max => ControlFlow::Break(()),
            _ => ControlFlow::Continue(()),
        }
    })?;

    if let Some(e) = write_error {
        return Err(e);
    }
    tracing::info!(processed, detected, "tracking finished");
    Ok(())
}

fn prepare_dataset(args: PrepareArgs) -> anyhow::Result<()> {
    let config = PrepareConfig {
        val_fraction: args.val_fraction,
        seed: args.seed,
        ..PrepareConfig::new(args.image_dirs, args.output)
    };
    let report = DatasetPreparer::new(config)?
        .prepare_from_file(&args.labels)
        .with_context(|| format!("preparing dataset from {}", args.labels.display()))?;
    println!(
        "train: {}  val: {}  annotations: {}  skipped: {} invalid, {} missing, {} unreadable, {} rejected",
        report.train,
        report.val,
        report.annotations,
        report.invalid,
        report.missing,
        report.unreadable,
        report.rejected
    );
    Ok(())
}
