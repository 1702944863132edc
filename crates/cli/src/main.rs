use std::io;
use std::path::PathBuf;
use std::process;

use clap::Parser;

use handmark_core::detection::domain::detector_config::DetectorConfig;
use handmark_core::detection::domain::hand_detector::HandDetector;
use handmark_core::detection::infrastructure::onnx_hand_landmarker::OnnxHandLandmarker;
use handmark_core::pipeline::frame_processor::{DetectorErrorPolicy, FrameProcessor};
use handmark_core::pipeline::stream_hands_use_case::StreamHandsUseCase;
use handmark_core::pipeline::worker_logger::LogWorkerLogger;
use handmark_core::shared::constants::{
    DEFAULT_MAX_HANDS, LANDMARK_MODEL_NAME, PALM_MODEL_NAME,
};
use handmark_core::shared::model_resolver::{self, ModelSearch};

/// Hand landmark worker.
///
/// Reads length-prefixed encoded images from stdin and writes one JSON line
/// of detected hands per image to stdout. Logs go to stderr (see RUST_LOG).
#[derive(Parser)]
#[command(name = "handmark-worker")]
struct Cli {
    /// Directory searched first for model files.
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Palm detection model file name.
    #[arg(long, default_value = PALM_MODEL_NAME)]
    palm_model: String,

    /// Hand landmark model file name.
    #[arg(long, default_value = LANDMARK_MODEL_NAME)]
    landmark_model: String,

    /// Base URL to download missing models from (into the user cache).
    #[arg(long)]
    model_url: Option<String>,

    /// Maximum number of hands reported per image.
    #[arg(long, default_value_t = DEFAULT_MAX_HANDS)]
    max_hands: usize,

    /// Minimum palm detection confidence (0.0-1.0).
    #[arg(long, default_value = "0.5")]
    min_detection_confidence: f32,

    /// Minimum hand presence confidence (0.0-1.0).
    #[arg(long, default_value = "0.5")]
    min_presence_confidence: f32,

    /// Minimum tracking confidence (0.0-1.0); unused for independent images.
    #[arg(long, default_value = "0.5")]
    min_tracking_confidence: f32,

    /// What to do when inference fails on a decoded image: fail or skip.
    #[arg(long, default_value = "fail")]
    on_detector_error: String,

    /// Log a progress line every N frames (debug level).
    #[arg(long, default_value = "100")]
    progress_every: u64,
}

fn main() {
    env_logger::init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = detector_config(&cli);
    let policy = validate(&cli, &config)?;

    let detector = build_detector(&cli, &config)?;
    let processor = FrameProcessor::new(detector, policy);

    let stdin = io::stdin().lock();
    let stdout = io::stdout().lock();
    let mut use_case = StreamHandsUseCase::new(
        stdin,
        stdout,
        processor,
        Box::new(LogWorkerLogger::new(cli.progress_every)),
    );

    log::info!("Waiting for frames on stdin");
    let summary = use_case.execute()?;
    log::info!("Processed {} frames, exiting", summary.frames);
    Ok(())
}

fn detector_config(cli: &Cli) -> DetectorConfig {
    DetectorConfig {
        max_hands: cli.max_hands,
        min_detection_confidence: cli.min_detection_confidence,
        min_presence_confidence: cli.min_presence_confidence,
        min_tracking_confidence: cli.min_tracking_confidence,
    }
}

fn validate(
    cli: &Cli,
    config: &DetectorConfig,
) -> Result<DetectorErrorPolicy, Box<dyn std::error::Error>> {
    config.validate()?;
    if let Some(dir) = &cli.model_dir {
        if !dir.is_dir() {
            return Err(format!("Model directory not found: {}", dir.display()).into());
        }
    }
    let policy = cli.on_detector_error.parse::<DetectorErrorPolicy>()?;
    Ok(policy)
}

/// Resolve both model files before any frame is read; a missing model is
/// a startup failure.
fn build_detector(
    cli: &Cli,
    config: &DetectorConfig,
) -> Result<Box<dyn HandDetector>, Box<dyn std::error::Error>> {
    let search = ModelSearch::standard()
        .with_model_dir(cli.model_dir.clone())
        .with_base_url(cli.model_url.clone());

    let palm_path = resolve_model(&cli.palm_model, &search)?;
    let landmark_path = resolve_model(&cli.landmark_model, &search)?;

    log::info!(
        "Loading hand models: {} + {}",
        palm_path.display(),
        landmark_path.display()
    );
    let detector = OnnxHandLandmarker::new(&palm_path, &landmark_path, config)?;
    Ok(Box::new(detector))
}

fn resolve_model(name: &str, search: &ModelSearch) -> Result<PathBuf, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {name}");
    let path = model_resolver::resolve(name, search, Some(Box::new(download_progress)))?;
    Ok(path)
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading hand model... {pct}%");
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\rDownloading hand model... {downloaded} bytes");
    }
}
