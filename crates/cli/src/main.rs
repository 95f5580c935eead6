use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::Parser;

use eyeguard_core::alert::domain::alert_controller::AlertController;
use eyeguard_core::alert::infrastructure::log_notification_sink::LogNotificationSink;
use eyeguard_core::calibration::domain::profile_store::ProfileStore;
use eyeguard_core::capture::infrastructure::image_sequence_source::{
    load_frame, ImageSequenceSource,
};
use eyeguard_core::detection::domain::async_face_detector::AsyncFaceDetector;
use eyeguard_core::detection::infrastructure::onnx_yolo_detector::OnnxYoloDetector;
use eyeguard_core::detection::infrastructure::threaded_face_detector::ThreadedFaceDetector;
use eyeguard_core::overlay::infrastructure::png_overlay_renderer::PngOverlayRenderer;
use eyeguard_core::overlay::infrastructure::shared_overlay::SharedOverlay;
use eyeguard_core::pipeline::proximity_pipeline::ProximityPipeline;
use eyeguard_core::shared::constants::{YOLO_MODEL_NAME, YOLO_MODEL_URL};
use eyeguard_core::shared::model_resolver;
use eyeguard_core::shared::settings::PipelineSettings;

/// Warns when a face gets closer to the screen than a calibrated reference.
#[derive(Parser)]
#[command(name = "eyeguard")]
struct Cli {
    /// Directory of camera frames (images), replayed in file-name order.
    #[arg(long)]
    frames: PathBuf,

    /// Image of the face at a comfortable distance (required unless --preview is used).
    #[arg(long)]
    reference: Option<PathBuf>,

    /// Write annotated preview images to this directory instead of monitoring.
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Settings file (JSON). Defaults to the user config directory.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// Milliseconds between sampled frames.
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Milliseconds a shown warning stays active.
    #[arg(long)]
    alert_timeout_ms: Option<u64>,

    /// Directory holding a bundled detection model.
    #[arg(long)]
    model_dir: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;
    let settings = load_settings(&cli)?;
    validate_settings(&settings)?;

    let detector = build_detector(&cli, &settings)?;
    let store = Arc::new(ProfileStore::new());
    let sink = Arc::new(LogNotificationSink::new());
    let alerts = Arc::new(AlertController::with_timeout(
        sink.clone(),
        settings.warning_message.clone(),
        settings.alert_timeout(),
    ));

    if let Some(preview_dir) = &cli.preview {
        let renderer = Arc::new(PngOverlayRenderer::new(preview_dir)?);
        let pipeline =
            ProximityPipeline::start(detector, store, alerts, renderer.clone(), &settings);
        run_frames(&pipeline, &cli.frames, &settings)?;
        log::info!(
            "Saved {} preview images to {}",
            renderer.written(),
            preview_dir.display()
        );
    } else {
        let reference = cli
            .reference
            .as_deref()
            .ok_or("Reference image is required unless --preview is used")?;
        let overlay = Arc::new(SharedOverlay::new());
        let pipeline = ProximityPipeline::start(detector, store, alerts, overlay, &settings);
        calibrate(&pipeline, reference, &settings)?;
        run_frames(&pipeline, &cli.frames, &settings)?;
        log::info!("Showed {} proximity warnings", sink.shown_count());
    }

    Ok(())
}

fn calibrate(
    pipeline: &ProximityPipeline,
    reference: &Path,
    settings: &PipelineSettings,
) -> Result<(), Box<dyn std::error::Error>> {
    pipeline.start_calibration()?;
    let frame = load_frame(reference, settings.frame_metadata(), 0)?;
    pipeline.publish(frame);
    let baseline = pipeline
        .commit_calibration()
        .map_err(|e| format!("Calibration with {} failed: {e}", reference.display()))?;
    log::info!(
        "Calibrated: face {}x{} (area {})",
        baseline.width(),
        baseline.height(),
        baseline.area()
    );
    Ok(())
}

fn run_frames(
    pipeline: &Arc<ProximityPipeline>,
    frames: &Path,
    settings: &PipelineSettings,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = ImageSequenceSource::from_dir(frames, settings.frame_metadata())?;
    log::info!("Replaying {} frames from {}", source.len(), frames.display());

    let pump = pipeline.attach_source(Box::new(source), settings.sampling_interval())?;
    let published = pump.join();
    if !pipeline.wait_idle(settings.calibration_timeout()) {
        log::warn!("Detection still running after the last frame; stopping anyway");
    }
    pipeline.stop();

    log::debug!("Published {published} frames in {} mode", pipeline.mode());
    if let Some(summary) = pipeline.stats_summary() {
        log::info!("{summary}");
    }
    Ok(())
}

fn load_settings(cli: &Cli) -> Result<PipelineSettings, Box<dyn std::error::Error>> {
    let mut settings = match &cli.config {
        Some(path) => PipelineSettings::load_from(path)?,
        None => PipelineSettings::load(),
    };
    if let Some(confidence) = cli.confidence {
        settings.confidence = confidence;
    }
    if let Some(interval) = cli.interval_ms {
        settings.sampling_interval_ms = interval;
    }
    if let Some(timeout) = cli.alert_timeout_ms {
        settings.alert_timeout_ms = timeout;
    }
    Ok(settings)
}

fn build_detector(
    cli: &Cli,
    settings: &PipelineSettings,
) -> Result<Arc<dyn AsyncFaceDetector>, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {YOLO_MODEL_NAME}");
    let model_path = model_resolver::resolve(
        YOLO_MODEL_NAME,
        YOLO_MODEL_URL,
        cli.model_dir.as_deref(),
        Some(Box::new(download_progress)),
    )?;
    eprintln!();

    let onnx = OnnxYoloDetector::new(&model_path, settings.confidence)?;
    Ok(Arc::new(ThreadedFaceDetector::new(Box::new(onnx))))
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.frames.is_dir() {
        return Err(format!("Frames directory not found: {}", cli.frames.display()).into());
    }
    match (&cli.reference, &cli.preview) {
        (None, None) => {
            return Err("Reference image is required unless --preview is used".into());
        }
        (Some(reference), _) if !reference.exists() => {
            return Err(format!("Reference image not found: {}", reference.display()).into());
        }
        _ => {}
    }
    if let Some(config) = &cli.config {
        if !config.exists() {
            return Err(format!("Settings file not found: {}", config.display()).into());
        }
    }
    Ok(())
}

fn validate_settings(settings: &PipelineSettings) -> Result<(), Box<dyn std::error::Error>> {
    if !(0.0..=1.0).contains(&settings.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            settings.confidence
        )
        .into());
    }
    if settings.sampling_interval_ms == 0 {
        return Err("Sampling interval must be at least 1 ms".into());
    }
    if settings.alert_timeout_ms == 0 {
        return Err("Alert timeout must be at least 1 ms".into());
    }
    if settings.frame_width == 0 || settings.frame_height == 0 {
        return Err(format!(
            "Frame size must be non-zero, got {}x{}",
            settings.frame_width, settings.frame_height
        )
        .into());
    }
    if settings.frame_width % 2 != 0 || settings.frame_height % 2 != 0 {
        return Err(format!(
            "Frame size must be even for NV21, got {}x{}",
            settings.frame_width, settings.frame_height
        )
        .into());
    }
    if ![0, 90, 180, 270].contains(&settings.rotation) {
        return Err(format!(
            "Rotation must be 0, 90, 180 or 270, got {}",
            settings.rotation
        )
        .into());
    }
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
}
