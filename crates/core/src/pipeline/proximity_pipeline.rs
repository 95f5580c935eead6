use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;

use crate::alert::domain::alert_controller::AlertController;
use crate::calibration::domain::face_profile::FaceProfile;
use crate::calibration::domain::profile_store::{NoBaselineError, ProfileStore};
use crate::capture::domain::capture_error::CaptureError;
use crate::capture::domain::frame_source::{FramePublisher, FrameSource};
use crate::capture::infrastructure::frame_pump::FramePump;
use crate::detection::domain::async_face_detector::AsyncFaceDetector;
use crate::overlay::domain::overlay_renderer::OverlayRenderer;
use crate::pipeline::detection_worker::{DetectionWorker, WorkerContext};
use crate::pipeline::mode::Mode;
use crate::pipeline::pipeline_stats::StatsSnapshot;
use crate::pipeline::single_slot_channel::{PublishOutcome, SingleSlotFrameChannel};
use crate::shared::frame::Frame;
use crate::shared::settings::PipelineSettings;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("no calibrated baseline; run calibration first")]
    NoBaseline,
    #[error("pipeline has been stopped")]
    Stopped,
    #[error("calibration did not finish within {0:?}")]
    CalibrationTimeout(Duration),
    #[error(transparent)]
    Capture(#[from] CaptureError),
}

impl From<NoBaselineError> for PipelineError {
    fn from(_: NoBaselineError) -> Self {
        PipelineError::NoBaseline
    }
}

/// Frame-to-alert pipeline.
///
/// Frames go through a keep-latest mailbox to a single detection worker;
/// finished detections are routed by [`Mode`] to calibration, proximity
/// monitoring or the preview overlay. Starts in [`Mode::Previewing`].
pub struct ProximityPipeline {
    channel: Arc<SingleSlotFrameChannel>,
    ctx: Arc<WorkerContext>,
    worker: Mutex<DetectionWorker>,
    alerts: Arc<AlertController>,
    calibration_timeout: Duration,
    /// Baselines stored before the current calibration began.
    calibration_mark: Mutex<u64>,
}

impl ProximityPipeline {
    pub fn start(
        detector: Arc<dyn AsyncFaceDetector>,
        store: Arc<ProfileStore>,
        alerts: Arc<AlertController>,
        overlay: Arc<dyn OverlayRenderer>,
        settings: &PipelineSettings,
    ) -> Arc<Self> {
        let channel = Arc::new(SingleSlotFrameChannel::new());
        let ctx = Arc::new(WorkerContext::new(
            Mode::Previewing,
            store,
            alerts.clone(),
            overlay,
        ));
        let worker = DetectionWorker::spawn(channel.clone(), detector, ctx.clone());
        log::info!("Pipeline started in {} mode", Mode::Previewing);

        Arc::new(Self {
            channel,
            ctx,
            worker: Mutex::new(worker),
            alerts,
            calibration_timeout: settings.calibration_timeout(),
            calibration_mark: Mutex::new(0),
        })
    }

    /// Hand a frame to the detection worker without blocking. Returns
    /// `false` once the pipeline has stopped.
    pub fn publish(&self, frame: Frame) -> bool {
        if !self.ctx.is_active() {
            return false;
        }
        self.ctx.frame_entered();
        match self.channel.publish(frame) {
            PublishOutcome::Stored => {
                self.ctx.stats().record_published();
                true
            }
            PublishOutcome::Replaced => {
                self.ctx.stats().record_published();
                self.ctx.stats().record_overwritten();
                self.ctx.frame_left();
                true
            }
            PublishOutcome::Closed => {
                self.ctx.frame_left();
                false
            }
        }
    }

    /// Sample `source` every `interval` into this pipeline.
    pub fn attach_source(
        self: &Arc<Self>,
        source: Box<dyn FrameSource>,
        interval: Duration,
    ) -> Result<FramePump, PipelineError> {
        self.ensure_running()?;
        let publisher: Arc<dyn FramePublisher> = self.clone();
        Ok(FramePump::start(source, publisher, interval)?)
    }

    pub fn start_preview(&self) -> Result<(), PipelineError> {
        self.switch_mode(Mode::Previewing)
    }

    /// Capture the next detected face as the new baseline.
    pub fn start_calibration(&self) -> Result<(), PipelineError> {
        *self.lock_mark() = self.ctx.calibrations();
        self.switch_mode(Mode::Calibrating)
    }

    /// Finish calibration and begin monitoring against the stored baseline.
    ///
    /// Waits for any pending calibration detection first, bounded by the
    /// configured calibration timeout.
    pub fn commit_calibration(&self) -> Result<FaceProfile, PipelineError> {
        self.ensure_running()?;
        let mark = *self.lock_mark();
        let settled = self.ctx.wait_until(self.calibration_timeout, |ctx| {
            !ctx.is_in_flight() && (ctx.is_idle() || ctx.calibrations() > mark)
        });
        if !settled {
            return Err(PipelineError::CalibrationTimeout(self.calibration_timeout));
        }
        self.ensure_running()?;

        let baseline = self.ctx.store().get_baseline()?;
        self.switch_mode(Mode::Monitoring)?;
        Ok(baseline)
    }

    /// Monitor against a baseline calibrated earlier.
    pub fn start_monitoring(&self) -> Result<FaceProfile, PipelineError> {
        self.ensure_running()?;
        let baseline = self.ctx.store().get_baseline()?;
        self.switch_mode(Mode::Monitoring)?;
        Ok(baseline)
    }

    /// Shut down the mailbox, give an in-flight detection a short grace
    /// period to finish without effect and join the worker threads.
    /// Idempotent.
    pub fn stop(&self) {
        if !self.ctx.deactivate() {
            return;
        }
        self.channel.shutdown();
        self.worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .join();
        self.alerts.report_clear();
        log::info!("Pipeline stopped");
    }

    /// Wait until no frame is pending and no detection is in flight.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.ctx.wait_until(timeout, WorkerContext::is_idle)
    }

    pub fn mode(&self) -> Mode {
        self.ctx.mode()
    }

    pub fn is_running(&self) -> bool {
        self.ctx.is_active()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.ctx.stats().snapshot()
    }

    pub fn stats_summary(&self) -> Option<String> {
        self.ctx.stats().summary_string()
    }

    fn switch_mode(&self, mode: Mode) -> Result<(), PipelineError> {
        self.ensure_running()?;
        let previous = self.ctx.set_mode(mode);
        if previous == Mode::Monitoring && mode != Mode::Monitoring {
            self.alerts.report_clear();
        }
        if previous != mode {
            log::info!("Switched from {previous} to {mode} mode");
        }
        Ok(())
    }

    fn ensure_running(&self) -> Result<(), PipelineError> {
        if self.ctx.is_active() {
            Ok(())
        } else {
            Err(PipelineError::Stopped)
        }
    }

    fn lock_mark(&self) -> std::sync::MutexGuard<'_, u64> {
        self.calibration_mark
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl FramePublisher for ProximityPipeline {
    fn publish(&self, frame: Frame) -> bool {
        ProximityPipeline::publish(self, frame)
    }
}

impl Drop for ProximityPipeline {
    fn drop(&mut self) {
        self.stop();
    }
}
