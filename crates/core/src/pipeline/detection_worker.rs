use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};

use crate::alert::domain::alert_controller::AlertController;
use crate::calibration::domain::comparison_engine::{ComparisonEngine, ProximityVerdict};
use crate::calibration::domain::profile_store::ProfileStore;
use crate::detection::domain::async_face_detector::{AsyncFaceDetector, PendingDetection};
use crate::detection::domain::detection_error::DetectionError;
use crate::overlay::domain::overlay_renderer::{Drawable, OverlayRenderer};
use crate::pipeline::mode::{Mode, ModeCell};
use crate::pipeline::pipeline_stats::PipelineStats;
use crate::pipeline::single_slot_channel::SingleSlotFrameChannel;
use crate::shared::face::DetectionResult;
use crate::shared::constants::SHUTDOWN_GRACE_MS;
use crate::shared::frame::Frame;
use crate::shared::nv21;

/// State shared by the pipeline facade, the worker thread and the
/// completion thread.
pub struct WorkerContext {
    mode: ModeCell,
    active: AtomicBool,
    /// Set while a detection is submitted and not yet delivered.
    in_flight: AtomicBool,
    /// Frames published and not yet dropped or fully processed.
    outstanding: AtomicUsize,
    /// Number of baselines stored by this pipeline.
    calibrations: AtomicU64,
    idle_lock: Mutex<()>,
    idle: Condvar,
    stats: PipelineStats,
    store: Arc<ProfileStore>,
    alerts: Arc<AlertController>,
    overlay: Arc<dyn OverlayRenderer>,
    engine: ComparisonEngine,
}

impl WorkerContext {
    pub fn new(
        mode: Mode,
        store: Arc<ProfileStore>,
        alerts: Arc<AlertController>,
        overlay: Arc<dyn OverlayRenderer>,
    ) -> Self {
        Self {
            mode: ModeCell::new(mode),
            active: AtomicBool::new(true),
            in_flight: AtomicBool::new(false),
            outstanding: AtomicUsize::new(0),
            calibrations: AtomicU64::new(0),
            idle_lock: Mutex::new(()),
            idle: Condvar::new(),
            stats: PipelineStats::new(),
            store,
            alerts,
            overlay,
            engine: ComparisonEngine::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode.get()
    }

    /// Returns the previous mode.
    pub fn set_mode(&self, mode: Mode) -> Mode {
        self.mode.set(mode)
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Mark the pipeline inactive and wake idle waiters. Returns `false`
    /// if it already was.
    pub fn deactivate(&self) -> bool {
        let _guard = self.idle_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let was_active = self.active.swap(false, Ordering::AcqRel);
        self.idle.notify_all();
        was_active
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn calibrations(&self) -> u64 {
        self.calibrations.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    pub fn alerts(&self) -> &AlertController {
        &self.alerts
    }

    /// Count a frame about to enter the mailbox.
    pub fn frame_entered(&self) {
        self.outstanding.fetch_add(1, Ordering::AcqRel);
    }

    /// Count a frame that left without a detection.
    pub fn frame_left(&self) {
        let _guard = self.idle_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.outstanding.fetch_sub(1, Ordering::AcqRel);
        self.idle.notify_all();
    }

    /// No detection in flight and, unless stopped, no frame waiting.
    pub fn is_idle(&self) -> bool {
        !self.is_in_flight()
            && (self.outstanding.load(Ordering::Acquire) == 0 || !self.is_active())
    }

    /// Wait until `done` holds, re-checking after every frame leaves.
    /// Returns whether it held before the timeout.
    pub fn wait_until(&self, timeout: Duration, done: impl Fn(&Self) -> bool) -> bool {
        let guard = self.idle_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (_guard, _) = self
            .idle
            .wait_timeout_while(guard, timeout, |_| !done(self))
            .unwrap_or_else(PoisonError::into_inner);
        done(self)
    }

    fn try_begin_detection(&self) -> bool {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn finish_detection(&self) {
        let _guard = self.idle_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.in_flight.store(false, Ordering::Release);
        self.outstanding.fetch_sub(1, Ordering::AcqRel);
        self.idle.notify_all();
    }

    /// Route a finished detection according to the current mode.
    fn deliver(&self, frame: &Frame, outcome: Result<DetectionResult, DetectionError>) {
        if !self.is_active() {
            self.stats.record_discarded();
            log::debug!("Ignoring detection for frame {} after shutdown", frame.index());
            return;
        }
        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                self.stats.record_failure();
                log::warn!("Face detection failed on frame {}: {e}", frame.index());
                return;
            }
        };
        self.stats.record_completed();

        match self.mode() {
            Mode::Monitoring => self.monitor(&result),
            Mode::Calibrating => {
                if self.store.calibrate(&result).is_some() {
                    self.calibrations.fetch_add(1, Ordering::AcqRel);
                } else {
                    log::debug!("No face in calibration frame {}", frame.index());
                }
            }
            Mode::Previewing => self.preview(frame, &result),
        }
    }

    fn monitor(&self, result: &DetectionResult) {
        match self.engine.evaluate(result, &self.store) {
            Ok(ProximityVerdict::TooClose) => self.alerts.report_too_close(),
            Ok(ProximityVerdict::Clear) => self.alerts.report_clear(),
            Ok(ProximityVerdict::Undetermined) => {}
            Err(e) => log::debug!("Skipping comparison: {e}"),
        }
    }

    fn preview(&self, frame: &Frame, result: &DetectionResult) {
        self.overlay.clear();
        self.overlay
            .add_drawable(Drawable::CameraImage(nv21::to_upright_rgb(frame)));
        for face in result.faces() {
            self.overlay.add_drawable(Drawable::Face(face.clone()));
        }
        self.overlay.redraw();
    }
}

/// How often the completion thread re-checks for shutdown while a detection
/// runs.
const COMPLETION_POLL_MS: u64 = 50;

struct Submission {
    frame: Arc<Frame>,
    pending: PendingDetection,
}

/// Consumer side of the pipeline: a worker thread that drains the mailbox
/// and submits detections, and a completion thread that awaits and routes
/// their results in submission order.
pub struct DetectionWorker {
    worker: Option<JoinHandle<()>>,
    completion: Option<JoinHandle<()>>,
}

impl DetectionWorker {
    pub fn spawn(
        channel: Arc<SingleSlotFrameChannel>,
        detector: Arc<dyn AsyncFaceDetector>,
        ctx: Arc<WorkerContext>,
    ) -> Self {
        let (done_tx, done_rx) = crossbeam_channel::unbounded::<Submission>();
        let worker = spawn_worker(channel, detector, ctx.clone(), done_tx);
        let completion = spawn_completion(ctx, done_rx);
        Self {
            worker: Some(worker),
            completion: Some(completion),
        }
    }

    /// Wait for both threads. The mailbox must already be shut down.
    pub fn join(&mut self) {
        for (name, handle) in [
            ("worker", self.worker.take()),
            ("completion", self.completion.take()),
        ] {
            if let Some(handle) = handle {
                if handle.join().is_err() {
                    log::error!("Detection {name} thread panicked");
                }
            }
        }
    }
}

fn spawn_worker(
    channel: Arc<SingleSlotFrameChannel>,
    detector: Arc<dyn AsyncFaceDetector>,
    ctx: Arc<WorkerContext>,
    done_tx: Sender<Submission>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        while let Some(frame) = channel.take() {
            if !ctx.try_begin_detection() {
                ctx.stats.record_dropped_in_flight();
                log::debug!("Detector busy, dropping frame {}", frame.index());
                ctx.frame_left();
                continue;
            }
            let frame = Arc::new(frame);
            let pending = detector.submit(Arc::clone(&frame));
            ctx.stats.record_submitted();
            if done_tx.send(Submission { frame, pending }).is_err() {
                ctx.finish_detection();
                break;
            }
        }
        log::debug!("Detection worker exiting");
    })
}

fn spawn_completion(ctx: Arc<WorkerContext>, done_rx: Receiver<Submission>) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let grace = Duration::from_millis(SHUTDOWN_GRACE_MS);
        for Submission { frame, pending } in done_rx {
            match await_detection(&ctx, pending, grace) {
                Some(outcome) => ctx.deliver(&frame, outcome),
                None => {
                    ctx.stats.record_discarded();
                    log::warn!(
                        "Detection for frame {} still running {}ms after shutdown; abandoning it",
                        frame.index(),
                        grace.as_millis()
                    );
                }
            }
            ctx.finish_detection();
        }
        log::debug!("Detection completion thread exiting");
    })
}

/// Wait for a detection while the pipeline is active, and at most `grace`
/// once it is not. `None` means the detection was abandoned.
fn await_detection(
    ctx: &WorkerContext,
    mut pending: PendingDetection,
    grace: Duration,
) -> Option<Result<DetectionResult, DetectionError>> {
    let poll = Duration::from_millis(COMPLETION_POLL_MS);
    let mut deadline: Option<Instant> = None;
    loop {
        let wait = match deadline {
            Some(deadline) => deadline.saturating_duration_since(Instant::now()).min(poll),
            None => poll,
        };
        match pending.wait_timeout(wait) {
            Ok(outcome) => return Some(outcome),
            Err(still_pending) => pending = still_pending,
        }
        if ctx.is_active() {
            continue;
        }
        match deadline {
            Some(deadline) if Instant::now() >= deadline => return None,
            Some(_) => {}
            None => deadline = Some(Instant::now() + grace),
        }
    }
}
