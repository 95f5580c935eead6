use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::detection::domain::async_face_detector::{AsyncFaceDetector, PendingDetection};
use crate::detection::domain::detection_error::DetectionError;
use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::constants::SHUTDOWN_GRACE_MS;
use crate::shared::face::DetectionResult;
use crate::shared::frame::Frame;

type Reply = Sender<Result<DetectionResult, DetectionError>>;

/// Runs a blocking [`FaceDetector`] on a dedicated thread and exposes it as
/// an [`AsyncFaceDetector`].
///
/// The wrapped detector is only ever touched by its own thread, so the
/// underlying model session is never entered twice. Dropping it waits a
/// bounded time for the current detection; a detector that never returns
/// is left running detached.
pub struct ThreadedFaceDetector {
    job_tx: Option<Sender<(Arc<Frame>, Reply)>>,
    handle: Option<JoinHandle<()>>,
    /// Disconnects when the detector thread exits.
    exited_rx: Receiver<()>,
    shutdown_grace: Duration,
}

impl ThreadedFaceDetector {
    pub fn new(detector: Box<dyn FaceDetector>) -> Self {
        Self::with_shutdown_grace(detector, Duration::from_millis(SHUTDOWN_GRACE_MS))
    }

    pub fn with_shutdown_grace(mut detector: Box<dyn FaceDetector>, grace: Duration) -> Self {
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<(Arc<Frame>, Reply)>();
        let (exited_tx, exited_rx) = crossbeam_channel::bounded::<()>(0);
        let handle = std::thread::spawn(move || {
            let _exited = exited_tx;
            for (frame, reply) in job_rx {
                let result = detector.detect(&frame).map(DetectionResult::new);
                // The submitter may have gone away; nothing to do then.
                let _ = reply.send(result);
            }
            log::debug!("Detector thread exiting");
        });
        Self {
            job_tx: Some(job_tx),
            handle: Some(handle),
            exited_rx,
            shutdown_grace: grace,
        }
    }
}

impl AsyncFaceDetector for ThreadedFaceDetector {
    fn submit(&self, frame: Arc<Frame>) -> PendingDetection {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        match &self.job_tx {
            Some(tx) if tx.send((frame, reply_tx)).is_ok() => PendingDetection::new(reply_rx),
            _ => PendingDetection::ready(Err(DetectionError::Disconnected)),
        }
    }
}

impl Drop for ThreadedFaceDetector {
    fn drop(&mut self) {
        self.job_tx.take();
        let Some(handle) = self.handle.take() else {
            return;
        };
        match self.exited_rx.recv_timeout(self.shutdown_grace) {
            Err(RecvTimeoutError::Timeout) => {
                log::warn!(
                    "Detector still busy {}ms after shutdown; detaching its thread",
                    self.shutdown_grace.as_millis()
                );
            }
            _ => {
                if handle.join().is_err() {
                    log::error!("Detector thread panicked");
                }
            }
        }
    }
}
