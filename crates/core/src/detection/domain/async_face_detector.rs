use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::detection::domain::detection_error::DetectionError;
use crate::shared::face::DetectionResult;
use crate::shared::frame::Frame;

/// Asynchronous face detection capability.
///
/// `submit` returns immediately; the result arrives later through the
/// returned [`PendingDetection`]. Callers must not have two submissions
/// outstanding at once.
pub trait AsyncFaceDetector: Send + Sync {
    fn submit(&self, frame: Arc<Frame>) -> PendingDetection;
}

/// One-shot handle to a detection that has been submitted but may not have
/// finished yet.
pub struct PendingDetection {
    rx: Receiver<Result<DetectionResult, DetectionError>>,
}

impl PendingDetection {
    pub fn new(rx: Receiver<Result<DetectionResult, DetectionError>>) -> Self {
        Self { rx }
    }

    /// A detection that has already finished.
    pub fn ready(result: Result<DetectionResult, DetectionError>) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let _ = tx.send(result);
        Self { rx }
    }

    /// Block the calling (completion) thread until the result arrives.
    pub fn wait(self) -> Result<DetectionResult, DetectionError> {
        self.rx.recv().map_err(|_| DetectionError::Disconnected)?
    }

    /// Like [`wait`](Self::wait) but gives the handle back on timeout.
    pub fn wait_timeout(
        self,
        timeout: Duration,
    ) -> Result<Result<DetectionResult, DetectionError>, PendingDetection> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => Ok(result),
            Err(RecvTimeoutError::Disconnected) => Ok(Err(DetectionError::Disconnected)),
            Err(RecvTimeoutError::Timeout) => Err(self),
        }
    }
}
