use crate::capture::domain::capture_error::CaptureError;
use crate::shared::frame::{Frame, FrameMetadata};

/// Produces camera frames for the pipeline.
///
/// Device acquisition lives behind this port; the pipeline only sees
/// frames and their fixed geometry.
pub trait FrameSource: Send {
    /// Acquires the source and reports the geometry of the frames it yields.
    fn open(&mut self) -> Result<FrameMetadata, CaptureError>;

    /// Latest available frame, or `None` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError>;

    /// Releases the underlying device or files.
    fn close(&mut self);
}

/// Receives frames from a producer. Must never block.
pub trait FramePublisher: Send + Sync {
    /// Hands over a frame; returns `false` once the receiver is shut down.
    fn publish(&self, frame: Frame) -> bool;
}
