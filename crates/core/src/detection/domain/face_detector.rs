use crate::detection::domain::detection_error::DetectionError;
use crate::shared::face::DetectedFace;
use crate::shared::frame::Frame;

/// Domain interface for blocking face detection.
///
/// Implementations may hold non-reentrant native state (model sessions),
/// hence `&mut self`. Faces are returned dominant first.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectedFace>, DetectionError>;
}
