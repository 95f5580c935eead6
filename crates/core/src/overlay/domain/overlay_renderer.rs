use image::RgbImage;

use crate::shared::face::DetectedFace;

/// One element of the preview overlay.
#[derive(Clone, Debug, PartialEq)]
pub enum Drawable {
    /// Upright camera image, drawn beneath everything else.
    CameraImage(RgbImage),
    Face(DetectedFace),
}

/// Preview surface fed by the detection completion thread.
///
/// Implementations synchronize internally: a draw pass on another thread
/// must never observe a half-built drawable list.
pub trait OverlayRenderer: Send + Sync {
    fn clear(&self);
    fn add_drawable(&self, drawable: Drawable);
    /// Publish everything added since the last `clear` to the draw pass.
    fn redraw(&self);
}
