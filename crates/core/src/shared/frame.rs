use std::time::Instant;

use ndarray::ArrayView2;

use crate::capture::domain::capture_error::CaptureError;

/// Geometry of a camera frame as delivered by the capture source.
///
/// `rotation` is the clockwise rotation in degrees (0, 90, 180 or 270)
/// needed to bring the image upright.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameMetadata {
    pub width: u32,
    pub height: u32,
    pub rotation: u32,
}

impl FrameMetadata {
    pub fn new(width: u32, height: u32, rotation: u32) -> Self {
        Self {
            width,
            height,
            rotation,
        }
    }

    /// Byte length of an NV21 buffer with these dimensions.
    pub fn nv21_len(&self) -> usize {
        let luma = self.width as usize * self.height as usize;
        luma + luma / 2
    }
}

/// A single camera frame: NV21 bytes (full-resolution Y plane followed by
/// interleaved V/U at quarter resolution).
///
/// Frames are never mutated after capture. The pipeline moves them by value
/// from producer to consumer.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    metadata: FrameMetadata,
    captured_at: Instant,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, metadata: FrameMetadata, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            metadata.nv21_len(),
            "data length must equal width * height * 3 / 2"
        );
        Self {
            data,
            metadata,
            captured_at: Instant::now(),
            index,
        }
    }

    /// Fallible constructor for buffers coming from outside the crate.
    pub fn try_new(
        data: Vec<u8>,
        metadata: FrameMetadata,
        index: usize,
    ) -> Result<Self, CaptureError> {
        if metadata.width == 0
            || metadata.height == 0
            || metadata.width % 2 != 0
            || metadata.height % 2 != 0
            || data.len() != metadata.nv21_len()
        {
            return Err(CaptureError::InvalidDimensions {
                width: metadata.width,
                height: metadata.height,
                len: data.len(),
            });
        }
        Ok(Self::new(data, metadata, index))
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn metadata(&self) -> FrameMetadata {
        self.metadata
    }

    pub fn width(&self) -> u32 {
        self.metadata.width
    }

    pub fn height(&self) -> u32 {
        self.metadata.height
    }

    pub fn rotation(&self) -> u32 {
        self.metadata.rotation
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// The Y (luma) plane as a `[height, width]` view.
    pub fn luma(&self) -> ArrayView2<'_, u8> {
        let (w, h) = (self.width() as usize, self.height() as usize);
        ArrayView2::from_shape((h, w), &self.data[..w * h])
            .expect("Frame data length must match dimensions")
    }

    /// Interleaved V/U samples following the luma plane.
    pub fn chroma(&self) -> &[u8] {
        let luma_len = self.width() as usize * self.height() as usize;
        &self.data[luma_len..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(w: u32, h: u32) -> FrameMetadata {
        FrameMetadata::new(w, h, 0)
    }

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 6]; // 2x2 NV21
        let frame = Frame::new(data.clone(), FrameMetadata::new(2, 2, 270), 5);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.rotation(), 270);
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.data(), &data[..]);
    }

    #[test]
    fn test_nv21_len() {
        assert_eq!(meta(600, 600).nv21_len(), 540_000);
        assert_eq!(meta(4, 2).nv21_len(), 12);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * 3 / 2")]
    fn test_mismatched_data_length_panics_in_debug() {
        Frame::new(vec![0u8; 5], meta(2, 2), 0);
    }

    #[test]
    fn test_try_new_rejects_wrong_length() {
        let err = Frame::try_new(vec![0u8; 10], meta(4, 4), 0).unwrap_err();
        assert!(matches!(
            err,
            CaptureError::InvalidDimensions {
                width: 4,
                height: 4,
                len: 10
            }
        ));
    }

    #[test]
    fn test_try_new_rejects_odd_dimensions() {
        assert!(Frame::try_new(vec![0u8; 13], meta(3, 3), 0).is_err());
    }

    #[test]
    fn test_try_new_accepts_valid_buffer() {
        let frame = Frame::try_new(vec![7u8; 24], meta(4, 4), 1).unwrap();
        assert_eq!(frame.index(), 1);
    }

    #[test]
    fn test_luma_shape_and_access() {
        // 4x2 frame: 8 luma bytes then 4 chroma bytes
        let mut data = vec![0u8; 12];
        data[5] = 200; // row=1, col=1
        let frame = Frame::new(data, meta(4, 2), 0);
        let luma = frame.luma();
        assert_eq!(luma.shape(), &[2, 4]);
        assert_eq!(luma[[1, 1]], 200);
        assert_eq!(frame.chroma().len(), 4);
    }

    #[test]
    fn test_captured_at_is_monotonic() {
        let a = Frame::new(vec![0u8; 6], meta(2, 2), 0);
        let b = Frame::new(vec![0u8; 6], meta(2, 2), 1);
        assert!(b.captured_at() >= a.captured_at());
    }
}
