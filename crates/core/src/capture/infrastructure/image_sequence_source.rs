use std::fs;
use std::path::{Path, PathBuf};

use crate::capture::domain::capture_error::CaptureError;
use crate::capture::domain::frame_source::FrameSource;
use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::{Frame, FrameMetadata};
use crate::shared::nv21;

/// Replays still images as camera frames.
///
/// Images are upright photos. Each is decoded with the `image` crate,
/// resized, turned into sensor orientation and encoded as NV21, so
/// downstream code sees what a camera would deliver.
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    metadata: FrameMetadata,
    cursor: usize,
    opened: bool,
}

impl ImageSequenceSource {
    pub fn new(paths: Vec<PathBuf>, metadata: FrameMetadata) -> Self {
        Self {
            paths,
            metadata,
            cursor: 0,
            opened: false,
        }
    }

    /// All images in `dir`, in file-name order.
    pub fn from_dir(dir: &Path, metadata: FrameMetadata) -> Result<Self, CaptureError> {
        let entries = fs::read_dir(dir).map_err(|e| CaptureError::Open {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| is_image(p))
            .collect();
        paths.sort();
        Ok(Self::new(paths, metadata))
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Decode one image file into a frame with the given geometry.
pub fn load_frame(path: &Path, metadata: FrameMetadata, index: usize) -> Result<Frame, CaptureError> {
    let img = image::open(path)
        .map_err(|e| CaptureError::Decode {
            path: path.to_path_buf(),
            source: e,
        })?
        .to_rgb8();
    Ok(nv21::frame_from_upright_rgb(&img, metadata, index))
}

impl FrameSource for ImageSequenceSource {
    fn open(&mut self) -> Result<FrameMetadata, CaptureError> {
        if self.paths.is_empty() {
            return Err(CaptureError::Empty);
        }
        self.cursor = 0;
        self.opened = true;
        Ok(self.metadata)
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        if !self.opened {
            return Err(CaptureError::NotOpen);
        }
        let Some(path) = self.paths.get(self.cursor) else {
            return Ok(None);
        };
        let frame = load_frame(path, self.metadata, self.cursor)?;
        self.cursor += 1;
        Ok(Some(frame))
    }

    fn close(&mut self) {
        self.opened = false;
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn write_image(dir: &Path, name: &str, shade: u8) -> PathBuf {
        let path = dir.join(name);
        RgbImage::from_pixel(20, 10, Rgb([shade, shade, shade]))
            .save(&path)
            .unwrap();
        path
    }

    fn meta() -> FrameMetadata {
        FrameMetadata::new(8, 8, 270)
    }

    #[test]
    fn test_from_dir_sorts_and_filters() {
        let tmp = TempDir::new().unwrap();
        write_image(tmp.path(), "b.png", 10);
        write_image(tmp.path(), "a.png", 20);
        fs::write(tmp.path().join("notes.txt"), "skip me").unwrap();

        let source = ImageSequenceSource::from_dir(tmp.path(), meta()).unwrap();
        assert_eq!(source.len(), 2);
        assert!(source.paths[0].ends_with("a.png"));
    }

    #[test]
    fn test_yields_frames_in_order_then_none() {
        let tmp = TempDir::new().unwrap();
        write_image(tmp.path(), "0.png", 10);
        write_image(tmp.path(), "1.png", 20);
        let mut source = ImageSequenceSource::from_dir(tmp.path(), meta()).unwrap();

        assert_eq!(source.open().unwrap(), meta());
        let f0 = source.next_frame().unwrap().unwrap();
        let f1 = source.next_frame().unwrap().unwrap();
        assert_eq!((f0.index(), f1.index()), (0, 1));
        assert_eq!((f0.width(), f0.height(), f0.rotation()), (8, 8, 270));
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_open_empty_source_fails() {
        let tmp = TempDir::new().unwrap();
        let mut source = ImageSequenceSource::from_dir(tmp.path(), meta()).unwrap();
        assert!(matches!(source.open(), Err(CaptureError::Empty)));
    }

    #[test]
    fn test_missing_directory_fails() {
        let tmp = TempDir::new().unwrap();
        let result = ImageSequenceSource::from_dir(&tmp.path().join("missing"), meta());
        assert!(matches!(result, Err(CaptureError::Open { .. })));
    }

    #[test]
    fn test_next_frame_before_open_fails() {
        let mut source = ImageSequenceSource::new(vec![PathBuf::from("x.png")], meta());
        assert!(matches!(source.next_frame(), Err(CaptureError::NotOpen)));
    }

    #[test]
    fn test_corrupt_image_is_decode_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.png");
        fs::write(&path, b"not a png").unwrap();
        let mut source = ImageSequenceSource::new(vec![path], meta());
        source.open().unwrap();
        assert!(matches!(source.next_frame(), Err(CaptureError::Decode { .. })));
    }
}
