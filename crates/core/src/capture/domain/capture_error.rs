use std::path::PathBuf;

use thiserror::Error;

/// Failures acquiring frames from a capture source.
///
/// Open failures are fatal to pipeline startup and are returned to the
/// caller untouched; the core never retries.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("failed to open capture source {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode frame from {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("capture source has no frames")]
    Empty,
    #[error("capture source is not open")]
    NotOpen,
    #[error("invalid frame buffer: {width}x{height} with {len} bytes")]
    InvalidDimensions { width: u32, height: u32, len: usize },
}
