pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

/// Camera frames are square 600x600 captures.
pub const FRAME_WIDTH: u32 = 600;
pub const FRAME_HEIGHT: u32 = 600;

/// Clockwise rotation (degrees) needed to bring a front-camera frame upright.
pub const FRAME_ROTATION: u32 = 270;

/// Polling cadence of the sampling producer.
pub const SAMPLING_INTERVAL_MS: u64 = 300;

/// How long a shown proximity warning stays active before reverting to idle.
pub const ALERT_TIMEOUT_MS: u64 = 2000;

/// Upper bound on waiting for the calibration detection to finish.
pub const CALIBRATION_TIMEOUT_MS: u64 = 5000;

/// How long shutdown waits for a detection that is still running before
/// abandoning it.
pub const SHUTDOWN_GRACE_MS: u64 = 1000;

pub const WARNING_MESSAGE: &str = "Hey, move back from the screen!";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
