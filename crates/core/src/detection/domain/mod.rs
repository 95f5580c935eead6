pub mod async_face_detector;
pub mod detection_error;
pub mod face_detector;
