pub mod onnx_yolo_detector;
pub mod threaded_face_detector;
