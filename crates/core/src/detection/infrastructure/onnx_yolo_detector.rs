/// YOLO face detector using ONNX Runtime via `ort`.
///
/// Decodes the NV21 frame to an upright RGB image, letterboxes it into the
/// model's square input, runs inference and applies greedy NMS. The five
/// pose keypoints (eyes, nose, mouth corners) become the face contour.
use std::path::Path;

use image::RgbImage;

use crate::detection::domain::detection_error::DetectionError;
use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::face::{BoundingBox, DetectedFace, Point};
use crate::shared::frame::Frame;
use crate::shared::nv21;

/// Fallback input resolution when the model input shape is dynamic.
const DEFAULT_INPUT_SIZE: u32 = 640;

const NMS_IOU_THRESH: f64 = 0.45;

/// 5 landmarks x (x, y, conf).
const NUM_KEYPOINT_VALUES: usize = 15;

const KEYPOINT_CONF_THRESH: f64 = 0.5;

/// YOLO face detector backed by an ONNX Runtime session.
pub struct OnnxYoloDetector {
    session: ort::session::Session,
    confidence: f64,
    input_size: u32,
}

impl OnnxYoloDetector {
    /// Load the model. The square input size is read from the NCHW input
    /// shape when it is static.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, DetectionError> {
        let session = ort::session::Session::builder()
            .map_err(|e| DetectionError::Model(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e| DetectionError::Model(format!("{}: {e}", model_path.display())))?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| match input.dtype() {
                ort::value::ValueType::Tensor { ref shape, .. }
                    if shape.len() >= 4 && shape[2] > 0 =>
                {
                    Some(shape[2] as u32)
                }
                _ => None,
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);
        log::debug!("Loaded face model with input size {input_size}");

        Ok(Self {
            session,
            confidence,
            input_size,
        })
    }
}

impl FaceDetector for OnnxYoloDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectedFace>, DetectionError> {
        let upright = nv21::to_upright_rgb(frame);
        let (input, lb) = letterbox(&upright, self.input_size);

        let input_value = ort::value::Tensor::from_array(input)
            .map_err(|e| DetectionError::Inference(e.to_string()))?;
        let outputs = self
            .session
            .run(ort::inputs![input_value])
            .map_err(|e| DetectionError::Inference(e.to_string()))?;
        if outputs.len() == 0 {
            return Err(DetectionError::Inference("model produced no outputs".into()));
        }
        let tensor = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| DetectionError::Inference(e.to_string()))?;
        let shape = tensor.shape().to_vec();
        if shape.len() != 3 {
            return Err(DetectionError::Inference(format!(
                "unexpected output shape {shape:?}"
            )));
        }
        let data = tensor
            .as_slice()
            .ok_or_else(|| DetectionError::Inference("output tensor is not contiguous".into()))?;

        let mut raw = parse_rows(data, &shape, self.confidence, &lb);
        let mut faces: Vec<DetectedFace> = nms(&mut raw, NMS_IOU_THRESH)
            .into_iter()
            .map(RawDetection::into_face)
            .collect();
        // Nearest face is the largest one.
        faces.sort_by_key(|f| std::cmp::Reverse(f.bounding_box.area()));
        Ok(faces)
    }
}

/// Mapping from letterboxed model coordinates back to image coordinates.
#[derive(Clone, Copy, Debug)]
struct Letterbox {
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    fn unmap(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.pad_x as f64) / self.scale,
            (y - self.pad_y as f64) / self.scale,
        )
    }
}

/// Resize `img` into a gray-padded `target_size` square, NCHW float32.
fn letterbox(img: &RgbImage, target_size: u32) -> (ndarray::Array4<f32>, Letterbox) {
    let (iw, ih) = (img.width() as f64, img.height() as f64);
    let target = target_size as f64;

    let scale = (target / iw).min(target / ih);
    let new_w = (iw * scale).round() as u32;
    let new_h = (ih * scale).round() as u32;
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    let gray = 114.0f32 / 255.0;
    let size = target_size as usize;
    let mut tensor = ndarray::Array4::<f32>::from_elem((1, 3, size, size), gray);

    for y in 0..new_h {
        let src_y = ((y as f64 / scale) as u32).min(img.height() - 1);
        for x in 0..new_w {
            let src_x = ((x as f64 / scale) as u32).min(img.width() - 1);
            let px = img.get_pixel(src_x, src_y);
            let (ty, tx) = ((pad_y + y) as usize, (pad_x + x) as usize);
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = px[c] as f32 / 255.0;
            }
        }
    }

    (
        tensor,
        Letterbox {
            scale,
            pad_x,
            pad_y,
        },
    )
}

#[derive(Clone, Debug)]
struct RawDetection {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    confidence: f64,
    keypoints: Vec<(f64, f64)>,
}

impl RawDetection {
    fn corners(&self) -> BoundingBox {
        BoundingBox::from_corners(self.x1, self.y1, self.x2, self.y2)
    }

    fn into_face(self) -> DetectedFace {
        let contour = self
            .keypoints
            .iter()
            .map(|&(x, y)| Point::new(x as f32, y as f32))
            .collect();
        DetectedFace::new(self.corners(), contour)
    }
}

/// Parse `[1, features, detections]` (transposed) or `[1, detections,
/// features]` output. Each row is `[cx, cy, w, h, conf, kp0_x, kp0_y,
/// kp0_conf, ...]`.
fn parse_rows(data: &[f32], shape: &[usize], min_conf: f64, lb: &Letterbox) -> Vec<RawDetection> {
    let transposed = shape[1] < shape[2];
    let (num_dets, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    let at = |det: usize, feat: usize| -> f64 {
        if transposed {
            data[feat * num_dets + det] as f64
        } else {
            data[det * num_feats + feat] as f64
        }
    };

    let mut dets = Vec::new();
    if num_feats < 5 {
        return dets;
    }
    for i in 0..num_dets {
        let conf = at(i, 4);
        if conf < min_conf {
            continue;
        }
        let (cx, cy, w, h) = (at(i, 0), at(i, 1), at(i, 2), at(i, 3));
        let (x1, y1) = lb.unmap(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = lb.unmap(cx + w / 2.0, cy + h / 2.0);

        let keypoints = if num_feats >= 5 + NUM_KEYPOINT_VALUES {
            (0..5)
                .filter(|k| at(i, 5 + k * 3 + 2) >= KEYPOINT_CONF_THRESH)
                .map(|k| lb.unmap(at(i, 5 + k * 3), at(i, 5 + k * 3 + 1)))
                .collect()
        } else {
            Vec::new()
        };

        dets.push(RawDetection {
            x1,
            y1,
            x2,
            y2,
            confidence: conf,
            keypoints,
        });
    }
    dets
}

/// Greedy NMS: highest confidence first, suppress heavy overlaps.
fn nms(dets: &mut [RawDetection], iou_thresh: f64) -> Vec<RawDetection> {
    dets.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<RawDetection> = Vec::new();
    for det in dets.iter() {
        let boxed = det.corners();
        if keep.iter().all(|k| k.corners().iou(&boxed) <= iou_thresh) {
            keep.push(det.clone());
        }
    }
    keep
}
