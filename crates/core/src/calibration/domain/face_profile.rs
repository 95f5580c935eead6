use crate::shared::face::{BoundingBox, DetectedFace};

/// Size of one detected face: the measure a live face is compared on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceProfile {
    width: f32,
    height: f32,
    area: f32,
}

impl FaceProfile {
    pub fn new(width: f32, height: f32, area: f32) -> Self {
        Self {
            width,
            height,
            area,
        }
    }

    pub fn from_bounding_box(bounds: &BoundingBox) -> Self {
        let width = bounds.width as f32;
        let height = bounds.height as f32;
        Self::new(width, height, width * height)
    }

    pub fn from_face(face: &DetectedFace) -> Self {
        Self::from_bounding_box(&face.bounding_box)
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn area(&self) -> f32 {
        self.area
    }
}
