use std::sync::{PoisonError, RwLock};

use thiserror::Error;

use crate::calibration::domain::face_profile::FaceProfile;
use crate::shared::face::DetectionResult;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("no calibrated baseline; run calibration first")]
pub struct NoBaselineError;

/// Owner of the calibrated baseline profile.
///
/// Calibration writes under the exclusive lock and readers copy the whole
/// profile out under the shared lock, so a comparison never observes a
/// half-written baseline. Shared between the pipeline and its caller via
/// `Arc`.
#[derive(Debug, Default)]
pub struct ProfileStore {
    baseline: RwLock<Option<FaceProfile>>,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the first face of `result` as the new baseline, replacing any
    /// previous one. Returns `None` and keeps the old baseline when the
    /// result has no face.
    pub fn calibrate(&self, result: &DetectionResult) -> Option<FaceProfile> {
        let face = result.first()?;
        let profile = FaceProfile::from_face(face);
        self.set_baseline(profile);
        Some(profile)
    }

    pub fn set_baseline(&self, profile: FaceProfile) {
        let mut guard = self.baseline.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(profile);
        log::info!(
            "Baseline calibrated: width {} height {} area {}",
            profile.width(),
            profile.height(),
            profile.area()
        );
    }

    pub fn get_baseline(&self) -> Result<FaceProfile, NoBaselineError> {
        self.baseline
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .ok_or(NoBaselineError)
    }

    pub fn has_baseline(&self) -> bool {
        self.get_baseline().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::shared::face::{BoundingBox, DetectedFace};

    fn result_with(boxes: &[BoundingBox]) -> DetectionResult {
        DetectionResult::new(
            boxes
                .iter()
                .map(|b| DetectedFace::new(*b, vec![]))
                .collect(),
        )
    }

    #[test]
    fn test_empty_store_has_no_baseline() {
        let store = ProfileStore::new();
        assert_eq!(store.get_baseline(), Err(NoBaselineError));
        assert!(!store.has_baseline());
    }

    #[test]
    fn test_calibrate_uses_first_face() {
        let store = ProfileStore::new();
        let result = result_with(&[BoundingBox::new(0, 0, 80, 120), BoundingBox::new(0, 0, 10, 10)]);

        let stored = store.calibrate(&result).unwrap();
        assert_eq!(stored, FaceProfile::new(80.0, 120.0, 9600.0));
        assert_eq!(store.get_baseline().unwrap(), stored);
    }

    #[test]
    fn test_calibrate_without_face_keeps_previous_baseline() {
        let store = ProfileStore::new();
        store.set_baseline(FaceProfile::new(1.0, 2.0, 2.0));

        assert!(store.calibrate(&DetectionResult::empty()).is_none());
        assert_eq!(store.get_baseline().unwrap(), FaceProfile::new(1.0, 2.0, 2.0));
    }

    #[test]
    fn test_recalibration_overwrites() {
        let store = ProfileStore::new();
        store.calibrate(&result_with(&[BoundingBox::new(0, 0, 10, 10)]));
        store.calibrate(&result_with(&[BoundingBox::new(0, 0, 20, 30)]));
        assert_eq!(store.get_baseline().unwrap().area(), 600.0);
    }

    #[test]
    fn test_readers_never_see_torn_profiles() {
        let store = Arc::new(ProfileStore::new());
        store.set_baseline(FaceProfile::new(1.0, 1.0, 1.0));

        let writer = {
            let store = store.clone();
            std::thread::spawn(move || {
                for i in 1..=500 {
                    let v = i as f32;
                    store.set_baseline(FaceProfile::new(v, v, v * v));
                }
            })
        };
        for _ in 0..2000 {
            let p = store.get_baseline().unwrap();
            assert_eq!(p.width(), p.height());
            assert_eq!(p.area(), p.width() * p.height());
        }
        writer.join().unwrap();
    }
}
