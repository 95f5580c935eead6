use crate::calibration::domain::face_profile::FaceProfile;
use crate::calibration::domain::profile_store::{NoBaselineError, ProfileStore};
use crate::shared::face::DetectionResult;

/// Outcome of comparing one live detection with the baseline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProximityVerdict {
    TooClose,
    Clear,
    /// No face in the frame; distance cannot be judged.
    Undetermined,
}

/// Decides whether a live face is closer to the screen than the baseline.
#[derive(Clone, Copy, Debug, Default)]
pub struct ComparisonEngine;

impl ComparisonEngine {
    pub fn new() -> Self {
        Self
    }

    /// Too close when any single measure exceeds the baseline.
    pub fn is_too_close(&self, current: &FaceProfile, baseline: &FaceProfile) -> bool {
        current.width() > baseline.width()
            || current.height() > baseline.height()
            || current.area() > baseline.area()
    }

    /// Judge the dominant face of `result` against the stored baseline.
    pub fn evaluate(
        &self,
        result: &DetectionResult,
        store: &ProfileStore,
    ) -> Result<ProximityVerdict, NoBaselineError> {
        let baseline = store.get_baseline()?;
        let Some(face) = result.first() else {
            return Ok(ProximityVerdict::Undetermined);
        };
        let current = FaceProfile::from_face(face);
        Ok(if self.is_too_close(&current, &baseline) {
            ProximityVerdict::TooClose
        } else {
            ProximityVerdict::Clear
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    use crate::shared::face::{BoundingBox, DetectedFace};

    fn baseline() -> FaceProfile {
        FaceProfile::new(100.0, 100.0, 10000.0)
    }

    #[rstest]
    #[case::width_alone(FaceProfile::new(150.0, 50.0, 7500.0), true)]
    #[case::height_alone(FaceProfile::new(50.0, 150.0, 7500.0), true)]
    #[case::area_alone(FaceProfile::new(100.0, 100.0, 10001.0), true)]
    #[case::all_smaller(FaceProfile::new(90.0, 90.0, 8100.0), false)]
    #[case::equal(FaceProfile::new(100.0, 100.0, 10000.0), false)]
    fn test_is_too_close(#[case] current: FaceProfile, #[case] expected: bool) {
        assert_eq!(ComparisonEngine::new().is_too_close(&current, &baseline()), expected);
    }

    #[test]
    fn test_evaluate_without_baseline_fails() {
        let store = ProfileStore::new();
        let result = DetectionResult::empty();
        assert_eq!(
            ComparisonEngine::new().evaluate(&result, &store),
            Err(NoBaselineError)
        );
    }

    #[test]
    fn test_evaluate_no_face_is_undetermined() {
        let store = ProfileStore::new();
        store.set_baseline(baseline());
        assert_eq!(
            ComparisonEngine::new().evaluate(&DetectionResult::empty(), &store),
            Ok(ProximityVerdict::Undetermined)
        );
    }

    #[test]
    fn test_evaluate_uses_first_face() {
        let store = ProfileStore::new();
        store.set_baseline(baseline());
        let result = DetectionResult::new(vec![
            DetectedFace::new(BoundingBox::new(0, 0, 90, 90), vec![]),
            DetectedFace::new(BoundingBox::new(0, 0, 300, 300), vec![]),
        ]);
        assert_eq!(
            ComparisonEngine::new().evaluate(&result, &store),
            Ok(ProximityVerdict::Clear)
        );
    }
}
