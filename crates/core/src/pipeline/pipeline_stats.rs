use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Plain copy of the pipeline counters at one moment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub frames_published: u64,
    pub frames_overwritten: u64,
    pub frames_dropped_in_flight: u64,
    pub detections_submitted: u64,
    pub detections_completed: u64,
    pub detection_failures: u64,
    pub results_discarded: u64,
}

/// Lock-free counters updated from the producer, worker and completion
/// threads.
#[derive(Debug)]
pub struct PipelineStats {
    start_time: Instant,
    frames_published: AtomicU64,
    frames_overwritten: AtomicU64,
    frames_dropped_in_flight: AtomicU64,
    detections_submitted: AtomicU64,
    detections_completed: AtomicU64,
    detection_failures: AtomicU64,
    results_discarded: AtomicU64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            frames_published: AtomicU64::new(0),
            frames_overwritten: AtomicU64::new(0),
            frames_dropped_in_flight: AtomicU64::new(0),
            detections_submitted: AtomicU64::new(0),
            detections_completed: AtomicU64::new(0),
            detection_failures: AtomicU64::new(0),
            results_discarded: AtomicU64::new(0),
        }
    }

    pub fn record_published(&self) {
        self.frames_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_overwritten(&self) {
        self.frames_overwritten.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped_in_flight(&self) {
        self.frames_dropped_in_flight.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_submitted(&self) {
        self.detections_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completed(&self) {
        self.detections_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.detection_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_discarded(&self) {
        self.results_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_published: self.frames_published.load(Ordering::Relaxed),
            frames_overwritten: self.frames_overwritten.load(Ordering::Relaxed),
            frames_dropped_in_flight: self.frames_dropped_in_flight.load(Ordering::Relaxed),
            detections_submitted: self.detections_submitted.load(Ordering::Relaxed),
            detections_completed: self.detections_completed.load(Ordering::Relaxed),
            detection_failures: self.detection_failures.load(Ordering::Relaxed),
            results_discarded: self.results_discarded.load(Ordering::Relaxed),
        }
    }

    /// Returns the formatted summary, or `None` if no frame was ever published.
    pub fn summary_string(&self) -> Option<String> {
        let s = self.snapshot();
        if s.frames_published == 0 {
            return None;
        }

        let elapsed = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Pipeline summary ({} frames, {elapsed:.1}s total):",
            s.frames_published
        )];
        lines.push(format!("  overwritten  : {}", s.frames_overwritten));
        lines.push(format!("  busy-dropped : {}", s.frames_dropped_in_flight));
        lines.push(format!(
            "  detections   : {} submitted, {} completed, {} failed",
            s.detections_submitted, s.detections_completed, s.detection_failures
        ));
        if s.results_discarded > 0 {
            lines.push(format!("  discarded    : {}", s.results_discarded));
        }
        if elapsed > 0.0 {
            let rate = s.detections_completed as f64 / elapsed;
            lines.push(format!("  Throughput: {rate:.1} detections/s"));
        }
        Some(lines.join("\n"))
    }
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_records() {
        let stats = PipelineStats::new();
        stats.record_published();
        stats.record_published();
        stats.record_overwritten();
        stats.record_submitted();
        stats.record_completed();

        let s = stats.snapshot();
        assert_eq!(s.frames_published, 2);
        assert_eq!(s.frames_overwritten, 1);
        assert_eq!(s.detections_submitted, 1);
        assert_eq!(s.detections_completed, 1);
        assert_eq!(s.detection_failures, 0);
    }

    #[test]
    fn test_summary_none_when_empty() {
        assert!(PipelineStats::new().summary_string().is_none());
    }

    #[test]
    fn test_summary_contains_counts() {
        let stats = PipelineStats::new();
        stats.record_published();
        stats.record_dropped_in_flight();
        stats.record_submitted();
        stats.record_failure();

        let summary = stats.summary_string().unwrap();
        assert!(summary.starts_with("Pipeline summary (1 frames"));
        assert!(summary.contains("busy-dropped : 1"));
        assert!(summary.contains("1 submitted, 0 completed, 1 failed"));
        assert!(!summary.contains("discarded"));
    }
}
