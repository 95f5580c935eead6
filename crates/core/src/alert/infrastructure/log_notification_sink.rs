use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::alert::domain::notification_sink::NotificationSink;

/// Presents warnings as `warn!` log lines. Used by the CLI, which has no
/// toast surface.
#[derive(Debug, Default)]
pub struct LogNotificationSink {
    visible: AtomicBool,
    shown: AtomicUsize,
}

impl LogNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of warnings presented so far.
    pub fn shown_count(&self) -> usize {
        self.shown.load(Ordering::SeqCst)
    }
}

impl NotificationSink for LogNotificationSink {
    fn show(&self, message: &str) {
        if !self.visible.swap(true, Ordering::SeqCst) {
            self.shown.fetch_add(1, Ordering::SeqCst);
            log::warn!("{message}");
        }
    }

    fn cancel(&self) {
        if self.visible.swap(false, Ordering::SeqCst) {
            log::info!("Warning withdrawn");
        }
    }

    fn expired(&self) {
        self.visible.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use crate::alert::domain::alert_controller::AlertController;

    #[test]
    fn test_show_is_idempotent_while_visible() {
        let sink = LogNotificationSink::new();
        sink.show("a");
        sink.show("a");
        assert_eq!(sink.shown_count(), 1);
    }

    #[test]
    fn test_cancel_allows_next_show() {
        let sink = LogNotificationSink::new();
        sink.cancel();
        sink.show("a");
        sink.cancel();
        sink.cancel();
        sink.show("a");
        assert_eq!(sink.shown_count(), 2);
    }

    #[test]
    fn test_expired_allows_next_show() {
        let sink = LogNotificationSink::new();
        sink.show("a");
        sink.expired();
        sink.show("a");
        assert_eq!(sink.shown_count(), 2);
    }

    fn wait_until_idle(controller: &AlertController) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if !controller.state().is_active() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_each_activation_after_timeout_shows_again() {
        let sink = Arc::new(LogNotificationSink::new());
        let controller =
            AlertController::with_timeout(sink.clone(), "too close", Duration::from_millis(30));

        for expected in 1..=3 {
            controller.report_too_close();
            assert!(controller.state().is_active());
            assert_eq!(sink.shown_count(), expected);
            assert!(wait_until_idle(&controller));
        }
    }

    #[test]
    fn test_clear_then_activation_shows_again() {
        let sink = Arc::new(LogNotificationSink::new());
        let controller =
            AlertController::with_timeout(sink.clone(), "too close", Duration::from_secs(60));

        controller.report_too_close();
        controller.report_too_close();
        controller.report_clear();
        controller.report_too_close();
        assert_eq!(sink.shown_count(), 2);
    }
}
