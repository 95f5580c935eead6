use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crossbeam_channel::{select, Sender};

use crate::alert::domain::notification_sink::NotificationSink;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertState {
    Idle,
    Active { since: Instant, timeout: Duration },
}

impl AlertState {
    pub fn is_active(&self) -> bool {
        matches!(self, AlertState::Active { .. })
    }
}

struct Inner {
    state: AlertState,
    /// Bumped on every activation so a stale timer cannot end a newer alert.
    generation: u64,
    cancel_tx: Option<Sender<()>>,
}

/// Debounced proximity warning.
///
/// While active, further "too close" reports are absorbed without touching
/// the sink or the timer. An active warning ends either on an explicit
/// clear, which cancels the sink, or when its timeout expires, which
/// resets the state and tells the sink the warning lapsed.
pub struct AlertController {
    sink: Arc<dyn NotificationSink>,
    message: String,
    timeout: Duration,
    inner: Arc<Mutex<Inner>>,
}

impl AlertController {
    pub fn new(sink: Arc<dyn NotificationSink>, message: impl Into<String>) -> Self {
        Self::with_timeout(
            sink,
            message,
            Duration::from_millis(crate::shared::constants::ALERT_TIMEOUT_MS),
        )
    }

    pub fn with_timeout(
        sink: Arc<dyn NotificationSink>,
        message: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            sink,
            message: message.into(),
            timeout,
            inner: Arc::new(Mutex::new(Inner {
                state: AlertState::Idle,
                generation: 0,
                cancel_tx: None,
            })),
        }
    }

    pub fn report_too_close(&self) {
        let mut inner = lock(&self.inner);
        if inner.state.is_active() {
            return;
        }
        inner.generation += 1;
        inner.state = AlertState::Active {
            since: Instant::now(),
            timeout: self.timeout,
        };
        inner.cancel_tx = Some(self.arm_timer(inner.generation));
        self.sink.show(&self.message);
        log::info!("Proximity warning shown");
    }

    pub fn report_clear(&self) {
        let mut inner = lock(&self.inner);
        if !inner.state.is_active() {
            return;
        }
        // Dropping the sender wakes the timer thread.
        inner.cancel_tx = None;
        inner.state = AlertState::Idle;
        self.sink.cancel();
        log::info!("Proximity warning cancelled");
    }

    pub fn state(&self) -> AlertState {
        lock(&self.inner).state
    }

    fn arm_timer(&self, generation: u64) -> Sender<()> {
        let (cancel_tx, cancel_rx) = crossbeam_channel::bounded::<()>(0);
        let inner = Arc::clone(&self.inner);
        let sink = Arc::clone(&self.sink);
        let timeout = self.timeout;
        std::thread::spawn(move || {
            select! {
                recv(cancel_rx) -> _ => {}
                recv(crossbeam_channel::after(timeout)) -> _ => {
                    let mut inner = lock(&inner);
                    if inner.generation == generation && inner.state.is_active() {
                        inner.state = AlertState::Idle;
                        inner.cancel_tx = None;
                        sink.expired();
                        log::info!("Proximity warning expired");
                    }
                }
            }
        });
        cancel_tx
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<String>>,
    }

    impl RecordingSink {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl NotificationSink for RecordingSink {
        fn show(&self, message: &str) {
            self.events.lock().unwrap().push(format!("show:{message}"));
        }

        fn cancel(&self) {
            self.events.lock().unwrap().push("cancel".into());
        }

        fn expired(&self) {
            self.events.lock().unwrap().push("expired".into());
        }
    }

    fn controller(timeout: Duration) -> (AlertController, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let controller = AlertController::with_timeout(sink.clone(), "back off", timeout);
        (controller, sink)
    }

    fn wait_until_idle(controller: &AlertController, limit: Duration) -> bool {
        let deadline = Instant::now() + limit;
        while Instant::now() < deadline {
            if !controller.state().is_active() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_starts_idle() {
        let (controller, sink) = controller(Duration::from_secs(60));
        assert_eq!(controller.state(), AlertState::Idle);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_repeated_too_close_shows_once() {
        let (controller, sink) = controller(Duration::from_secs(60));
        controller.report_too_close();
        controller.report_too_close();

        assert!(controller.state().is_active());
        assert_eq!(sink.events(), vec!["show:back off"]);
    }

    #[test]
    fn test_repeat_does_not_reset_timer() {
        let (controller, _) = controller(Duration::from_secs(60));
        controller.report_too_close();
        let first = controller.state();
        std::thread::sleep(Duration::from_millis(5));
        controller.report_too_close();
        assert_eq!(controller.state(), first);
    }

    #[test]
    fn test_clear_cancels_before_timeout() {
        let (controller, sink) = controller(Duration::from_secs(60));
        controller.report_too_close();
        controller.report_too_close();
        controller.report_clear();

        assert_eq!(controller.state(), AlertState::Idle);
        assert_eq!(sink.events(), vec!["show:back off", "cancel"]);
    }

    #[test]
    fn test_clear_while_idle_is_noop() {
        let (controller, sink) = controller(Duration::from_secs(60));
        controller.report_clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_timeout_reverts_to_idle_without_cancel() {
        let (controller, sink) = controller(Duration::from_millis(30));
        controller.report_too_close();

        assert!(wait_until_idle(&controller, Duration::from_secs(5)));
        assert_eq!(sink.events(), vec!["show:back off", "expired"]);

        controller.report_too_close();
        assert_eq!(
            sink.events(),
            vec!["show:back off", "expired", "show:back off"]
        );
    }

    #[test]
    fn test_stale_timer_does_not_end_new_alert() {
        let (controller, _) = controller(Duration::from_millis(200));
        controller.report_too_close();
        controller.report_clear();
        controller.report_too_close();
        let current = controller.state();

        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(controller.state(), current);
    }
}
