/// Where proximity warnings are presented.
///
/// `show` is idempotent while a warning is visible and `cancel` is
/// idempotent while none is. Called from the detection completion thread
/// and from the alert timer.
pub trait NotificationSink: Send + Sync {
    fn show(&self, message: &str);
    fn cancel(&self);

    /// The shown warning timed out on its own; the next `show` presents a
    /// new one. Default: no-op, for sinks whose warnings hide themselves.
    fn expired(&self) {}
}
