pub mod alert_controller;
pub mod notification_sink;
