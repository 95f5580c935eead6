pub mod alert;
pub mod calibration;
pub mod capture;
pub mod detection;
pub mod overlay;
pub mod pipeline;
pub mod shared;
