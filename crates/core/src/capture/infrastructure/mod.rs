pub mod frame_pump;
pub mod image_sequence_source;
