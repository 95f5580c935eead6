pub mod detection_worker;
pub mod mode;
pub mod pipeline_stats;
pub mod proximity_pipeline;
pub mod single_slot_channel;
