pub mod comparison_engine;
pub mod face_profile;
pub mod profile_store;
