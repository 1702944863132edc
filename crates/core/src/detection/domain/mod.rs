pub mod detector_config;
pub mod hand;
pub mod hand_detector;
