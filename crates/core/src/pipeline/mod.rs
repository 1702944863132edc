pub mod frame_processor;
pub mod image_decoder;
pub mod stream_hands_use_case;
pub mod worker_error;
pub mod worker_logger;
