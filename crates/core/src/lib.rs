pub mod client;
pub mod detection;
pub mod pipeline;
pub mod protocol;
pub mod shared;
