pub mod constants;
pub mod decoded_image;
pub mod model_resolver;
