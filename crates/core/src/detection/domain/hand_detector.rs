use crate::detection::domain::hand::DetectedHand;
use crate::shared::decoded_image::DecodedImage;

/// Domain interface for hand landmark detection.
///
/// Every call is independent: no identity or temporal state links hands
/// across images. Implementations may still hold mutable inference state
/// (e.g. an ONNX session), hence `&mut self`.
pub trait HandDetector: Send {
    fn detect(&mut self, image: &DecodedImage)
        -> Result<Vec<DetectedHand>, Box<dyn std::error::Error>>;
}
