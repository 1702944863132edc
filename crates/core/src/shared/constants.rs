pub const PALM_MODEL_NAME: &str = "palm_detection.onnx";
pub const LANDMARK_MODEL_NAME: &str = "hand_landmark.onnx";

/// Subdirectory (next to the executable) searched for pre-packaged models.
pub const BUNDLED_MODEL_DIR: &str = "models";

pub const DEFAULT_MAX_HANDS: usize = 2;
pub const DEFAULT_MIN_DETECTION_CONFIDENCE: f32 = 0.5;
pub const DEFAULT_MIN_PRESENCE_CONFIDENCE: f32 = 0.5;
pub const DEFAULT_MIN_TRACKING_CONFIDENCE: f32 = 0.5;

/// Score reported for a hand the detector did not classify.
pub const FALLBACK_HANDEDNESS_SCORE: f32 = 0.9;

/// Size of the big-endian length prefix in front of every frame.
pub const LENGTH_PREFIX_BYTES: usize = 4;
