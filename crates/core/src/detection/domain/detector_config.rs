use crate::shared::constants::{
    DEFAULT_MAX_HANDS, DEFAULT_MIN_DETECTION_CONFIDENCE, DEFAULT_MIN_PRESENCE_CONFIDENCE,
    DEFAULT_MIN_TRACKING_CONFIDENCE,
};

/// Fixed parameters handed to a detector at construction time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectorConfig {
    pub max_hands: usize,
    pub min_detection_confidence: f32,
    pub min_presence_confidence: f32,
    /// Only meaningful for video-mode trackers; per-image detection
    /// carries it without using it.
    pub min_tracking_confidence: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            max_hands: DEFAULT_MAX_HANDS,
            min_detection_confidence: DEFAULT_MIN_DETECTION_CONFIDENCE,
            min_presence_confidence: DEFAULT_MIN_PRESENCE_CONFIDENCE,
            min_tracking_confidence: DEFAULT_MIN_TRACKING_CONFIDENCE,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_hands == 0 {
            return Err("max hands must be at least 1".to_string());
        }
        let thresholds = [
            ("min detection confidence", self.min_detection_confidence),
            ("min presence confidence", self.min_presence_confidence),
            ("min tracking confidence", self.min_tracking_confidence),
        ];
        for (name, value) in thresholds {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{name} must be between 0.0 and 1.0, got {value}"));
            }
        }
        Ok(())
    }
}
