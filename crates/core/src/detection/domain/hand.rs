//! Hand landmark value types in the detector's normalized coordinate space.
//!
//! x and y are fractions of the image width and height; z is relative depth
//! with the wrist near zero and smaller values closer to the camera.

use serde::{Deserialize, Serialize};

/// Landmarks per hand, in MediaPipe order.
pub const NUM_LANDMARKS: usize = 21;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Handedness {
    Left,
    #[default]
    Right,
}

/// Per-hand left/right classification with its confidence in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub handedness: Handedness,
    pub score: f32,
}

/// One hand as reported by a detector.
///
/// `classification` is `None` when the detector could not (or does not)
/// classify handedness.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedHand {
    pub landmarks: Vec<Landmark>,
    pub classification: Option<Classification>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_handedness_is_right() {
        assert_eq!(Handedness::default(), Handedness::Right);
    }

    #[test]
    fn test_handedness_serializes_as_label() {
        assert_eq!(serde_json::to_string(&Handedness::Left).unwrap(), "\"Left\"");
        assert_eq!(serde_json::to_string(&Handedness::Right).unwrap(), "\"Right\"");
    }
}
