use serde::{Deserialize, Serialize};

use crate::detection::domain::hand::{DetectedHand, Handedness, Landmark};
use crate::shared::constants::FALLBACK_HANDEDNESS_SCORE;

/// The JSON line emitted for one frame.
///
/// `hands` keeps the detector's order and is empty when nothing was found
/// or the frame did not decode.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub hands: Vec<HandRecord>,
}

impl OutputRecord {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Hands with a NaN or infinite coordinate or score are dropped, since
    /// JSON has no number for them.
    pub fn from_detections(hands: Vec<DetectedHand>) -> Self {
        let detected = hands.len();
        let hands: Vec<HandRecord> = hands
            .into_iter()
            .map(HandRecord::from)
            .filter(HandRecord::is_finite)
            .collect();
        if hands.len() < detected {
            log::warn!(
                "Dropped {} of {detected} hands with non-finite values",
                detected - hands.len()
            );
        }
        Self { hands }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HandRecord {
    pub points: Vec<Landmark>,
    pub handedness: Handedness,
    pub score: f32,
}

impl HandRecord {
    pub fn is_finite(&self) -> bool {
        self.score.is_finite()
            && self
                .points
                .iter()
                .all(|p| p.x.is_finite() && p.y.is_finite() && p.z.is_finite())
    }
}

/// Points pass through untouched; a missing classification becomes
/// `Right` with the fallback score.
impl From<DetectedHand> for HandRecord {
    fn from(hand: DetectedHand) -> Self {
        let (handedness, score) = match hand.classification {
            Some(c) => (c.handedness, c.score),
            None => (Handedness::default(), FALLBACK_HANDEDNESS_SCORE),
        };
        Self {
            points: hand.landmarks,
            handedness,
            score,
        }
    }
}
