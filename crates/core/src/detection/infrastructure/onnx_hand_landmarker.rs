/// Two-stage hand landmarker using ONNX Runtime via `ort`.
///
/// Palms found by [`OnnxPalmDetector`] are expanded into square crops, and
/// the landmark model regresses 21 points, a presence score and a
/// handedness score per crop. Crops are axis-aligned; the palm's rotation
/// is not estimated.
///
/// The landmark model is MediaPipe's `hand_landmark` exported to ONNX. Its
/// presence and handedness heads end in a sigmoid inside the graph, so both
/// outputs are already probabilities. MediaPipe's landmark graph compares
/// them against the thresholds directly and reads handedness as a binary
/// classification over the labels `Left` (index 0) and `Right` (index 1).
use std::path::Path;

use crate::detection::domain::detector_config::DetectorConfig;
use crate::detection::domain::hand::{
    Classification, DetectedHand, Handedness, Landmark, NUM_LANDMARKS,
};
use crate::detection::domain::hand_detector::HandDetector;
use crate::shared::decoded_image::DecodedImage;

use super::onnx_palm_detector::{OnnxPalmDetector, PalmDetection};
use super::roi::SquareRoi;

/// Landmark model input resolution.
const INPUT_SIZE: usize = 224;

/// Values per landmark in the model output (x, y, z).
const LANDMARK_VALUES: usize = 3;

/// The palm box covers only the palm; the crop must also hold the fingers.
const PALM_TO_HAND_SCALE: f32 = 2.6;

/// Fingers extend away from the wrist, so the crop is shifted up by this
/// fraction of the palm height.
const PALM_TO_HAND_SHIFT_Y: f32 = -0.5;

pub struct OnnxHandLandmarker {
    palm_detector: OnnxPalmDetector,
    session: ort::session::Session,
    min_presence: f32,
}

impl OnnxHandLandmarker {
    pub fn new(
        palm_model_path: &Path,
        landmark_model_path: &Path,
        config: &DetectorConfig,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        config.validate()?;
        let palm_detector = OnnxPalmDetector::new(
            palm_model_path,
            config.min_detection_confidence,
            config.max_hands,
        )?;
        let session = ort::session::Session::builder()?.commit_from_file(landmark_model_path)?;
        log::debug!(
            "Hand landmarker ready (max_hands={}, min_detection={}, min_presence={})",
            config.max_hands,
            config.min_detection_confidence,
            config.min_presence_confidence
        );
        Ok(Self {
            palm_detector,
            session,
            min_presence: config.min_presence_confidence,
        })
    }

    fn landmarks_for(
        &mut self,
        image: &DecodedImage,
        palm: &PalmDetection,
    ) -> Result<Option<DetectedHand>, Box<dyn std::error::Error>> {
        let roi = hand_roi(palm);
        let input_tensor = roi.sample(image, INPUT_SIZE);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        // Landmark model outputs, in order:
        // - screen landmarks: [1, 63] in crop pixels
        // - hand presence probability: [1, 1]
        // - handedness probability of `Left`: [1, 1]
        // - world landmarks (unused)
        if outputs.len() < 3 {
            return Err(
                format!("landmark model expected 3 outputs, got {}", outputs.len()).into(),
            );
        }

        let landmarks = outputs[0].try_extract_array::<f32>()?;
        let presence = outputs[1].try_extract_array::<f32>()?;
        let handedness = outputs[2].try_extract_array::<f32>()?;

        let raw_landmarks = landmarks.as_slice().ok_or("cannot get landmark slice")?;
        let presence = presence
            .iter()
            .next()
            .copied()
            .ok_or("empty presence output")?;
        let handedness = handedness.iter().next().copied();

        if !passes_presence(presence, self.min_presence) {
            return Ok(None);
        }

        let landmarks = project_landmarks(raw_landmarks, &roi, image.width(), image.height())?;
        Ok(Some(DetectedHand {
            landmarks,
            classification: handedness.and_then(classify_handedness),
        }))
    }
}

impl HandDetector for OnnxHandLandmarker {
    fn detect(
        &mut self,
        image: &DecodedImage,
    ) -> Result<Vec<DetectedHand>, Box<dyn std::error::Error>> {
        if image.width() == 0 || image.height() == 0 {
            return Ok(Vec::new());
        }

        let palms = self.palm_detector.detect(image)?;
        let mut hands = Vec::with_capacity(palms.len());
        for palm in &palms {
            if let Some(hand) = self.landmarks_for(image, palm)? {
                hands.push(hand);
            }
        }
        Ok(hands)
    }
}

/// Square crop around a palm that is large enough to contain the fingers.
fn hand_roi(palm: &PalmDetection) -> SquareRoi {
    SquareRoi {
        center_x: palm.center_x,
        center_y: palm.center_y + PALM_TO_HAND_SHIFT_Y * palm.height,
        side: palm.width.max(palm.height) * PALM_TO_HAND_SCALE,
    }
}

/// Convert crop-pixel landmarks into full-image normalized coordinates.
///
/// z is expressed on the same scale as x.
fn project_landmarks(
    raw: &[f32],
    roi: &SquareRoi,
    width: u32,
    height: u32,
) -> Result<Vec<Landmark>, String> {
    let needed = NUM_LANDMARKS * LANDMARK_VALUES;
    if raw.len() < needed {
        return Err(format!(
            "landmark output has {} values, expected {needed}",
            raw.len()
        ));
    }

    let size = INPUT_SIZE as f32;
    let (w, h) = (width as f32, height as f32);
    Ok(raw[..needed]
        .chunks_exact(LANDMARK_VALUES)
        .map(|v| {
            let (px, py) = roi.to_image(v[0] / size, v[1] / size);
            Landmark::new(px / w, py / h, v[2] / size * roi.side / w)
        })
        .collect())
}

/// NaN never passes.
fn passes_presence(presence: f32, min_presence: f32) -> bool {
    presence >= min_presence
}

/// The handedness head gives the probability of the first label (`Left`);
/// `Right` takes the complement. A non-finite output yields no
/// classification.
fn classify_handedness(left: f32) -> Option<Classification> {
    if !left.is_finite() {
        return None;
    }
    let left = left.clamp(0.0, 1.0);
    let classification = if left >= 0.5 {
        Classification {
            handedness: Handedness::Left,
            score: left,
        }
    } else {
        Classification {
            handedness: Handedness::Right,
            score: 1.0 - left,
        }
    };
    Some(classification)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn palm(center_x: f32, center_y: f32, width: f32, height: f32) -> PalmDetection {
        PalmDetection {
            center_x,
            center_y,
            width,
            height,
            score: 0.9,
        }
    }

    #[test]
    fn test_hand_roi_expands_and_shifts_up() {
        let roi = hand_roi(&palm(100.0, 200.0, 40.0, 50.0));
        assert_relative_eq!(roi.center_x, 100.0);
        assert_relative_eq!(roi.center_y, 175.0, epsilon = 1e-3);
        assert_relative_eq!(roi.side, 130.0, epsilon = 1e-3);
    }

    #[test]
    fn test_project_landmarks_maps_crop_to_image() {
        let roi = SquareRoi {
            center_x: 50.0,
            center_y: 50.0,
            side: 100.0,
        };
        let mut raw = vec![0.0; NUM_LANDMARKS * LANDMARK_VALUES];
        // First landmark at the crop center with depth of a quarter crop.
        raw[0] = 112.0;
        raw[1] = 112.0;
        raw[2] = 56.0;

        let points = project_landmarks(&raw, &roi, 200, 100).unwrap();

        assert_eq!(points.len(), NUM_LANDMARKS);
        assert_relative_eq!(points[0].x, 0.25);
        assert_relative_eq!(points[0].y, 0.5);
        assert_relative_eq!(points[0].z, 0.125);
        // Crop origin maps to the ROI's top-left corner.
        assert_relative_eq!(points[1].x, 0.0);
        assert_relative_eq!(points[1].y, 0.0);
    }

    #[test]
    fn test_project_landmarks_rejects_short_output() {
        let roi = SquareRoi::letterbox(10, 10);
        assert!(project_landmarks(&[0.0; 10], &roi, 10, 10).is_err());
    }

    #[rstest]
    #[case(0.98, Handedness::Left, 0.98)]
    #[case(0.5, Handedness::Left, 0.5)]
    #[case(0.3, Handedness::Right, 0.7)]
    #[case(0.02, Handedness::Right, 0.98)]
    fn test_classify_reads_probability_of_left(
        #[case] left: f32,
        #[case] expected: Handedness,
        #[case] score: f32,
    ) {
        let c = classify_handedness(left).unwrap();
        assert_eq!(c.handedness, expected);
        assert_relative_eq!(c.score, score, epsilon = 1e-6);
    }

    #[test]
    fn test_classify_score_never_below_half() {
        for left in [0.0, 0.2, 0.49, 0.5, 0.51, 0.8, 1.0] {
            assert!(classify_handedness(left).unwrap().score >= 0.5);
        }
    }

    #[test]
    fn test_classify_out_of_range_is_clamped() {
        let c = classify_handedness(1.2).unwrap();
        assert_eq!(c.handedness, Handedness::Left);
        assert_relative_eq!(c.score, 1.0);
    }

    #[test]
    fn test_classify_non_finite_is_unclassified() {
        assert!(classify_handedness(f32::NAN).is_none());
        assert!(classify_handedness(f32::INFINITY).is_none());
    }

    #[rstest]
    #[case(0.9, true)]
    #[case(0.5, true)]
    #[case(0.3, false)]
    #[case(0.0, false)]
    #[case(f32::NAN, false)]
    fn test_presence_is_compared_as_probability(#[case] presence: f32, #[case] kept: bool) {
        assert_eq!(passes_presence(presence, 0.5), kept);
    }
}
