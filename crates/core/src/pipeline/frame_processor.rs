use std::str::FromStr;
use std::time::Instant;

use crate::detection::domain::hand_detector::HandDetector;
use crate::pipeline::image_decoder::decode_image;
use crate::pipeline::worker_error::WorkerError;
use crate::pipeline::worker_logger::WorkerLogger;
use crate::protocol::frame::Frame;
use crate::protocol::output_record::OutputRecord;

/// What to do when the detector itself fails on a decoded image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DetectorErrorPolicy {
    /// Propagate the failure and stop the worker.
    #[default]
    Fail,
    /// Log it and emit an empty record for the frame.
    Skip,
}

impl FromStr for DetectorErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fail" => Ok(Self::Fail),
            "skip" => Ok(Self::Skip),
            other => Err(format!(
                "detector error policy must be 'fail' or 'skip', got '{other}'"
            )),
        }
    }
}

/// Turns one frame into exactly one record by decoding the image, running
/// the detector and normalizing its hands.
///
/// Decode failures yield an empty record without calling the detector.
/// Detector failures follow the configured [`DetectorErrorPolicy`].
pub struct FrameProcessor {
    detector: Box<dyn HandDetector>,
    policy: DetectorErrorPolicy,
}

impl FrameProcessor {
    pub fn new(detector: Box<dyn HandDetector>, policy: DetectorErrorPolicy) -> Self {
        Self { detector, policy }
    }

    pub fn process(
        &mut self,
        frame: &Frame,
        logger: &mut dyn WorkerLogger,
    ) -> Result<OutputRecord, WorkerError> {
        let sequence = frame.sequence();
        if frame.is_empty() {
            log::debug!("Frame {sequence} has an empty payload");
            logger.count("empty_frames", 1);
            return Ok(OutputRecord::empty());
        }

        let t0 = Instant::now();
        let decoded = decode_image(frame.payload(), sequence);
        logger.timing("decode", elapsed_ms(t0));

        let image = match decoded {
            Ok(image) => image,
            Err(e) => {
                log::debug!("Frame {sequence} ({} bytes): {e}", frame.len());
                logger.count("decode_failures", 1);
                return Ok(OutputRecord::empty());
            }
        };

        let t0 = Instant::now();
        let detected = self.detector.detect(&image);
        logger.timing("detect", elapsed_ms(t0));

        match detected {
            Ok(hands) => Ok(OutputRecord::from_detections(hands)),
            Err(e) => match self.policy {
                DetectorErrorPolicy::Fail => Err(WorkerError::Detector {
                    sequence,
                    message: e.to_string(),
                }),
                DetectorErrorPolicy::Skip => {
                    log::warn!("Hand detector failed on frame {sequence}, emitting no hands: {e}");
                    logger.count("detector_failures", 1);
                    Ok(OutputRecord::empty())
                }
            },
        }
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::detection::domain::hand::{
        Classification, DetectedHand, Handedness, Landmark, NUM_LANDMARKS,
    };
    use crate::pipeline::worker_logger::{LogWorkerLogger, NullWorkerLogger};
    use crate::shared::decoded_image::DecodedImage;
    use std::collections::VecDeque;
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    /// Replays scripted results in order and records every image it sees.
    pub(crate) struct ScriptedDetector {
        pub results: VecDeque<Result<Vec<DetectedHand>, String>>,
        pub seen: Arc<Mutex<Vec<(u64, u32, u32)>>>,
    }

    impl ScriptedDetector {
        pub fn new(results: Vec<Result<Vec<DetectedHand>, String>>) -> Self {
            Self {
                results: results.into(),
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl HandDetector for ScriptedDetector {
        fn detect(
            &mut self,
            image: &DecodedImage,
        ) -> Result<Vec<DetectedHand>, Box<dyn std::error::Error>> {
            self.seen
                .lock()
                .unwrap()
                .push((image.sequence(), image.width(), image.height()));
            match self.results.pop_front() {
                Some(Ok(hands)) => Ok(hands),
                Some(Err(msg)) => Err(msg.into()),
                None => Ok(Vec::new()),
            }
        }
    }

    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([90, 60, 30]));
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    pub(crate) fn hand(x: f32, classification: Option<Classification>) -> DetectedHand {
        DetectedHand {
            landmarks: (0..NUM_LANDMARKS)
                .map(|i| Landmark::new(x, i as f32 / NUM_LANDMARKS as f32, -0.01))
                .collect(),
            classification,
        }
    }

    #[test]
    fn test_decode_failure_yields_empty_record_without_detecting() {
        let detector = ScriptedDetector::new(vec![Ok(vec![hand(0.5, None)])]);
        let seen = detector.seen.clone();
        let mut processor = FrameProcessor::new(Box::new(detector), DetectorErrorPolicy::Fail);
        let mut logger = LogWorkerLogger::new(10);

        let record = processor
            .process(&Frame::new(0, b"HELLO".to_vec()), &mut logger)
            .unwrap();

        assert_eq!(record, OutputRecord::empty());
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(logger.counter("decode_failures"), 1);
    }

    #[test]
    fn test_empty_payload_yields_empty_record_without_decoding() {
        let detector = ScriptedDetector::new(vec![Ok(vec![hand(0.5, None)])]);
        let seen = detector.seen.clone();
        let mut processor = FrameProcessor::new(Box::new(detector), DetectorErrorPolicy::Fail);
        let mut logger = LogWorkerLogger::new(10);

        let record = processor
            .process(&Frame::new(0, Vec::new()), &mut logger)
            .unwrap();

        assert_eq!(record, OutputRecord::empty());
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(logger.counter("empty_frames"), 1);
        assert!(logger.timing_for("decode").is_none());
    }

    #[test]
    fn test_no_hands_yields_empty_record() {
        let detector = ScriptedDetector::new(vec![Ok(Vec::new())]);
        let mut processor = FrameProcessor::new(Box::new(detector), DetectorErrorPolicy::Fail);

        let record = processor
            .process(&Frame::new(0, png_bytes(8, 8)), &mut NullWorkerLogger)
            .unwrap();

        assert!(record.hands.is_empty());
    }

    #[test]
    fn test_detector_receives_decoded_image() {
        let detector = ScriptedDetector::new(vec![Ok(Vec::new())]);
        let seen = detector.seen.clone();
        let mut processor = FrameProcessor::new(Box::new(detector), DetectorErrorPolicy::Fail);

        processor
            .process(&Frame::new(3, png_bytes(12, 7)), &mut NullWorkerLogger)
            .unwrap();

        assert_eq!(seen.lock().unwrap().as_slice(), &[(3, 12, 7)]);
    }

    #[test]
    fn test_unclassified_hand_gets_default_handedness_and_score() {
        let detector = ScriptedDetector::new(vec![Ok(vec![hand(0.4, None)])]);
        let mut processor = FrameProcessor::new(Box::new(detector), DetectorErrorPolicy::Fail);

        let record = processor
            .process(&Frame::new(0, png_bytes(8, 8)), &mut NullWorkerLogger)
            .unwrap();

        assert_eq!(record.hands.len(), 1);
        assert_eq!(record.hands[0].handedness, Handedness::Right);
        assert_eq!(record.hands[0].score, 0.9);
        assert_eq!(record.hands[0].points.len(), NUM_LANDMARKS);
    }

    #[test]
    fn test_hands_keep_detector_order() {
        let left = Classification {
            handedness: Handedness::Left,
            score: 0.8,
        };
        let detector =
            ScriptedDetector::new(vec![Ok(vec![hand(0.7, Some(left)), hand(0.2, None)])]);
        let mut processor = FrameProcessor::new(Box::new(detector), DetectorErrorPolicy::Fail);

        let record = processor
            .process(&Frame::new(0, png_bytes(8, 8)), &mut NullWorkerLogger)
            .unwrap();

        assert_eq!(record.hands[0].handedness, Handedness::Left);
        assert_eq!(record.hands[0].points[0].x, 0.7);
        assert_eq!(record.hands[1].points[0].x, 0.2);
    }

    #[test]
    fn test_detector_failure_is_fatal_by_default() {
        let detector = ScriptedDetector::new(vec![Err("session crashed".into())]);
        let mut processor = FrameProcessor::new(Box::new(detector), DetectorErrorPolicy::Fail);

        let err = processor
            .process(&Frame::new(5, png_bytes(8, 8)), &mut NullWorkerLogger)
            .unwrap_err();

        match err {
            WorkerError::Detector { sequence, message } => {
                assert_eq!(sequence, 5);
                assert!(message.contains("session crashed"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_detector_failure_skipped_when_configured() {
        let detector = ScriptedDetector::new(vec![Err("session crashed".into())]);
        let mut processor = FrameProcessor::new(Box::new(detector), DetectorErrorPolicy::Skip);
        let mut logger = LogWorkerLogger::new(10);

        let record = processor
            .process(&Frame::new(0, png_bytes(8, 8)), &mut logger)
            .unwrap();

        assert!(record.hands.is_empty());
        assert_eq!(logger.counter("detector_failures"), 1);
    }

    #[test]
    fn test_policy_parses_from_flag_value() {
        assert_eq!(
            "fail".parse::<DetectorErrorPolicy>().unwrap(),
            DetectorErrorPolicy::Fail
        );
        assert_eq!(
            "skip".parse::<DetectorErrorPolicy>().unwrap(),
            DetectorErrorPolicy::Skip
        );
        assert!("retry".parse::<DetectorErrorPolicy>().is_err());
    }
}
