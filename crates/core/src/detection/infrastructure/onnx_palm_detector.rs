/// Palm detector using ONNX Runtime via `ort`.
///
/// First stage of the hand pipeline: finds palm boxes on a letterboxed
/// 192×192 view of the whole image. The landmark stage then crops around
/// each palm.
use std::path::Path;

use crate::shared::decoded_image::DecodedImage;

use super::roi::{sigmoid, SquareRoi};

/// Palm model input resolution.
const INPUT_SIZE: usize = 192;

/// Number of SSD anchors for the 192×192 palm model.
const NUM_ANCHORS: usize = 2016;

/// Values per anchor in the regressor output: box (4) + 7 keypoints (14).
const REGRESSOR_STRIDE: usize = 18;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f32 = 0.3;

/// A palm box in image pixel coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct PalmDetection {
    pub center_x: f32,
    pub center_y: f32,
    pub width: f32,
    pub height: f32,
    pub score: f32,
}

/// Palm detector backed by an ONNX Runtime session.
pub struct OnnxPalmDetector {
    session: ort::session::Session,
    anchors: Vec<[f32; 2]>,
    min_score: f32,
    max_palms: usize,
}

impl OnnxPalmDetector {
    pub fn new(
        model_path: &Path,
        min_score: f32,
        max_palms: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?.commit_from_file(model_path)?;
        Ok(Self {
            session,
            anchors: generate_anchors(),
            min_score,
            max_palms,
        })
    }

    /// Detect palms, strongest first, at most `max_palms`.
    pub fn detect(
        &mut self,
        image: &DecodedImage,
    ) -> Result<Vec<PalmDetection>, Box<dyn std::error::Error>> {
        let roi = SquareRoi::letterbox(image.width(), image.height());
        let input_tensor = roi.sample(image, INPUT_SIZE);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        // Palm model outputs two tensors:
        // - regressors: [1, 2016, 18]
        // - classificators: [1, 2016, 1]
        if outputs.len() < 2 {
            return Err(format!("palm model expected 2 outputs, got {}", outputs.len()).into());
        }

        let regressors = outputs[0].try_extract_array::<f32>()?;
        let scores = outputs[1].try_extract_array::<f32>()?;
        let reg_data = regressors.as_slice().ok_or("cannot get regressor slice")?;
        let score_data = scores.as_slice().ok_or("cannot get score slice")?;

        let mut palms = decode_palms(reg_data, score_data, &self.anchors, &roi, self.min_score);
        let mut kept = nms(&mut palms, NMS_IOU_THRESH);
        kept.truncate(self.max_palms);
        Ok(kept)
    }
}

/// Decode anchor-relative boxes that pass `min_score` into image pixels.
fn decode_palms(
    reg_data: &[f32],
    score_data: &[f32],
    anchors: &[[f32; 2]],
    roi: &SquareRoi,
    min_score: f32,
) -> Vec<PalmDetection> {
    let size = INPUT_SIZE as f32;
    let mut palms = Vec::new();

    for (i, &raw_score) in score_data.iter().enumerate().take(anchors.len()) {
        let score = sigmoid(raw_score);
        if score < min_score {
            continue;
        }

        let offset = i * REGRESSOR_STRIDE;
        if offset + 4 > reg_data.len() {
            break;
        }

        let anchor = anchors[i];
        let cx = anchor[0] + reg_data[offset] / size;
        let cy = anchor[1] + reg_data[offset + 1] / size;
        let w = reg_data[offset + 2] / size;
        let h = reg_data[offset + 3] / size;

        let (center_x, center_y) = roi.to_image(cx, cy);
        palms.push(PalmDetection {
            center_x,
            center_y,
            width: w * roi.side,
            height: h * roi.side,
            score,
        });
    }

    palms
}

/// SSD anchors for the 192×192 palm model.
///
/// Stride 8 gives a 24×24 grid with 2 anchors per cell; the three stride-16
/// layers share a 12×12 grid with 6 anchors per cell.
fn generate_anchors() -> Vec<[f32; 2]> {
    let strides = [(8, 2), (16, 6)];
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);

    for &(stride, num) in &strides {
        let grid_size = INPUT_SIZE / stride;
        for y in 0..grid_size {
            for x in 0..grid_size {
                let cx = (x as f32 + 0.5) / grid_size as f32;
                let cy = (y as f32 + 0.5) / grid_size as f32;
                for _ in 0..num {
                    anchors.push([cx, cy]);
                }
            }
        }
    }

    anchors
}

fn nms(palms: &mut [PalmDetection], iou_thresh: f32) -> Vec<PalmDetection> {
    palms.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; palms.len()];

    for i in 0..palms.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(palms[i].clone());
        for j in (i + 1)..palms.len() {
            if !suppressed[j] && box_iou(&palms[i], &palms[j]) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}

fn box_iou(a: &PalmDetection, b: &PalmDetection) -> f32 {
    let (ax1, ay1, ax2, ay2) = corners(a);
    let (bx1, by1, bx2, by2) = corners(b);

    let inter = (ax2.min(bx2) - ax1.max(bx1)).max(0.0) * (ay2.min(by2) - ay1.max(by1)).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    inter / (a.width * a.height + b.width * b.height - inter)
}

fn corners(p: &PalmDetection) -> (f32, f32, f32, f32) {
    (
        p.center_x - p.width / 2.0,
        p.center_y - p.height / 2.0,
        p.center_x + p.width / 2.0,
        p.center_y + p.height / 2.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn palm(center_x: f32, center_y: f32, side: f32, score: f32) -> PalmDetection {
        PalmDetection {
            center_x,
            center_y,
            width: side,
            height: side,
            score,
        }
    }

    #[test]
    fn test_generate_anchors_count() {
        // 24×24 × 2 + 12×12 × 6 = 1152 + 864
        assert_eq!(generate_anchors().len(), NUM_ANCHORS);
    }

    #[test]
    fn test_anchors_in_unit_range() {
        for a in generate_anchors() {
            assert!(a[0] > 0.0 && a[0] < 1.0);
            assert!(a[1] > 0.0 && a[1] < 1.0);
        }
    }

    #[test]
    fn test_decode_skips_low_scores() {
        let anchors = vec![[0.5, 0.5], [0.25, 0.25]];
        let reg = vec![0.0; 2 * REGRESSOR_STRIDE];
        let scores = vec![-5.0, -5.0];
        let roi = SquareRoi::letterbox(192, 192);
        assert!(decode_palms(&reg, &scores, &anchors, &roi, 0.5).is_empty());
    }

    #[test]
    fn test_decode_maps_into_letterboxed_image() {
        // 384×192 image: letterbox side 384, top at -96.
        let anchors = vec![[0.5, 0.5]];
        let mut reg = vec![0.0; REGRESSOR_STRIDE];
        reg[0] = 19.2; // +0.1 in x
        reg[2] = 48.0; // width 0.25
        reg[3] = 96.0; // height 0.5
        let roi = SquareRoi::letterbox(384, 192);

        let palms = decode_palms(&reg, &[4.0], &anchors, &roi, 0.5);

        assert_eq!(palms.len(), 1);
        let p = &palms[0];
        assert_relative_eq!(p.center_x, 0.6 * 384.0, epsilon = 1e-3);
        assert_relative_eq!(p.center_y, 96.0, epsilon = 1e-3);
        assert_relative_eq!(p.width, 96.0, epsilon = 1e-3);
        assert_relative_eq!(p.height, 192.0, epsilon = 1e-3);
        assert!(p.score > 0.98);
    }

    #[test]
    fn test_decode_tolerates_short_regressor_buffer() {
        let anchors = vec![[0.5, 0.5], [0.5, 0.5]];
        let reg = vec![0.0; REGRESSOR_STRIDE]; // only one anchor's worth
        let roi = SquareRoi::letterbox(100, 100);
        let palms = decode_palms(&reg, &[5.0, 5.0], &anchors, &roi, 0.5);
        assert_eq!(palms.len(), 1);
    }

    #[test]
    fn test_nms_suppresses_overlap_and_orders_by_score() {
        let mut palms = vec![
            palm(55.0, 55.0, 100.0, 0.7),
            palm(50.0, 50.0, 100.0, 0.9),
            palm(400.0, 400.0, 50.0, 0.8),
        ];
        let kept = nms(&mut palms, NMS_IOU_THRESH);
        assert_eq!(kept.len(), 2);
        assert_relative_eq!(kept[0].score, 0.9);
        assert_relative_eq!(kept[1].score, 0.8);
    }

    #[test]
    fn test_iou_disjoint_is_zero() {
        let a = palm(0.0, 0.0, 10.0, 1.0);
        let b = palm(100.0, 100.0, 10.0, 1.0);
        assert_eq!(box_iou(&a, &b), 0.0);
    }

    #[test]
    fn test_iou_identical_is_one() {
        let a = palm(10.0, 10.0, 10.0, 1.0);
        assert_relative_eq!(box_iou(&a, &a.clone()), 1.0);
    }
}
