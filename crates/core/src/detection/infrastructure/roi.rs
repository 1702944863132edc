//! Square regions of interest and the NHWC sampling both hand models share.

use ndarray::Array4;

use crate::shared::decoded_image::{DecodedImage, RGB_CHANNELS};

/// Axis-aligned square in image pixel coordinates.
///
/// May extend past the image bounds; samples outside the image are black.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SquareRoi {
    pub center_x: f32,
    pub center_y: f32,
    pub side: f32,
}

impl SquareRoi {
    /// The smallest square centered on the image that contains all of it,
    /// i.e. a letterbox with equal padding on the short axis.
    pub fn letterbox(width: u32, height: u32) -> Self {
        Self {
            center_x: width as f32 / 2.0,
            center_y: height as f32 / 2.0,
            side: width.max(height) as f32,
        }
    }

    pub fn left(&self) -> f32 {
        self.center_x - self.side / 2.0
    }

    pub fn top(&self) -> f32 {
        self.center_y - self.side / 2.0
    }

    /// Map a point given as a fraction of the ROI into image pixels.
    pub fn to_image(&self, u: f32, v: f32) -> (f32, f32) {
        (self.left() + u * self.side, self.top() + v * self.side)
    }

    /// Sample the ROI into a `[1, size, size, 3]` float tensor in [0, 1].
    ///
    /// Nearest-neighbour sampling at pixel centers.
    pub fn sample(&self, image: &DecodedImage, size: usize) -> Array4<f32> {
        let src = image.as_ndarray();
        let src_w = image.width() as i64;
        let src_h = image.height() as i64;
        let step = self.side / size as f32;

        let mut tensor = Array4::<f32>::zeros((1, size, size, RGB_CHANNELS));
        if src_w == 0 || src_h == 0 {
            return tensor;
        }

        for y in 0..size {
            let src_y = (self.top() + (y as f32 + 0.5) * step).floor() as i64;
            if src_y < 0 || src_y >= src_h {
                continue;
            }
            for x in 0..size {
                let src_x = (self.left() + (x as f32 + 0.5) * step).floor() as i64;
                if src_x < 0 || src_x >= src_w {
                    continue;
                }
                for c in 0..RGB_CHANNELS {
                    tensor[[0, y, x, c]] = src[[src_y as usize, src_x as usize, c]] as f32 / 255.0;
                }
            }
        }

        tensor
    }
}

pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
