use ndarray::ArrayView3;

/// Number of interleaved channels in every decoded image (R, G, B).
pub const RGB_CHANNELS: usize = 3;

/// A decoded still image: contiguous RGB bytes in row-major order.
///
/// Owned by a single loop iteration and dropped once the detector has run.
/// `sequence` is the zero-based position of the source frame in the input
/// stream and only serves diagnostics.
#[derive(Clone, Debug)]
pub struct DecodedImage {
    data: Vec<u8>,
    width: u32,
    height: u32,
    sequence: u64,
}

impl DecodedImage {
    pub fn new(data: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * RGB_CHANNELS,
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
            sequence,
        }
    }

    /// Takes ownership of an RGB buffer produced by the `image` crate.
    pub fn from_rgb(image: image::RgbImage, sequence: u64) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height, sequence)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// `(height, width, channel)` view over the pixel buffer.
    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("image data length must match dimensions")
    }

    fn shape(&self) -> (usize, usize, usize) {
        (self.height as usize, self.width as usize, RGB_CHANNELS)
    }
}
