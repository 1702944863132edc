use thiserror::Error;

use crate::shared::decoded_image::DecodedImage;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("payload is not a decodable image: {0}")]
    Codec(#[from] image::ImageError),
    #[error("decoded image has no pixels ({width}x{height})")]
    Empty { width: u32, height: u32 },
}

/// Decode an encoded still image (format sniffed from its bytes) and
/// convert it to the RGB channel order the detector expects.
///
/// The conversion only reorders or expands channels; dimensions are kept.
pub fn decode_image(payload: &[u8], sequence: u64) -> Result<DecodedImage, DecodeError> {
    let decoded = image::load_from_memory(payload)?;
    let (width, height) = (decoded.width(), decoded.height());
    if width == 0 || height == 0 {
        return Err(DecodeError::Empty { width, height });
    }
    Ok(DecodedImage::from_rgb(decoded.to_rgb8(), sequence))
}
