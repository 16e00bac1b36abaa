//! Upload validation and image-to-tensor conversion.

use ::image::imageops::{self, FilterType};
use ::image::{ImageError, RgbImage};
use tract_onnx::prelude::tract_ndarray::Array4;

use super::engine::InputSize;
use crate::error::{Error, Result};

/// Reject uploads that are not images before touching their bytes.
pub fn validate_upload(content_type: Option<&str>, bytes: &[u8]) -> Result<()> {
    if !content_type.unwrap_or_default().starts_with("image/") {
        return Err(Error::InvalidInput("File must be an image".into()));
    }
    if bytes.is_empty() {
        return Err(Error::InvalidInput("Empty file".into()));
    }
    Ok(())
}

/// Decode any supported format and normalize it to 8-bit RGB.
///
/// Alpha is dropped, palettes are expanded and grayscale is replicated
/// across the three channels.
pub fn decode(bytes: &[u8]) -> Result<RgbImage> {
    match ::image::load_from_memory(bytes) {
        Ok(img) => Ok(img.to_rgb8()),
        Err(ImageError::Unsupported(_)) | Err(ImageError::Decoding(_)) => {
            Err(Error::InvalidInput("Invalid image file".into()))
        }
        Err(e) => Err(Error::InvalidInput(format!("Image processing error: {}", e))),
    }
}

/// Resize to exactly `size` and scale pixels into `[0, 1]`.
///
/// The result is NHWC with a batch of one: `(1, height, width, 3)`.
pub fn to_tensor(image: &RgbImage, size: InputSize) -> Array4<f32> {
    let resized = if image.dimensions() == (size.width, size.height) {
        image.clone()
    } else {
        imageops::resize(image, size.width, size.height, FilterType::CatmullRom)
    };
    Array4::from_shape_fn(
        (1, size.height as usize, size.width as usize, 3),
        |(_, y, x, c)| resized.get_pixel(x as u32, y as u32)[c] as f32 / 255.0,
    )
}

pub fn preprocess(bytes: &[u8], size: InputSize) -> Result<Array4<f32>> {
    let image = decode(bytes)?;
    Ok(to_tensor(&image, size))
}
