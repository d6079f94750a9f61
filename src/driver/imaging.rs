//! Image codec chain over the `image` crate.
//!
//! Implements the three-stage decode seam of [`ImagingFactory`]: a dedicated
//! container-format decoder, a generic guess-the-format decoder, and a
//! dedicated compact-format decoder. Output is always tightly packed BGRA8.

use std::io::Cursor;

use image::codecs::dds::DdsDecoder;
use image::codecs::qoi::QoiDecoder;
use image::{DynamicImage, ImageDecoder};

use crate::driver::{DecodedImage, ImagingFactory};
use crate::error::{GraphicsError, GraphicsResult};
use crate::types::Extent2d;

/// Imaging factory backed by the `image` crate's codecs.
#[derive(Debug, Default)]
pub struct CodecImagingFactory;

impl CodecImagingFactory {
    /// Create the codec-backed imaging factory.
    pub fn new() -> Self {
        Self
    }
}

/// Convert a decoded image to tightly packed BGRA8 in the engine layout.
fn to_bgra8(image: DynamicImage, premultiplied: Option<bool>) -> DecodedImage {
    let size = Extent2d::new(image.width(), image.height());
    let mut pixels = image.into_rgba8().into_raw();
    for px in pixels.chunks_exact_mut(4) {
        px.swap(0, 2);
    }
    DecodedImage {
        size,
        pixels,
        premultiplied,
    }
}

impl ImagingFactory for CodecImagingFactory {
    fn decode_container(&self, bytes: &[u8]) -> GraphicsResult<DecodedImage> {
        let decoder = DdsDecoder::new(Cursor::new(bytes))
            .map_err(|e| GraphicsError::DecodeFailed(e.to_string()))?;
        // The container format stores the alpha mode; the underlying decoder
        // does not surface it, so containers report straight alpha.
        let premultiplied = Some(false);
        let image = DynamicImage::from_decoder(decoder)
            .map_err(|e| GraphicsError::DecodeFailed(e.to_string()))?;
        Ok(to_bgra8(image, premultiplied))
    }

    fn decode_generic(&self, bytes: &[u8]) -> GraphicsResult<DecodedImage> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| GraphicsError::DecodeFailed(e.to_string()))?;
        Ok(to_bgra8(image, None))
    }

    fn decode_compact(&self, bytes: &[u8]) -> GraphicsResult<DecodedImage> {
        let decoder = QoiDecoder::new(Cursor::new(bytes))
            .map_err(|e| GraphicsError::DecodeFailed(e.to_string()))?;
        let (width, height) = decoder.dimensions();
        let image = DynamicImage::from_decoder(decoder)
            .map_err(|e| GraphicsError::DecodeFailed(e.to_string()))?;
        debug_assert_eq!((image.width(), image.height()), (width, height));
        Ok(to_bgra8(image, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::decode_image_bytes;

    // Smallest valid QOI stream: 1x1 RGBA.
    fn qoi_1x1(r: u8, g: u8, b: u8, a: u8) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"qoif");
        bytes.extend_from_slice(&1u32.to_be_bytes()); // width
        bytes.extend_from_slice(&1u32.to_be_bytes()); // height
        bytes.push(4); // channels
        bytes.push(0); // colorspace
        bytes.push(0xFF); // QOI_OP_RGBA
        bytes.extend_from_slice(&[r, g, b, a]);
        bytes.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 1]); // end marker
        bytes
    }

    #[test]
    fn test_compact_decode_swizzles_to_bgra() {
        let factory = CodecImagingFactory::new();
        let decoded = factory.decode_compact(&qoi_1x1(10, 20, 30, 255)).unwrap();
        assert_eq!(decoded.size, Extent2d::new(1, 1));
        assert_eq!(decoded.pixels, vec![30, 20, 10, 255]);
        assert_eq!(decoded.premultiplied, None);
    }

    #[test]
    fn test_chain_falls_through_to_compact() {
        let factory = CodecImagingFactory::new();
        let decoded = decode_image_bytes(&factory, &qoi_1x1(1, 2, 3, 4)).unwrap();
        assert_eq!(decoded.pixels, vec![3, 2, 1, 4]);
    }

    #[test]
    fn test_chain_reports_combined_failure() {
        let factory = CodecImagingFactory::new();
        let err = decode_image_bytes(&factory, b"not an image").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("container:"));
        assert!(message.contains("generic:"));
        assert!(message.contains("compact:"));
    }

    #[test]
    fn test_generic_rejects_garbage() {
        let factory = CodecImagingFactory::new();
        assert!(factory.decode_generic(&[0u8; 16]).is_err());
    }
}
