//! Raster codec abstraction.
//!
//! The pipeline never calls an image library directly; it goes through
//! [`RasterCodec`]. [`PngCodec`] is the `image`-crate implementation.

use image::imageops::FilterType;
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;

use super::{RasterError, RasterResult};

/// Decode, encode and resample RGBA rasters
pub trait RasterCodec: Send + Sync {
    /// Decode any supported raster format to RGBA
    fn decode(&self, bytes: &[u8]) -> RasterResult<RgbaImage>;

    /// Encode an RGBA raster (PNG for artifacts)
    fn encode(&self, image: &RgbaImage) -> RasterResult<Vec<u8>>;

    /// Resample to exactly `width` x `height`
    fn resize(&self, image: &RgbaImage, width: u32, height: u32) -> RgbaImage;
}

/// `image`-crate codec writing PNG
#[derive(Debug, Clone, Copy)]
pub struct PngCodec {
    filter: FilterType,
}

impl PngCodec {
    pub fn new() -> Self {
        Self {
            filter: FilterType::Triangle,
        }
    }
}

impl Default for PngCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl RasterCodec for PngCodec {
    fn decode(&self, bytes: &[u8]) -> RasterResult<RgbaImage> {
        if bytes.is_empty() {
            return Err(RasterError::Decode("input is empty".to_string()));
        }
        let img = image::load_from_memory(bytes).map_err(|e| RasterError::Decode(e.to_string()))?;
        Ok(img.to_rgba8())
    }

    fn encode(&self, image: &RgbaImage) -> RasterResult<Vec<u8>> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| RasterError::Encode(e.to_string()))?;
        Ok(bytes)
    }

    fn resize(&self, image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
        image::imageops::resize(image, width, height, self.filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_encode_writes_png() {
        let img = RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 255]));
        let bytes = PngCodec::new().encode(&img).unwrap();
        assert_eq!(&bytes[0..4], &[0x89, 0x50, 0x4E, 0x47]);

        let back = PngCodec::new().decode(&bytes).unwrap();
        assert_eq!(back.dimensions(), (4, 3));
        assert_eq!(back.get_pixel(2, 1), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let codec = PngCodec::new();
        assert!(matches!(codec.decode(b"not an image"), Err(RasterError::Decode(_))));
        assert!(matches!(codec.decode(&[]), Err(RasterError::Decode(_))));
    }
}
