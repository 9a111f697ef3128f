//! Fit a capture onto the canonical canvas.
//!
//! Captures from two environments rarely share a height (full-page
//! screenshots grow with content). Before diffing, each one is scaled with
//! "contain" semantics so it fits entirely inside the canvas without
//! cropping or distortion, then centered on a transparent white background.
//!
//! A raster that already has the target dimensions is returned unchanged,
//! which makes normalization idempotent.

use image::{Rgba, RgbaImage};

use super::codec::RasterCodec;
use super::RasterResult;

/// Padding colour: white, fully transparent
pub const PAD_COLOR: Rgba<u8> = Rgba([255, 255, 255, 0]);

/// Compute the scaled size of `(width, height)` that fits inside the target
/// while preserving aspect ratio. An empty source yields `(0, 0)`; any other
/// source gets at least one pixel per side.
pub fn contain_size(width: u32, height: u32, target_width: u32, target_height: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (0, 0);
    }
    let scale = f64::min(
        f64::from(target_width) / f64::from(width),
        f64::from(target_height) / f64::from(height),
    );
    let fit = |len: u32, max: u32| -> u32 {
        let scaled = (f64::from(len) * scale).round() as u32;
        scaled.clamp(1, max.max(1))
    };
    (fit(width, target_width), fit(height, target_height))
}

/// Normalize a decoded raster onto a `target_width` x `target_height` canvas
pub fn normalize_image(
    codec: &dyn RasterCodec,
    source: &RgbaImage,
    target_width: u32,
    target_height: u32,
) -> RgbaImage {
    if source.dimensions() == (target_width, target_height) {
        return source.clone();
    }

    let mut canvas = RgbaImage::from_pixel(target_width, target_height, PAD_COLOR);
    let (width, height) = contain_size(source.width(), source.height(), target_width, target_height);
    if width == 0 || height == 0 {
        return canvas;
    }

    let scaled = if (width, height) == source.dimensions() {
        source.clone()
    } else {
        codec.resize(source, width, height)
    };

    let x = (target_width - width) / 2;
    let y = (target_height - height) / 2;
    image::imageops::replace(&mut canvas, &scaled, i64::from(x), i64::from(y));
    canvas
}

/// Byte-level contract: decode, normalize, re-encode.
///
/// Fails with [`super::RasterError::Decode`] when `bytes` are not a raster.
pub fn normalize(
    codec: &dyn RasterCodec,
    bytes: &[u8],
    target_width: u32,
    target_height: u32,
) -> RasterResult<Vec<u8>> {
    let source = codec.decode(bytes)?;
    let normalized = normalize_image(codec, &source, target_width, target_height);
    codec.encode(&normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::codec::PngCodec;
    use crate::raster::RasterError;

    fn solid(w: u32, h: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(color))
    }

    #[test]
    fn test_contain_size() {
        // Wide source is limited by width
        assert_eq!(contain_size(2560, 800, 1280, 800), (1280, 400));
        // Tall full-page capture is limited by height
        assert_eq!(contain_size(1280, 4000, 1280, 800), (256, 800));
        // Small sources are scaled up
        assert_eq!(contain_size(64, 40, 1280, 800), (1280, 800));
        assert_eq!(contain_size(0, 10, 100, 100), (0, 0));
    }

    #[test]
    fn test_tall_capture_is_centered_with_transparent_padding() {
        let codec = PngCodec::new();
        let source = solid(100, 400, [255, 0, 0, 255]);
        let out = normalize_image(&codec, &source, 200, 100);

        assert_eq!(out.dimensions(), (200, 100));
        // Content is 25x100, centered at x = 87..112
        assert_eq!(out.get_pixel(100, 50), &Rgba([255, 0, 0, 255]));
        assert_eq!(out.get_pixel(0, 50), &PAD_COLOR);
        assert_eq!(out.get_pixel(199, 50), &PAD_COLOR);
    }

    #[test]
    fn test_already_canonical_is_untouched() {
        let codec = PngCodec::new();
        let mut source = solid(32, 16, [1, 2, 3, 255]);
        source.put_pixel(5, 5, Rgba([200, 100, 50, 128]));
        let out = normalize_image(&codec, &source, 32, 16);
        assert_eq!(out, source);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let codec = PngCodec::new();
        let mut source = solid(300, 90, [20, 40, 60, 255]);
        for x in 0..300 {
            source.put_pixel(x, x % 90, Rgba([250, 250, 250, 255]));
        }
        let bytes = codec.encode(&source).unwrap();

        let once = normalize(&codec, &bytes, 128, 80).unwrap();
        let twice = normalize(&codec, &once, 128, 80).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_invalid_bytes_fail_with_decode_error() {
        let codec = PngCodec::new();
        let err = normalize(&codec, b"<html>oops</html>", 1280, 800).unwrap_err();
        assert!(matches!(err, RasterError::Decode(_)));
    }
}
