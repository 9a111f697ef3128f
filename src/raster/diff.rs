//! Perceptual pixel diff.
//!
//! Pixels are compared in YIQ space after blending alpha against white, the
//! same model the `pixelmatch` family of tools uses. A pixel whose colour
//! delta exceeds `35215 * threshold^2` (the maximum possible YIQ delta scaled
//! by the 0-1 threshold) is a mismatch, unless it sits on an anti-aliased edge
//! in either image.
//!
//! The mask encodes which side "owns" a mismatch: when A's pixel is darker
//! (content present in A) it is painted with the A tint, otherwise with the
//! B tint. Matching pixels are painted as faded grayscale of A for context.

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::config::PIXEL_THRESHOLD;

/// Maximum YIQ delta between two colours
const MAX_YIQ_DELTA: f64 = 35215.0;

/// Result type for diff operations
pub type DiffResult<T> = Result<T, DiffError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiffError {
    #[error("raster dimensions differ: {a_width}x{a_height} vs {b_width}x{b_height}")]
    DimensionMismatch {
        a_width: u32,
        a_height: u32,
        b_width: u32,
        b_height: u32,
    },
}

/// Diff tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiffOptions {
    /// Colour tolerance on a 0-1 scale
    pub threshold: f64,
    /// Skip anti-aliased edge pixels when counting mismatches
    pub detect_antialiasing: bool,
    /// Opacity of the grayscale context drawn for matching pixels
    pub context_alpha: f64,
    /// Mismatch where A holds the foreground
    pub a_color: [u8; 3],
    /// Mismatch where B holds the foreground
    pub b_color: [u8; 3],
    /// Anti-aliased pixels
    pub aa_color: [u8; 3],
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            threshold: PIXEL_THRESHOLD,
            detect_antialiasing: true,
            context_alpha: 0.1,
            a_color: [255, 0, 0],
            b_color: [0, 170, 0],
            aa_color: [255, 255, 0],
        }
    }
}

/// Output of one diff
#[derive(Debug, Clone)]
pub struct DiffOutput {
    pub mask: RgbaImage,
    pub mismatched: u64,
    pub total: u64,
    /// `(total - mismatched) / total * 100`, 100 for empty rasters
    pub similarity: f64,
}

/// Compare two equally sized rasters
pub trait RasterDiffer: Send + Sync {
    fn diff(&self, a: &RgbaImage, b: &RgbaImage) -> DiffResult<DiffOutput>;
}

/// YIQ perceptual differ
#[derive(Debug, Clone, Copy, Default)]
pub struct PixelDiffer {
    options: DiffOptions,
}

impl PixelDiffer {
    pub fn new(options: DiffOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DiffOptions {
        &self.options
    }
}

impl RasterDiffer for PixelDiffer {
    fn diff(&self, a: &RgbaImage, b: &RgbaImage) -> DiffResult<DiffOutput> {
        if a.dimensions() != b.dimensions() {
            return Err(DiffError::DimensionMismatch {
                a_width: a.width(),
                a_height: a.height(),
                b_width: b.width(),
                b_height: b.height(),
            });
        }

        let (width, height) = a.dimensions();
        let total = u64::from(width) * u64::from(height);
        let mut mask = RgbaImage::new(width, height);
        let max_delta = MAX_YIQ_DELTA * self.options.threshold * self.options.threshold;
        let mut mismatched = 0u64;

        for y in 0..height {
            for x in 0..width {
                let pa = a.get_pixel(x, y);
                let pb = b.get_pixel(x, y);

                if pa == pb {
                    mask.put_pixel(x, y, gray_pixel(pa, self.options.context_alpha));
                    continue;
                }

                let delta = color_delta(pa, pb, false);
                if delta.abs() > max_delta {
                    if self.options.detect_antialiasing
                        && (antialiased(a, x, y, b) || antialiased(b, x, y, a))
                    {
                        mask.put_pixel(x, y, opaque(self.options.aa_color));
                    } else {
                        // Positive delta: A is darker, so the content is A's
                        let tint = if delta < 0.0 {
                            self.options.b_color
                        } else {
                            self.options.a_color
                        };
                        mask.put_pixel(x, y, opaque(tint));
                        mismatched += 1;
                    }
                } else {
                    mask.put_pixel(x, y, gray_pixel(pa, self.options.context_alpha));
                }
            }
        }

        Ok(DiffOutput {
            mask,
            mismatched,
            total,
            similarity: similarity_pct(total, mismatched),
        })
    }
}

/// Percentage of matching pixels, clamped to `[0, 100]`
pub fn similarity_pct(total: u64, mismatched: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    let matching = total.saturating_sub(mismatched);
    (matching as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}

fn opaque(color: [u8; 3]) -> Rgba<u8> {
    Rgba([color[0], color[1], color[2], 255])
}

fn gray_pixel(pixel: &Rgba<u8>, alpha: f64) -> Rgba<u8> {
    let [r, g, b, a] = pixel.0;
    let luma = rgb2y(f64::from(r), f64::from(g), f64::from(b));
    let value = blend(luma, alpha * f64::from(a) / 255.0).round().clamp(0.0, 255.0) as u8;
    Rgba([value, value, value, 255])
}

/// Blend a channel value against white
fn blend(channel: f64, alpha: f64) -> f64 {
    255.0 + (channel - 255.0) * alpha
}

fn rgb2y(r: f64, g: f64, b: f64) -> f64 {
    r * 0.298_895_31 + g * 0.586_622_47 + b * 0.114_482_23
}

fn rgb2i(r: f64, g: f64, b: f64) -> f64 {
    r * 0.595_977_99 - g * 0.274_176_10 - b * 0.321_801_89
}

fn rgb2q(r: f64, g: f64, b: f64) -> f64 {
    r * 0.211_470_17 - g * 0.522_617_11 + b * 0.311_146_94
}

fn blended_rgb(pixel: &Rgba<u8>) -> (f64, f64, f64) {
    let [r, g, b, a] = pixel.0;
    let (r, g, b) = (f64::from(r), f64::from(g), f64::from(b));
    if a < 255 {
        let alpha = f64::from(a) / 255.0;
        (blend(r, alpha), blend(g, alpha), blend(b, alpha))
    } else {
        (r, g, b)
    }
}

/// Signed YIQ delta between two pixels.
///
/// Negative when the first pixel is brighter. With `y_only` set, returns the
/// plain brightness difference.
fn color_delta(p1: &Rgba<u8>, p2: &Rgba<u8>, y_only: bool) -> f64 {
    if p1 == p2 {
        return 0.0;
    }
    let (r1, g1, b1) = blended_rgb(p1);
    let (r2, g2, b2) = blended_rgb(p2);

    let y1 = rgb2y(r1, g1, b1);
    let y2 = rgb2y(r2, g2, b2);
    let y = y1 - y2;
    if y_only {
        return y;
    }

    let i = rgb2i(r1, g1, b1) - rgb2i(r2, g2, b2);
    let q = rgb2q(r1, g1, b1) - rgb2q(r2, g2, b2);
    let delta = 0.5053 * y * y + 0.299 * i * i + 0.1957 * q * q;

    if y1 > y2 { -delta } else { delta }
}

/// 3x3 neighbourhood around `(x, y)` clamped to the image, plus the count of
/// sides lying on the border
fn neighbourhood(img: &RgbaImage, x: u32, y: u32) -> (u32, u32, u32, u32, usize) {
    let x0 = x.saturating_sub(1);
    let y0 = y.saturating_sub(1);
    let x2 = (x + 1).min(img.width() - 1);
    let y2 = (y + 1).min(img.height() - 1);
    let on_edge = x == x0 || x == x2 || y == y0 || y == y2;
    (x0, y0, x2, y2, usize::from(on_edge))
}

/// Whether the pixel at `(x, y)` of `img` looks like an anti-aliased edge
fn antialiased(img: &RgbaImage, x: u32, y: u32, other: &RgbaImage) -> bool {
    let (x0, y0, x2, y2, mut zeroes) = neighbourhood(img, x, y);
    let center = img.get_pixel(x, y);

    let mut min = 0.0;
    let mut max = 0.0;
    let mut darkest = None;
    let mut brightest = None;

    for nx in x0..=x2 {
        for ny in y0..=y2 {
            if nx == x && ny == y {
                continue;
            }
            let delta = color_delta(center, img.get_pixel(nx, ny), true);
            if delta == 0.0 {
                zeroes += 1;
                if zeroes > 2 {
                    return false;
                }
            } else if delta < min {
                min = delta;
                darkest = Some((nx, ny));
            } else if delta > max {
                max = delta;
                brightest = Some((nx, ny));
            }
        }
    }

    let (Some((dx, dy)), Some((bx, by))) = (darkest, brightest) else {
        return false;
    };

    (has_many_siblings(img, dx, dy) && has_many_siblings(other, dx, dy))
        || (has_many_siblings(img, bx, by) && has_many_siblings(other, bx, by))
}

/// Whether the pixel has three or more identical neighbours
fn has_many_siblings(img: &RgbaImage, x: u32, y: u32) -> bool {
    let (x0, y0, x2, y2, mut zeroes) = neighbourhood(img, x, y);
    let center = img.get_pixel(x, y);

    for nx in x0..=x2 {
        for ny in y0..=y2 {
            if nx == x && ny == y {
                continue;
            }
            if img.get_pixel(nx, ny) == center {
                zeroes += 1;
            }
            if zeroes > 2 {
                return true;
            }
        }
    }
    false
}
