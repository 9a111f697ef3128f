//! Synthetic page rendering for dry runs and tests.
//!
//! [`Framebuffer`] is a small RGB drawing surface (fill, rectangles, font8x8
//! text). [`SyntheticAcquirer`] uses it to render a deterministic stand-in
//! "page" for a URL: the layout depends on the path, the header text on the
//! full URL, so staging and production differ only where their hosts do.

use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{ImageBuffer, RgbImage};
use std::io::Cursor;

use super::backend::{Acquirer, commit_part};
use super::types::{CaptureError, CaptureRequest, CaptureResult};

/// A virtual framebuffer for programmatic drawing
#[derive(Debug, Clone)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    /// RGB pixel buffer (row-major, 3 bytes per pixel)
    buffer: Vec<u8>,
}

impl Framebuffer {
    /// Create a new framebuffer with the given dimensions, initialized to black
    pub fn new(width: u32, height: u32) -> Self {
        let buffer = vec![0u8; (width as usize) * (height as usize) * 3];
        Self {
            width,
            height,
            buffer,
        }
    }

    /// Create a framebuffer initialized to a specific color
    pub fn with_color(width: u32, height: u32, color: [u8; 3]) -> Self {
        let mut fb = Self::new(width, height);
        fb.fill(color);
        fb
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Fill the entire framebuffer with a color
    pub fn fill(&mut self, color: [u8; 3]) {
        for chunk in self.buffer.chunks_exact_mut(3) {
            chunk.copy_from_slice(&color);
        }
    }

    /// Draw a filled rectangle, clipped to the framebuffer
    pub fn draw_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: [u8; 3]) {
        for py in y..y.saturating_add(h).min(self.height) {
            for px in x..x.saturating_add(w).min(self.width) {
                self.set_pixel(px, py, color);
            }
        }
    }

    /// Draw text using font8x8 glyphs, each glyph scaled by `scale`.
    ///
    /// Text does not wrap.
    pub fn draw_text(&mut self, x: u32, y: u32, text: &str, scale: u32, fg: [u8; 3], bg: [u8; 3]) {
        let scale = scale.max(1);
        let mut cursor_x = x;
        for ch in text.chars() {
            if cursor_x >= self.width {
                break;
            }
            self.draw_char(cursor_x, y, ch, scale, fg, bg);
            cursor_x += 8 * scale;
        }
    }

    fn draw_char(&mut self, x: u32, y: u32, ch: char, scale: u32, fg: [u8; 3], bg: [u8; 3]) {
        let glyph = BASIC_FONTS.get(ch).unwrap_or([0u8; 8]);
        for (row_idx, row) in glyph.iter().enumerate() {
            for bit in 0..8u32 {
                // font8x8 stores LSB as leftmost pixel
                let is_fg = (row >> bit) & 1 == 1;
                let color = if is_fg { fg } else { bg };
                self.draw_rect(x + bit * scale, y + row_idx as u32 * scale, scale, scale, color);
            }
        }
    }

    /// Get the color of a pixel
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        if x >= self.width || y >= self.height {
            return [0, 0, 0];
        }
        let idx = ((y as usize) * (self.width as usize) + x as usize) * 3;
        [self.buffer[idx], self.buffer[idx + 1], self.buffer[idx + 2]]
    }

    /// Set the color of a pixel
    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = ((y as usize) * (self.width as usize) + x as usize) * 3;
        self.buffer[idx..idx + 3].copy_from_slice(&color);
    }

    /// Convert to an image buffer
    pub fn to_image(&self) -> CaptureResult<RgbImage> {
        ImageBuffer::from_raw(self.width, self.height, self.buffer.clone())
            .ok_or_else(|| CaptureError::Failed("framebuffer size mismatch".to_string()))
    }

    /// Encode the framebuffer as PNG bytes
    pub fn to_png(&self) -> CaptureResult<Vec<u8>> {
        let img = self.to_image()?;
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
        Ok(bytes)
    }
}

/// FNV-1a, used to derive a stable layout from a path
fn fnv1a(text: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in text.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01B3);
    }
    hash
}

/// Split an absolute URL into (origin, path)
fn split_url(url: &str) -> (&str, &str) {
    let after_scheme = url.find("://").map(|i| i + 3).unwrap_or(0);
    match url[after_scheme..].find('/') {
        Some(i) => url.split_at(after_scheme + i),
        None => (url, "/"),
    }
}

/// Render the stand-in page for `url` at `width` x `height`
pub fn render_page(url: &str, width: u32, height: u32) -> Framebuffer {
    let (origin, path) = split_url(url);
    let seed = fnv1a(path);
    let mut fb = Framebuffer::with_color(width, height, [255, 255, 255]);

    // Header bar with the origin
    fb.draw_rect(0, 0, width, 48, [40, 44, 52]);
    fb.draw_text(16, 16, origin, 2, [230, 230, 230], [40, 44, 52]);

    // Page title from the path
    fb.draw_text(16, 72, path, 3, [20, 20, 20], [255, 255, 255]);

    // Content blocks laid out from the path hash
    let accent = [
        (seed & 0xff) as u8,
        ((seed >> 8) & 0xff) as u8,
        ((seed >> 16) & 0xff) as u8,
    ];
    let columns = 1 + (seed >> 24) % 3;
    let gap = 16u32;
    let column_width = width.saturating_sub(gap * (columns as u32 + 1)) / columns as u32;
    for column in 0..columns as u32 {
        let x = gap + column * (column_width + gap);
        let block_height = 80 + ((seed >> (32 + column * 8)) & 0x7f) as u32;
        fb.draw_rect(x, 120, column_width, block_height, accent);
        fb.draw_rect(x, 130 + block_height, column_width, 12, [200, 200, 200]);
        fb.draw_rect(x, 150 + block_height, column_width * 2 / 3, 12, [200, 200, 200]);
    }

    fb
}

/// Acquirer that renders [`render_page`] instead of loading a browser
#[derive(Debug, Clone, Default)]
pub struct SyntheticAcquirer;

impl SyntheticAcquirer {
    pub fn new() -> Self {
        Self
    }
}

impl Acquirer for SyntheticAcquirer {
    async fn capture(&self, request: &CaptureRequest) -> CaptureResult<()> {
        let (width, height) = request.device.viewport();
        let png = render_page(&request.url, width, height).to_png()?;
        tokio::fs::write(request.part_path(), &png).await?;
        commit_part(&request.output).await
    }

    fn source_type(&self) -> &str {
        "synthetic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framebuffer_fill_and_rect() {
        let mut fb = Framebuffer::new(20, 20);
        fb.fill([10, 20, 30]);
        fb.draw_rect(5, 5, 10, 10, [255, 0, 0]);
        assert_eq!(fb.get_pixel(0, 0), [10, 20, 30]);
        assert_eq!(fb.get_pixel(5, 5), [255, 0, 0]);
        assert_eq!(fb.get_pixel(14, 14), [255, 0, 0]);
        assert_eq!(fb.get_pixel(15, 15), [10, 20, 30]);
        // Out of bounds reads are black, writes are ignored
        fb.set_pixel(100, 100, [1, 1, 1]);
        assert_eq!(fb.get_pixel(100, 100), [0, 0, 0]);
    }

    #[test]
    fn test_draw_text_has_foreground() {
        let mut fb = Framebuffer::new(80, 16);
        fb.draw_text(0, 0, "Hi", 1, [255, 255, 255], [0, 0, 0]);
        let lit = (0..8)
            .flat_map(|y| (0..8).map(move |x| (x, y)))
            .any(|(x, y)| fb.get_pixel(x, y) == [255, 255, 255]);
        assert!(lit, "Character 'H' should have some foreground pixels");
    }

    #[test]
    fn test_to_png_magic() {
        let png = Framebuffer::with_color(8, 8, [1, 2, 3]).to_png().unwrap();
        assert_eq!(&png[0..4], &[0x89, 0x50, 0x4E, 0x47]);
    }

    #[test]
    fn test_split_url() {
        assert_eq!(
            split_url("https://www.example.com/apply/?x=1"),
            ("https://www.example.com", "/apply/?x=1")
        );
        assert_eq!(split_url("https://www.example.com"), ("https://www.example.com", "/"));
    }

    #[test]
    fn test_render_page_is_deterministic() {
        let a = render_page("https://s.example.com/apply/", 320, 240);
        let b = render_page("https://s.example.com/apply/", 320, 240);
        assert_eq!(a.to_png().unwrap(), b.to_png().unwrap());

        let other = render_page("https://s.example.com/contact/", 320, 240);
        assert_ne!(a.to_png().unwrap(), other.to_png().unwrap());
    }
}
