//! Software renderer for the event log window
//!
//! Draws straight into the mapped shm region in `ARGB8888`, which the
//! protocol defines as little-endian 32-bit pixels.

pub mod font;

use font::{ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH};

pub const BACKGROUND: u32 = 0xFF00_0000;
pub const HEADER_COLOR: u32 = 0xFF00_FF00;
pub const TEXT_COLOR: u32 = 0xFFFF_FFFF;

pub const HEADER: &str = "Waysnitch (Pure Wayland/XDG Shell)";

const MARGIN_X: usize = 10;
const HEADER_Y: usize = 20;
const FIRST_LINE_Y: usize = 40;
const LINE_ADVANCE: usize = 15;

/// A borrowed pixel canvas
pub struct Canvas<'a> {
    pixels: &'a mut [u8],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a> Canvas<'a> {
    /// Wraps `pixels`; rows beyond what the slice holds are clipped
    pub fn new(pixels: &'a mut [u8], width: usize, height: usize, stride: usize) -> Self {
        let height = if stride == 0 { 0 } else { height.min(pixels.len() / stride) };
        let width = width.min(stride / 4);
        Self {
            pixels,
            width,
            height,
            stride,
        }
    }

    pub fn clear(&mut self, color: u32) {
        let bytes = color.to_le_bytes();
        for y in 0..self.height {
            let row = &mut self.pixels[y * self.stride..y * self.stride + self.width * 4];
            for px in row.chunks_exact_mut(4) {
                px.copy_from_slice(&bytes);
            }
        }
    }

    pub fn put(&mut self, x: usize, y: usize, color: u32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let offset = y * self.stride + x * 4;
        self.pixels[offset..offset + 4].copy_from_slice(&color.to_le_bytes());
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = y * self.stride + x * 4;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.pixels[offset..offset + 4]);
        Some(u32::from_le_bytes(bytes))
    }

    /// Draws `text` with its baseline row at `y`
    pub fn draw_text(&mut self, text: &str, x: usize, y: usize, color: u32) {
        let top = match y.checked_sub(GLYPH_HEIGHT) {
            Some(top) => top,
            None => return,
        };

        let mut pen = x;
        for c in text.chars() {
            if pen >= self.width {
                break;
            }
            let rows = font::glyph(c);
            for (dy, bits) in rows.iter().enumerate() {
                for dx in 0..GLYPH_WIDTH {
                    if bits & (1 << (GLYPH_WIDTH - 1 - dx)) != 0 {
                        self.put(pen + dx, top + dy, color);
                    }
                }
            }
            pen += ADVANCE;
        }
    }
}

/// Redraws a full frame: background, header, then one line per entry
pub fn draw_frame(pixels: &mut [u8], width: usize, height: usize, stride: usize, lines: &[String]) {
    let mut canvas = Canvas::new(pixels, width, height, stride);
    canvas.clear(BACKGROUND);
    canvas.draw_text(HEADER, MARGIN_X, HEADER_Y, HEADER_COLOR);

    let mut y = FIRST_LINE_Y;
    for line in lines {
        if y >= canvas.height + GLYPH_HEIGHT {
            break;
        }
        canvas.draw_text(line, MARGIN_X, y, TEXT_COLOR);
        y += LINE_ADVANCE;
    }
}
