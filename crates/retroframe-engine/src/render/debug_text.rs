//! Built-in 3x5 debug font.
//!
//! Only what diagnostics need: digits, uppercase letters and a little punctuation.
//! Lowercase letters draw as uppercase; anything else draws as `?`.

use crate::coords::{Color32, Rect, Vec2i};
use crate::paint::Paint;

use super::backend::GraphicsBackend;
use super::flush::FlushReason;
use super::renderer::Renderer;

pub const GLYPH_WIDTH: i32 = 3;
pub const GLYPH_HEIGHT: i32 = 5;
pub const ADVANCE: i32 = 4;
pub const LINE_HEIGHT: i32 = 6;

/// Rows top to bottom; bit 2 is the leftmost column.
fn glyph(c: char) -> [u8; 5] {
    match c.to_ascii_uppercase() {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b011, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b010, 0b010, 0b010],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'A' => [0b010, 0b101, 0b111, 0b101, 0b101],
        'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'C' => [0b011, 0b100, 0b100, 0b100, 0b011],
        'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'E' => [0b111, 0b100, 0b110, 0b100, 0b111],
        'F' => [0b111, 0b100, 0b110, 0b100, 0b100],
        'G' => [0b011, 0b100, 0b101, 0b101, 0b011],
        'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'J' => [0b001, 0b001, 0b001, 0b101, 0b010],
        'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'M' => [0b101, 0b111, 0b111, 0b101, 0b101],
        'N' => [0b110, 0b101, 0b101, 0b101, 0b101],
        'O' => [0b010, 0b101, 0b101, 0b101, 0b010],
        'P' => [0b110, 0b101, 0b110, 0b100, 0b100],
        'Q' => [0b010, 0b101, 0b101, 0b110, 0b011],
        'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        'S' => [0b011, 0b100, 0b010, 0b001, 0b110],
        'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'V' => [0b101, 0b101, 0b101, 0b101, 0b010],
        'W' => [0b101, 0b101, 0b111, 0b111, 0b101],
        'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'Y' => [0b101, 0b101, 0b010, 0b010, 0b010],
        'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        ' ' => [0; 5],
        _ => [0b111, 0b001, 0b010, 0b000, 0b010],
    }
}

/// Horizontal runs of set bits in a glyph row as `(column, length)`.
fn runs(bits: u8) -> impl Iterator<Item = (i32, i32)> {
    let mut col = 0;
    std::iter::from_fn(move || {
        while col < GLYPH_WIDTH && bits & (0b100 >> col) == 0 {
            col += 1;
        }
        if col >= GLYPH_WIDTH {
            return None;
        }
        let start = col;
        while col < GLYPH_WIDTH && bits & (0b100 >> col) != 0 {
            col += 1;
        }
        Some((start, col - start))
    })
}

/// Pixel size of `text` when drawn with the debug font.
pub fn measure(text: &str) -> (i32, i32) {
    let lines = text.split('\n');
    let mut width = 0;
    let mut count = 0;
    for line in lines {
        let chars = line.chars().count() as i32;
        width = width.max((chars * ADVANCE - 1).max(0));
        count += 1;
    }
    (width, count * LINE_HEIGHT - 1)
}

impl<B: GraphicsBackend> Renderer<B> {
    /// Draws `text` with the debug font; `\n` starts a new line.
    pub fn draw_debug_text(&mut self, pos: Vec2i, text: &str, paint: Paint) {
        let mut pen = pos;
        for c in text.chars() {
            if c == '\n' {
                pen = Vec2i::new(pos.x, pen.y + LINE_HEIGHT);
                continue;
            }
            for (row, bits) in glyph(c).into_iter().enumerate() {
                for (col, len) in runs(bits) {
                    self.draw_rect_fill(Rect::new(pen.x + col, pen.y + row as i32, len, 1), paint);
                }
            }
            pen.x += ADVANCE;
        }
    }

    /// Previous frame's flush counters, one line per reason.
    pub(crate) fn draw_flush_overlay(&mut self) {
        let mut lines = Vec::with_capacity(FlushReason::COUNT + 1);
        lines.push(format!("FLUSH {}", self.stats().previous_total()));
        for reason in FlushReason::ALL {
            lines.push(format!("{}:{}", reason.label(), self.stats().previous(reason)));
        }
        let text = lines.join("\n");

        let (w, h) = measure(&text);
        self.draw_rect_fill(
            Rect::new(1, 1, w + 4, h + 4),
            Paint::Rgb(Color32::new(0, 0, 0, 192)),
        );
        self.draw_debug_text(Vec2i::new(3, 3), &text, Paint::Rgb(Color32::WHITE));
    }
}
