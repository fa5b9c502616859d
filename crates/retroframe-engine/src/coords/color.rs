/// Straight-alpha RGBA color, one byte per channel.
///
/// This is the vertex tint format and the palette entry format. The GPU sees it as
/// `Unorm8x4`, so channel math on the CPU stays in integer space.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Color32 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color32 {
    pub const WHITE: Color32 = Color32::new(255, 255, 255, 255);
    pub const BLACK: Color32 = Color32::new(0, 0, 0, 255);
    pub const TRANSPARENT: Color32 = Color32::new(0, 0, 0, 0);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    #[inline]
    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Channel-wise multiply (`a * b / 255`), used to apply tint and global alpha.
    #[inline]
    pub fn modulate(self, other: Color32) -> Color32 {
        #[inline]
        fn mul(a: u8, b: u8) -> u8 {
            ((a as u16 * b as u16 + 127) / 255) as u8
        }
        Color32::new(
            mul(self.r, other.r),
            mul(self.g, other.g),
            mul(self.b, other.b),
            mul(self.a, other.a),
        )
    }

    #[inline]
    pub fn with_alpha(self, a: u8) -> Color32 {
        Color32 { a, ..self }
    }

    /// Squared RGB distance, used when matching colors against a palette.
    #[inline]
    pub fn distance_sq(self, other: Color32) -> u32 {
        let dr = self.r as i32 - other.r as i32;
        let dg = self.g as i32 - other.g as i32;
        let db = self.b as i32 - other.b as i32;
        (dr * dr + dg * dg + db * db) as u32
    }
}

impl Default for Color32 {
    fn default() -> Self {
        Color32::WHITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modulate_by_white_is_identity() {
        let c = Color32::new(10, 20, 30, 40);
        assert_eq!(c.modulate(Color32::WHITE), c);
    }

    #[test]
    fn modulate_by_transparent_clears() {
        let c = Color32::new(10, 20, 30, 40);
        assert_eq!(c.modulate(Color32::TRANSPARENT), Color32::TRANSPARENT);
    }

    #[test]
    fn modulate_halves_alpha() {
        let c = Color32::WHITE.modulate(Color32::new(255, 255, 255, 128));
        assert_eq!(c.a, 128);
    }
}
