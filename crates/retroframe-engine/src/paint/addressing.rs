use std::collections::HashMap;

use crate::coords::Color32;

use super::Palette;

/// Maps (color index, palette swap) to lookup-texture coordinates.
///
/// Vertices carry the color index in `uv.x` and the lookup row in `pos.z`. Row 0 is
/// reserved for solid RGB rendering, so swap `s` lives on row `s + 1`.
/// Out-of-range inputs clamp to the last valid entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PaletteAddressing {
    max_colors: usize,
    max_swaps: usize,
}

impl PaletteAddressing {
    pub fn new(max_colors: usize, max_swaps: usize) -> Self {
        Self {
            max_colors: max_colors.max(1),
            max_swaps: max_swaps.max(1),
        }
    }

    /// Lookup column for `color_index`, in texels.
    #[inline]
    pub fn color_u(&self, color_index: usize) -> f32 {
        color_index.min(self.max_colors - 1) as f32
    }

    /// Lookup row for `swap_index`, in texels.
    #[inline]
    pub fn swap_row(&self, swap_index: usize) -> f32 {
        (swap_index.min(self.max_swaps - 1) + 1) as f32
    }

    /// Row used by RGB draws (solid white).
    #[inline]
    pub const fn solid_row(&self) -> f32 {
        0.0
    }
}

/// Converts RGBA8 pixels into index texels against `palette`.
///
/// Output texels are `[index, 0, 0, alpha]`. Exact matches win; otherwise the
/// nearest color by squared RGB distance is used. Fully transparent pixels stay
/// transparent with index 0.
pub fn palettize(rgba: &[u8], palette: &Palette) -> Vec<u8> {
    let mut out = Vec::with_capacity(rgba.len());
    let mut memo: HashMap<[u8; 3], u8> = HashMap::new();

    for px in rgba.chunks_exact(4) {
        let a = px[3];
        if a == 0 {
            out.extend_from_slice(&[0, 0, 0, 0]);
            continue;
        }

        let key = [px[0], px[1], px[2]];
        let index = *memo
            .entry(key)
            .or_insert_with(|| nearest_index(Color32::rgb(px[0], px[1], px[2]), palette.colors()));

        out.extend_from_slice(&[index, 0, 0, a]);
    }

    out
}

fn nearest_index(color: Color32, colors: &[Color32]) -> u8 {
    let mut best = 0usize;
    let mut best_d = u32::MAX;
    for (i, c) in colors.iter().enumerate() {
        let d = c.distance_sq(color);
        if d < best_d {
            best = i;
            best_d = d;
            if d == 0 {
                break;
            }
        }
    }
    best as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── addressing ────────────────────────────────────────────────────────

    #[test]
    fn swap_rows_skip_solid_row() {
        let a = PaletteAddressing::new(256, 64);
        assert_eq!(a.solid_row(), 0.0);
        assert_eq!(a.swap_row(0), 1.0);
        assert_eq!(a.swap_row(63), 64.0);
    }

    #[test]
    fn out_of_range_indices_clamp() {
        let a = PaletteAddressing::new(16, 4);
        assert_eq!(a.color_u(40), 15.0);
        assert_eq!(a.swap_row(10), 4.0);
    }

    // ── palettize ─────────────────────────────────────────────────────────

    #[test]
    fn exact_match_resolves_index() {
        let p = Palette::new(16, 1);
        let c = p.color(11);
        let out = palettize(&[c.r, c.g, c.b, 255], &p);
        assert_eq!(out, vec![11, 0, 0, 255]);
    }

    #[test]
    fn nearest_color_used_without_exact_match() {
        let mut p = Palette::new(2, 1);
        p.set_colors(&[Color32::rgb(0, 0, 0), Color32::rgb(200, 200, 200)]);
        let out = palettize(&[190, 210, 199, 128], &p);
        assert_eq!(out, vec![1, 0, 0, 128]);
    }

    #[test]
    fn transparent_pixels_stay_transparent() {
        let p = Palette::new(16, 1);
        assert_eq!(palettize(&[255, 255, 255, 0], &p), vec![0, 0, 0, 0]);
    }
}
