//! Procedural sprite sheet and palette.

use retroframe_engine::coords::{Color32, Size};

pub const SHEET_SIZE: Size = Size::new(64, 64);
pub const SPRITE: u32 = 8;

pub const GRASS: u32 = 0;
pub const BRICK: u32 = 1;
pub const WATER: u32 = 2;
pub const STAR: u32 = 3;
pub const PLAYER: u32 = 4;

/// 16 color palette; index 0 is transparent black.
pub fn palette() -> Vec<Color32> {
    [
        0x00000000u32, 0x1d2b53ff, 0x7e2553ff, 0x008751ff,
        0xab5236ff, 0x5f574fff, 0xc2c3c7ff, 0xfff1e8ff,
        0xff004dff, 0xffa300ff, 0xffec27ff, 0x00e436ff,
        0x29adffff, 0x83769cff, 0xff77a8ff, 0xffccaaff,
    ]
    .iter()
    .map(|&c| {
        let [r, g, b, a] = c.to_be_bytes();
        Color32::new(r, g, b, a)
    })
    .collect()
}

/// Palette swap turning greens into autumn colors.
pub fn autumn_swap() -> Vec<u8> {
    let mut mapping: Vec<u8> = (0..16).collect();
    mapping[3] = 4;
    mapping[11] = 9;
    mapping
}

/// RGBA pixels of the sheet, drawn with palette colors so it can be palettized.
pub fn build() -> Vec<u8> {
    let colors = palette();
    let mut px = vec![0u8; SHEET_SIZE.area() * 4];

    let mut put = |sprite: u32, x: u32, y: u32, index: usize| {
        let sx = (sprite % (SHEET_SIZE.width / SPRITE)) * SPRITE + x;
        let sy = (sprite / (SHEET_SIZE.width / SPRITE)) * SPRITE + y;
        let at = ((sy * SHEET_SIZE.width + sx) * 4) as usize;
        px[at..at + 4].copy_from_slice(&colors[index].to_array());
    };

    for y in 0..SPRITE {
        for x in 0..SPRITE {
            put(GRASS, x, y, if (x * 3 + y * 5) % 7 == 0 { 11 } else { 3 });
            let mortar = y % 4 == 3 || (x + if y % 8 < 4 { 0 } else { 4 }) % 8 == 0;
            put(BRICK, x, y, if mortar { 5 } else { 4 });
            put(WATER, x, y, if (x + y) % 4 == 0 { 12 } else { 1 });

            let (dx, dy) = (x as i32 - 3, y as i32 - 3);
            if dx == 0 || dy == 0 || (dx.abs() == dy.abs() && dx.abs() < 2) {
                put(STAR, x, y, 10);
            }

            let body = (1..7).contains(&x) && (1..8).contains(&y);
            let eye = y == 3 && (x == 2 || x == 5);
            if body {
                put(PLAYER, x, y, if eye { 7 } else { 8 });
            }
        }
    }
    px
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sheet_has_expected_size() {
        assert_eq!(build().len(), 64 * 64 * 4);
    }

    #[test]
    fn sheet_uses_palette_colors_only() {
        let colors = palette();
        for texel in build().chunks_exact(4) {
            let c = Color32::new(texel[0], texel[1], texel[2], texel[3]);
            assert!(colors.contains(&c), "{c:?} not in palette");
        }
    }
}
