use crate::coords::Color32;
use crate::render::SpriteFlags;

/// Sprite index of a cell that draws nothing.
pub const SPRITE_EMPTY: u32 = u32::MAX;

/// One map cell.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Tile {
    pub sprite: u32,
    pub tint: Color32,
    /// Palette swap applied to indexed sheets.
    pub swap: u16,
    pub flags: SpriteFlags,
}

impl Tile {
    pub const EMPTY: Tile = Tile {
        sprite: SPRITE_EMPTY,
        tint: Color32::WHITE,
        swap: 0,
        flags: SpriteFlags::empty(),
    };

    pub fn new(sprite: u32, tint: Color32, swap: u16, flags: SpriteFlags) -> Self {
        Self { sprite, tint, swap, flags }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sprite == SPRITE_EMPTY
    }
}

impl Default for Tile {
    fn default() -> Self {
        Tile::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tile_is_empty() {
        assert!(Tile::default().is_empty());
        assert!(!Tile::new(0, Color32::WHITE, 0, SpriteFlags::empty()).is_empty());
    }
}
