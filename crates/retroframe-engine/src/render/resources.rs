use crate::coords::{Rect, Size};

use super::backend::{FilterMode, ShaderId, SurfaceId, TextureId};

/// Sprite grid geometry of a sheet; what UV computation depends on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SheetLayout {
    pub texture_size: Size,
    pub sprite_size: Size,
    pub columns: u32,
    pub rows: u32,
}

impl SheetLayout {
    pub fn new(texture_size: Size, sprite_size: Size) -> Self {
        let columns = texture_size.width / sprite_size.width.max(1);
        let rows = texture_size.height / sprite_size.height.max(1);
        Self { texture_size, sprite_size, columns, rows }
    }

    #[inline]
    pub fn sprite_count(&self) -> u32 {
        self.columns * self.rows
    }

    /// Texel rectangle of sprite `index`, or `None` past the end of the sheet.
    pub fn sprite_rect(&self, index: u32) -> Option<Rect> {
        if index >= self.sprite_count() {
            return None;
        }
        let col = index % self.columns;
        let row = index / self.columns;
        Some(Rect::new(
            (col * self.sprite_size.width) as i32,
            (row * self.sprite_size.height) as i32,
            self.sprite_size.width as i32,
            self.sprite_size.height as i32,
        ))
    }
}

/// Sprite sheet creation parameters.
#[derive(Debug, Clone)]
pub struct SpriteSheetDesc<'a> {
    pub size: Size,
    pub sprite_size: Size,
    /// Tightly packed RGBA8.
    pub rgba: &'a [u8],
    /// Convert RGB texels to palette indices against the current palette.
    pub palettize: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SpriteSheet {
    pub texture: TextureId,
    pub layout: SheetLayout,
    /// Texels hold palette indices in the red channel.
    pub indexed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ShaderEntry {
    pub id: ShaderId,
    pub passes: u32,
    /// Filters applied to offscreen surfaces while this shader draws.
    pub offscreen_filters: Vec<(usize, FilterMode)>,
}

/// Lazily created offscreen render target.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct Offscreen {
    pub size: Size,
    pub surface: Option<SurfaceId>,
    /// Created size of `surface`; differs from `size` after a re-setup.
    pub allocated: Size,
    /// Clear to transparent on next use.
    pub needs_clear: bool,
}

impl Offscreen {
    pub fn new(size: Size) -> Self {
        Self { size, surface: None, allocated: Size::default(), needs_clear: true }
    }
}

/// Texture sampled by textured draws.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum SpriteSource {
    #[default]
    None,
    Sheet(usize),
    Offscreen(usize),
}

/// Surface receiving draws.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum RenderTarget {
    /// The current front buffer.
    #[default]
    Onscreen,
    Offscreen(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_derives_grid() {
        let l = SheetLayout::new(Size::new(64, 32), Size::new(16, 16));
        assert_eq!((l.columns, l.rows), (4, 2));
        assert_eq!(l.sprite_count(), 8);
    }

    #[test]
    fn sprite_rect_walks_rows() {
        let l = SheetLayout::new(Size::new(64, 32), Size::new(16, 16));
        assert_eq!(l.sprite_rect(5), Some(Rect::new(16, 16, 16, 16)));
        assert_eq!(l.sprite_rect(8), None);
    }
}
