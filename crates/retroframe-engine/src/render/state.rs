use crate::coords::{Color32, Rect, Vec2i};

use super::resources::{RenderTarget, SpriteSource};

/// Snapshot of the renderer's bound draw state.
///
/// Captured by value around effect captures and restored afterwards.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DrawState {
    pub camera: Vec2i,
    pub alpha: u8,
    pub tint: Color32,
    pub palette_swap: usize,
    /// `None` covers the whole target.
    pub clip: Option<Rect>,
    pub target: RenderTarget,
    pub sprite_source: SpriteSource,
    pub shader: Option<usize>,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            camera: Vec2i::zero(),
            alpha: 255,
            tint: Color32::WHITE,
            palette_swap: 0,
            clip: None,
            target: RenderTarget::Onscreen,
            sprite_source: SpriteSource::None,
            shader: None,
        }
    }
}

impl DrawState {
    /// Tint with global alpha folded in; multiplied into every vertex color.
    #[inline]
    pub fn vertex_modulation(&self) -> Color32 {
        let a = ((self.tint.a as u16 * self.alpha as u16 + 127) / 255) as u8;
        self.tint.with_alpha(a)
    }
}
