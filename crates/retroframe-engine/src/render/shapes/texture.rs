use crate::coords::{Rect, Vec2, Vec2i};
use crate::render::backend::GraphicsBackend;
use crate::render::renderer::Renderer;
use crate::render::resources::SpriteSource;
use crate::render::vertex::{oriented_uvs, SpriteFlags};

use super::quad_corners;

/// Source rectangle split into a 3x3 grid by fixed borders.
///
/// Corners keep their size, edges stretch along one axis and the center along both.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct NineSlice {
    pub src: Rect,
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl NineSlice {
    pub fn new(src: Rect, left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { src, left, top, right, bottom }
    }

    /// Cell edges along one axis, clamped so borders never overlap.
    fn edges(start: i32, len: i32, lead: i32, trail: i32) -> [i32; 4] {
        let lead = lead.clamp(0, len);
        let trail = trail.clamp(0, len - lead);
        [start, start + lead, start + len - trail, start + len]
    }
}

impl<B: GraphicsBackend> Renderer<B> {
    /// Draws texel rectangle `src` of the bound sprite source into `dest`.
    pub fn draw_texture(&mut self, src: Rect, dest: Rect, flags: SpriteFlags) {
        self.textured_quad(src, dest, flags, None);
    }

    /// Like `draw_texture`, rotated by `degrees` about `pivot` (world pixels).
    pub fn draw_texture_rotated(
        &mut self,
        src: Rect,
        dest: Rect,
        flags: SpriteFlags,
        pivot: Vec2,
        degrees: f32,
    ) {
        let rotation = (degrees != 0.0).then_some((pivot, degrees));
        self.textured_quad(src, dest, flags, rotation);
    }

    /// Draws sprite `index` of the bound sprite sheet at `pos`.
    ///
    /// `ROT_90` swaps the destination's width and height.
    pub fn draw_sprite(&mut self, index: u32, pos: Vec2i, flags: SpriteFlags) {
        let SpriteSource::Sheet(slot) = self.sprite_source() else {
            log::debug!("draw_sprite: no sprite sheet bound");
            return;
        };
        let Some(layout) = self.sheet_layout(slot) else {
            log::debug!("draw_sprite: sprite sheet {slot} is empty");
            return;
        };
        let Some(src) = layout.sprite_rect(index) else {
            log::debug!("draw_sprite: sprite {index} outside sheet {slot}");
            return;
        };
        let (w, h) = if flags.contains(SpriteFlags::ROT_90) {
            (src.height, src.width)
        } else {
            (src.width, src.height)
        };
        self.textured_quad(src, Rect::new(pos.x, pos.y, w, h), flags, None);
    }

    pub fn draw_nine_slice(&mut self, dest: Rect, slice: &NineSlice) {
        let dest = dest.normalized();
        let src = slice.src.normalized();
        if dest.is_empty() || src.is_empty() {
            return;
        }

        let sx = NineSlice::edges(src.x, src.width, slice.left, slice.right);
        let sy = NineSlice::edges(src.y, src.height, slice.top, slice.bottom);
        let dx = NineSlice::edges(dest.x, dest.width, slice.left, slice.right);
        let dy = NineSlice::edges(dest.y, dest.height, slice.top, slice.bottom);

        for row in 0..3 {
            for col in 0..3 {
                let s = Rect::new(sx[col], sy[row], sx[col + 1] - sx[col], sy[row + 1] - sy[row]);
                let d = Rect::new(dx[col], dy[row], dx[col + 1] - dx[col], dy[row + 1] - dy[row]);
                self.textured_quad(s, d, SpriteFlags::empty(), None);
            }
        }
    }

    fn textured_quad(
        &mut self,
        src: Rect,
        dest: Rect,
        flags: SpriteFlags,
        rotation: Option<(Vec2, f32)>,
    ) {
        let dest = dest.normalized();
        if dest.is_empty() || src.is_empty() || !self.begin_primitive(4, 6) {
            return;
        }

        let mut corners =
            quad_corners(self.to_target(dest.origin()), dest.width as f32, dest.height as f32);
        if let Some((pivot, degrees)) = rotation {
            let pivot = pivot - self.camera().to_f32();
            corners = corners.map(|c| c.rotated_about(pivot, degrees));
        }
        if self.rejects(&corners) {
            return;
        }

        let Some(ink) = self.textured_ink() else { return };
        let uvs = oriented_uvs(src, flags);
        self.batch.push_quad([0, 1, 2, 3].map(|i| ink.textured_vertex(corners[i], uvs[i])));
    }
}
