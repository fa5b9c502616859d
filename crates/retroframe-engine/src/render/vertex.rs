use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};

use crate::coords::{Color32, Rect, Vec2};

/// Batch vertex.
///
/// - `pos.xy` is in render-target pixels, `pos.z` is the palette lookup row
/// - `uv` is in texels of whichever texture `flags` selects; for solid draws `uv.x`
///   is the color index
/// - `flags.x = 1` samples the bound sprite sheet, `flags.y = 1` the bound offscreen
///   surface, both zero the system lookup texture
/// - `color` is straight-alpha tint with global alpha already applied
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub uv: [f32; 2],
    pub flags: [f32; 2],
    pub color: [u8; 4],
}

pub(crate) const FLAGS_SYSTEM: [f32; 2] = [0.0, 0.0];
pub(crate) const FLAGS_SHEET: [f32; 2] = [1.0, 0.0];
pub(crate) const FLAGS_OFFSCREEN: [f32; 2] = [0.0, 1.0];

impl Vertex {
    const ATTRS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x3, // pos + lookup row
        1 => Float32x2, // uv
        2 => Float32x2, // source flags
        3 => Unorm8x4   // color
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }

    #[inline]
    pub fn new(p: Vec2, row: f32, uv: [f32; 2], flags: [f32; 2], color: Color32) -> Self {
        Self {
            pos: [p.x, p.y, row],
            uv,
            flags,
            color: color.to_array(),
        }
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.pos[0], self.pos[1])
    }
}

bitflags! {
    /// Orientation of a sprite or tile inside its destination rectangle.
    ///
    /// Rotation is applied first, then the flips, both in destination space.
    #[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
    pub struct SpriteFlags: u8 {
        const FLIP_H = 0b001;
        const FLIP_V = 0b010;
        const ROT_90 = 0b100;
    }
}

/// Texel UVs for the destination corners `[top-left, top-right, bottom-right, bottom-left]`.
pub fn oriented_uvs(src: Rect, flags: SpriteFlags) -> [[f32; 2]; 4] {
    let x0 = src.x as f32;
    let y0 = src.y as f32;
    let x1 = src.right() as f32;
    let y1 = src.bottom() as f32;

    let mut uv = [[x0, y0], [x1, y0], [x1, y1], [x0, y1]];

    if flags.contains(SpriteFlags::ROT_90) {
        // Clockwise: the source's left edge ends up on top.
        uv = [uv[3], uv[0], uv[1], uv[2]];
    }
    if flags.contains(SpriteFlags::FLIP_H) {
        uv = [uv[1], uv[0], uv[3], uv[2]];
    }
    if flags.contains(SpriteFlags::FLIP_V) {
        uv = [uv[3], uv[2], uv[1], uv[0]];
    }

    uv
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: Rect = Rect::new(16, 8, 8, 8);

    #[test]
    fn vertex_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), 32);
    }

    #[test]
    fn unflipped_uvs_follow_corners() {
        let uv = oriented_uvs(SRC, SpriteFlags::empty());
        assert_eq!(uv[0], [16.0, 8.0]);
        assert_eq!(uv[2], [24.0, 16.0]);
    }

    #[test]
    fn flip_h_swaps_columns() {
        let uv = oriented_uvs(SRC, SpriteFlags::FLIP_H);
        assert_eq!(uv[0], [24.0, 8.0]);
        assert_eq!(uv[1], [16.0, 8.0]);
    }

    #[test]
    fn flip_v_swaps_rows() {
        let uv = oriented_uvs(SRC, SpriteFlags::FLIP_V);
        assert_eq!(uv[0], [16.0, 16.0]);
        assert_eq!(uv[3], [16.0, 8.0]);
    }

    #[test]
    fn rot_90_puts_bottom_left_on_top_left() {
        let uv = oriented_uvs(SRC, SpriteFlags::ROT_90);
        assert_eq!(uv[0], [16.0, 16.0]);
        assert_eq!(uv[1], [16.0, 8.0]);
    }
}
