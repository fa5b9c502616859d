//! Primitive draw calls on `Renderer`.
//!
//! Every primitive reserves batch room first, then builds target-space geometry,
//! culls it against the clip, resolves its texture binding and appends.

mod ellipse;
mod line;
mod mesh;
mod quad;
mod texture;

pub use texture::NineSlice;

use crate::coords::Vec2;

/// Axis-aligned quad corners in TL, TR, BR, BL order.
#[inline]
pub(crate) fn quad_corners(origin: Vec2, width: f32, height: f32) -> [Vec2; 4] {
    [
        origin,
        Vec2::new(origin.x + width, origin.y),
        Vec2::new(origin.x + width, origin.y + height),
        Vec2::new(origin.x, origin.y + height),
    ]
}
