//! Coordinate and geometry types shared across the renderer, tilemap and effects.
//!
//! Canonical CPU space:
//! - render-target pixels (fixed resolution, no DPI scaling)
//! - origin top-left
//! - +X right, +Y down
//!
//! Integer types address whole pixels; `Vec2` is used where rotation or
//! sub-pixel geometry is involved.

mod clip_rect;
mod color;
mod rect;
mod size;
mod vec2;

pub use clip_rect::ClipRect;
pub use color::Color32;
pub use rect::Rect;
pub use size::Size;
pub use vec2::{Vec2, Vec2i};
