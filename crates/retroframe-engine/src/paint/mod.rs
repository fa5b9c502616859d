//! Ink model shared by the renderer and the tilemap.
//!
//! Scope:
//! - paint sources for solid draws (palette index or direct RGB)
//! - the palette and its swap rows, backing the system lookup texture
//! - palette addressing (color index / swap row to lookup coordinates)
//!
//! Geometry types remain in `coords`.

mod addressing;
mod paint;
mod palette;

pub use addressing::{palettize, PaletteAddressing};
pub use paint::Paint;
pub use palette::Palette;
