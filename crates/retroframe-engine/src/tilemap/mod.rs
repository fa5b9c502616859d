//! Layered tile maps drawn through cached per-chunk meshes.

mod cache;
mod chunk;
mod mesh_arena;
mod tile;

pub use cache::TilemapChunkCache;
pub use chunk::ChunkInfo;
pub use mesh_arena::{MeshArena, MeshHandle};
pub use tile::{Tile, SPRITE_EMPTY};
