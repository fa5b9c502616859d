use crate::coords::Vec2;
use crate::paint::PaletteAddressing;
use crate::render::{oriented_uvs, PreparedMesh, SheetLayout, SpriteFlags, Vertex, FLAGS_SHEET};

use super::mesh_arena::MeshHandle;
use super::tile::Tile;

/// Cached mesh state of one chunk-sized block of a layer.
#[derive(Debug, Default)]
pub(crate) struct Chunk {
    /// Allocated on first write.
    pub tiles: Option<Box<[Tile]>>,
    pub mesh: Option<MeshHandle>,
    pub dirty: bool,
    /// Mesh reclaimed by maintenance; rebuilt on next draw.
    pub released: bool,
    pub non_empty_tiles: u32,
    pub last_relevant_frame: u64,
    /// Listed in the cache's active chunks.
    pub active: bool,
}

impl Chunk {
    #[inline]
    pub fn needs_rebuild(&self) -> bool {
        self.dirty || self.released || self.mesh.is_none()
    }

    pub fn tile(&self, index: usize) -> Tile {
        self.tiles
            .as_ref()
            .and_then(|t| t.get(index).copied())
            .unwrap_or(Tile::EMPTY)
    }
}

/// Snapshot of a chunk's bookkeeping.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ChunkInfo {
    pub dirty: bool,
    pub released: bool,
    pub non_empty_tiles: u32,
    pub has_mesh: bool,
    pub last_relevant_frame: u64,
}

impl From<&Chunk> for ChunkInfo {
    fn from(c: &Chunk) -> Self {
        Self {
            dirty: c.dirty,
            released: c.released,
            non_empty_tiles: c.non_empty_tiles,
            has_mesh: c.mesh.is_some(),
            last_relevant_frame: c.last_relevant_frame,
        }
    }
}

/// Fills `mesh` with one quad per non-empty tile, in raster order.
///
/// Positions are local to the chunk's top-left corner. Generation stops once
/// `non_empty` tiles have been visited; tiles are never written while a chunk is
/// being built, so the count is exact. Sprites past the end of the sheet are
/// skipped. Returns the number of quads emitted.
pub(crate) fn build_chunk_mesh(
    tiles: &[Tile],
    chunk_width: u32,
    non_empty: u32,
    layout: SheetLayout,
    addressing: PaletteAddressing,
    mesh: &mut PreparedMesh,
) -> usize {
    mesh.clear();
    let (tw, th) = (layout.sprite_size.width as f32, layout.sprite_size.height as f32);

    let mut seen = 0;
    let mut emitted = 0;
    for (i, tile) in tiles.iter().enumerate() {
        if seen == non_empty {
            break;
        }
        if tile.is_empty() {
            continue;
        }
        seen += 1;

        let Some(src) = layout.sprite_rect(tile.sprite) else {
            continue;
        };

        let x = (i as u32 % chunk_width) as f32 * tw;
        let y = (i as u32 / chunk_width) as f32 * th;
        let row = addressing.swap_row(tile.swap as usize);
        let uv = oriented_uvs(src, tile.flags);
        // Rotated tiles keep the cell origin and swap extents, like `draw_sprite`.
        let (w, h) = if tile.flags.contains(SpriteFlags::ROT_90) { (th, tw) } else { (tw, th) };
        let corners = [
            Vec2::new(x, y),
            Vec2::new(x + w, y),
            Vec2::new(x + w, y + h),
            Vec2::new(x, y + h),
        ];
        let v = |k: usize| Vertex::new(corners[k], row, uv[k], FLAGS_SHEET, tile.tint);
        mesh.push_quad([v(0), v(1), v(2), v(3)]);
        emitted += 1;
    }
    emitted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::{Color32, Size};
    use crate::render::SpriteFlags;

    fn layout() -> SheetLayout {
        SheetLayout::new(Size::new(64, 32), Size::new(8, 8))
    }

    fn addressing() -> PaletteAddressing {
        PaletteAddressing::new(256, 64)
    }

    fn tiles_with(entries: &[(usize, u32)]) -> Vec<Tile> {
        let mut tiles = vec![Tile::EMPTY; 16];
        for &(i, sprite) in entries {
            tiles[i] = Tile::new(sprite, Color32::WHITE, 0, SpriteFlags::empty());
        }
        tiles
    }

    #[test]
    fn one_quad_per_non_empty_tile() {
        let tiles = tiles_with(&[(0, 5), (5, 1)]);
        let mut mesh = PreparedMesh::new();
        let n = build_chunk_mesh(&tiles, 4, 2, layout(), addressing(), &mut mesh);
        assert_eq!(n, 2);
        assert_eq!(mesh.vertices.len(), 8);
        // tile 5 of a 4-wide chunk sits at (1, 1)
        assert_eq!(mesh.vertices[4].position(), Vec2::new(8.0, 8.0));
    }

    #[test]
    fn uvs_follow_sheet_layout() {
        let tiles = tiles_with(&[(0, 9)]);
        let mut mesh = PreparedMesh::new();
        build_chunk_mesh(&tiles, 4, 1, layout(), addressing(), &mut mesh);
        // 8 columns: sprite 9 is column 1, row 1
        assert_eq!(mesh.vertices[0].uv, [8.0, 8.0]);
        assert_eq!(mesh.vertices[2].uv, [16.0, 16.0]);
        assert_eq!(mesh.vertices[0].flags, FLAGS_SHEET);
    }

    #[test]
    fn flipped_tile_permutes_uvs() {
        let mut tiles = tiles_with(&[]);
        tiles[0] = Tile::new(0, Color32::WHITE, 0, SpriteFlags::FLIP_H);
        let mut mesh = PreparedMesh::new();
        build_chunk_mesh(&tiles, 4, 1, layout(), addressing(), &mut mesh);
        assert_eq!(mesh.vertices[0].uv, [8.0, 0.0]);
        assert_eq!(mesh.vertices[1].uv, [0.0, 0.0]);
    }

    #[test]
    fn swap_selects_lookup_row() {
        let mut tiles = tiles_with(&[]);
        tiles[0] = Tile::new(0, Color32::WHITE, 3, SpriteFlags::empty());
        let mut mesh = PreparedMesh::new();
        build_chunk_mesh(&tiles, 4, 1, layout(), addressing(), &mut mesh);
        assert_eq!(mesh.vertices[0].pos[2], 4.0);
    }

    #[test]
    fn generation_stops_at_non_empty_count() {
        let tiles = tiles_with(&[(0, 1), (1, 2), (2, 3)]);
        let mut mesh = PreparedMesh::new();
        assert_eq!(build_chunk_mesh(&tiles, 4, 2, layout(), addressing(), &mut mesh), 2);
    }

    #[test]
    fn sprites_past_sheet_end_are_skipped() {
        let tiles = tiles_with(&[(0, 1000), (1, 0)]);
        let mut mesh = PreparedMesh::new();
        assert_eq!(build_chunk_mesh(&tiles, 4, 2, layout(), addressing(), &mut mesh), 1);
    }

    #[test]
    fn rotated_tall_tile_swaps_extents() {
        let tall = SheetLayout::new(Size::new(64, 32), Size::new(8, 16));
        let mut tiles = tiles_with(&[]);
        tiles[1] = Tile::new(0, Color32::WHITE, 0, SpriteFlags::ROT_90);
        tiles[2] = Tile::new(0, Color32::WHITE, 0, SpriteFlags::empty());
        let mut mesh = PreparedMesh::new();
        build_chunk_mesh(&tiles, 4, 2, tall, addressing(), &mut mesh);

        let corner = |v: usize| [mesh.vertices[v].pos[0], mesh.vertices[v].pos[1]];
        // rotated: 16 wide, 8 tall, anchored at its cell origin
        assert_eq!(corner(0), [8.0, 0.0]);
        assert_eq!(corner(2), [24.0, 8.0]);
        // unrotated neighbour keeps the cell size
        assert_eq!(corner(4), [16.0, 0.0]);
        assert_eq!(corner(6), [24.0, 16.0]);
    }
}
