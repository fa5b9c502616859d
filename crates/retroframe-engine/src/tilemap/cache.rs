use crate::config::HardwareConfig;
use crate::coords::{Color32, Size, Vec2i};
use crate::error::{check_slot, EngineError, SlotKind};
use crate::paint::PaletteAddressing;
use crate::render::{GraphicsBackend, PreparedMesh, Renderer, SheetLayout, SpriteFlags, SpriteSource};

use super::chunk::{build_chunk_mesh, Chunk, ChunkInfo};
use super::mesh_arena::MeshArena;
use super::tile::{Tile, SPRITE_EMPTY};

#[derive(Debug)]
struct Layer {
    sheet: Option<usize>,
    /// Layout the layer's meshes were built against.
    layout: Option<SheetLayout>,
    chunks: Vec<Chunk>,
}

impl Layer {
    fn invalidate(&mut self) {
        for chunk in &mut self.chunks {
            chunk.dirty = true;
        }
    }
}

/// Layered tile grid with one cached mesh per chunk.
///
/// Chunk meshes are rebuilt lazily when a visible chunk is dirty or was released,
/// and handed back to a tiered mesh arena once they have not been drawn for a
/// while. Tile storage of a chunk is allocated on its first write.
#[derive(Debug)]
pub struct TilemapChunkCache {
    chunk_width: u32,
    chunk_height: u32,
    chunks_x: usize,
    chunks_y: usize,
    map_size: Size,

    layers: Vec<Layer>,
    arena: MeshArena,
    /// `(layer, chunk index)` of chunks holding a mesh.
    active: Vec<(usize, usize)>,

    frame: u64,
    stale_frames: u64,
    maintenance_interval: u64,
    meshes_generated: u64,
}

impl TilemapChunkCache {
    pub fn new(config: &HardwareConfig) -> Self {
        let chunks_x = config.map_chunks_x();
        let chunks_y = config.map_chunks_y();
        let layers = (0..config.map_layers)
            .map(|_| Layer {
                sheet: None,
                layout: None,
                chunks: (0..chunks_x * chunks_y).map(|_| Chunk::default()).collect(),
            })
            .collect();

        log::debug!(
            "tilemap: {} layers of {}x{} tiles, {chunks_x}x{chunks_y} chunks",
            config.map_layers,
            config.map_size.width,
            config.map_size.height
        );

        Self {
            chunk_width: config.chunk_width,
            chunk_height: config.chunk_height,
            chunks_x,
            chunks_y,
            map_size: config.map_size,
            layers,
            arena: MeshArena::new(config.min_bucket_quads as usize, config.max_cached_meshes),
            active: Vec::new(),
            frame: 0,
            stale_frames: config.chunk_stale_frames,
            maintenance_interval: config.chunk_maintenance_interval.max(1),
            meshes_generated: 0,
        }
    }

    // ── addressing ────────────────────────────────────────────────────────

    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.map_size.width && (y as u32) < self.map_size.height
    }

    /// `(chunk index, tile index within the chunk)` of tile `(x, y)`.
    fn locate(&self, x: i32, y: i32) -> Option<(usize, usize)> {
        let (x, y) = (x as u32, y as u32);
        let cx = (x / self.chunk_width) as usize;
        let cy = (y / self.chunk_height) as usize;
        if cx >= self.chunks_x || cy >= self.chunks_y {
            log::error!("tilemap: tile ({x}, {y}) maps to chunk ({cx}, {cy}) outside the grid");
            return None;
        }
        let tile = ((y % self.chunk_height) * self.chunk_width + x % self.chunk_width) as usize;
        Some((cy * self.chunks_x + cx, tile))
    }

    fn chunk_index(&self, cx: usize, cy: usize) -> Option<usize> {
        (cx < self.chunks_x && cy < self.chunks_y).then(|| cy * self.chunks_x + cx)
    }

    // ── tiles ─────────────────────────────────────────────────────────────

    /// Writes one tile. Returns `true` when the stored tile changed.
    ///
    /// Writes outside the map are ignored. `SPRITE_EMPTY` clears the tile.
    #[allow(clippy::too_many_arguments)]
    pub fn sprite_set(
        &mut self,
        layer: usize,
        x: i32,
        y: i32,
        sprite: u32,
        tint: Color32,
        swap: u16,
        flags: SpriteFlags,
    ) -> bool {
        if layer >= self.layers.len() {
            log::warn!("sprite_set: map layer {layer} out of range (0..{})", self.layers.len());
            return false;
        }
        if !self.in_bounds(x, y) {
            return false;
        }
        let Some((ci, ti)) = self.locate(x, y) else {
            return false;
        };

        let new = if sprite == SPRITE_EMPTY { Tile::EMPTY } else { Tile::new(sprite, tint, swap, flags) };
        let chunk_tiles = (self.chunk_width * self.chunk_height) as usize;
        let chunk = &mut self.layers[layer].chunks[ci];
        let old = chunk.tile(ti);
        if old == new {
            return false;
        }

        let tiles = chunk
            .tiles
            .get_or_insert_with(|| vec![Tile::EMPTY; chunk_tiles].into_boxed_slice());
        tiles[ti] = new;

        match (old.is_empty(), new.is_empty()) {
            (true, false) => chunk.non_empty_tiles += 1,
            (false, true) => chunk.non_empty_tiles -= 1,
            _ => {}
        }
        chunk.dirty = true;

        if chunk.non_empty_tiles == 0 {
            self.drop_mesh(layer, ci);
        }
        true
    }

    /// Sprite at `(x, y)`, or `SPRITE_EMPTY` for unwritten or out-of-map cells.
    pub fn sprite_get(&self, layer: usize, x: i32, y: i32) -> u32 {
        self.tile_get(layer, x, y).sprite
    }

    pub fn tile_get(&self, layer: usize, x: i32, y: i32) -> Tile {
        if layer >= self.layers.len() || !self.in_bounds(x, y) {
            return Tile::EMPTY;
        }
        match self.locate(x, y) {
            Some((ci, ti)) => self.layers[layer].chunks[ci].tile(ti),
            None => Tile::EMPTY,
        }
    }

    // ── layers ────────────────────────────────────────────────────────────

    /// Binds sprite sheet `sheet` (with its current `layout`) to `layer`.
    ///
    /// A layout change, including to or from no sheet, marks every chunk of the
    /// layer dirty since tile UVs depend on it.
    pub fn layer_sprite_sheet_set(
        &mut self,
        layer: usize,
        sheet: Option<usize>,
        layout: Option<SheetLayout>,
    ) -> Result<(), EngineError> {
        check_slot(SlotKind::MapLayer, layer, self.layers.len())?;
        let l = &mut self.layers[layer];
        l.sheet = sheet;
        if l.layout != layout {
            log::debug!("tilemap: layer {layer} sheet layout changed, regenerating");
            l.layout = layout;
            l.invalidate();
        }
        Ok(())
    }

    pub fn layer_sprite_sheet(&self, layer: usize) -> Option<usize> {
        self.layers.get(layer).and_then(|l| l.sheet)
    }

    /// Removes every tile of `layer` and returns its meshes to the arena.
    pub fn layer_clear(&mut self, layer: usize) -> Result<(), EngineError> {
        check_slot(SlotKind::MapLayer, layer, self.layers.len())?;
        for ci in 0..self.layers[layer].chunks.len() {
            self.drop_mesh(layer, ci);
            self.layers[layer].chunks[ci] = Chunk::default();
        }
        Ok(())
    }

    pub fn map_clear(&mut self) {
        for layer in 0..self.layers.len() {
            // In range by construction.
            let _ = self.layer_clear(layer);
        }
    }

    // ── drawing ───────────────────────────────────────────────────────────

    /// Draws the chunks of `layer` that overlap the current target, with the layer's
    /// top-left tile at world position `pos`.
    ///
    /// Dirty or released chunks are rebuilt first. The renderer's sprite source is
    /// switched to the layer's sheet for the duration of the call.
    pub fn draw_map_layer<B: GraphicsBackend>(
        &mut self,
        renderer: &mut Renderer<B>,
        layer: usize,
        pos: Vec2i,
    ) {
        if !renderer.render_enabled() {
            return;
        }
        let Some(l) = self.layers.get(layer) else {
            log::warn!("draw_map_layer: map layer {layer} out of range (0..{})", self.layers.len());
            return;
        };
        let Some(sheet) = l.sheet else {
            return;
        };
        let Some(layout) = renderer.sheet_layout(sheet) else {
            log::debug!("draw_map_layer: layer {layer} sheet {sheet} is not set up");
            return;
        };
        if l.layout != Some(layout) {
            let l = &mut self.layers[layer];
            l.layout = Some(layout);
            l.invalidate();
        }

        let span_w = (self.chunk_width * layout.sprite_size.width) as i32;
        let span_h = (self.chunk_height * layout.sprite_size.height) as i32;
        if span_w <= 0 || span_h <= 0 {
            return;
        }

        // Visible region relative to the layer origin.
        let camera = renderer.camera();
        let view = renderer.target_size();
        let left = camera.x.saturating_sub(pos.x);
        let top = camera.y.saturating_sub(pos.y);
        let cx0 = left.div_euclid(span_w).max(0);
        let cy0 = top.div_euclid(span_h).max(0);
        let cx1 = left.saturating_add(view.width as i32 - 1).div_euclid(span_w).min(self.chunks_x as i32 - 1);
        let cy1 = top.saturating_add(view.height as i32 - 1).div_euclid(span_h).min(self.chunks_y as i32 - 1);
        if cx0 > cx1 || cy0 > cy1 {
            return;
        }

        let previous_source = renderer.sprite_source();
        renderer.sprite_source_set(SpriteSource::Sheet(sheet));
        let addressing = renderer.addressing();

        for cy in cy0..=cy1 {
            for cx in cx0..=cx1 {
                let ci = cy as usize * self.chunks_x + cx as usize;
                if !self.prepare_chunk(layer, ci, layout, addressing) {
                    continue;
                }
                let Some(mesh) = self.layers[layer].chunks[ci].mesh.and_then(|h| self.arena.get(h)) else {
                    continue;
                };
                renderer.draw_prepared_mesh(mesh, Vec2i::new(pos.x.saturating_add(cx * span_w), pos.y.saturating_add(cy * span_h)));
            }
        }

        renderer.sprite_source_set(previous_source);
    }

    /// Marks chunk `ci` relevant this frame and rebuilds its mesh if needed.
    /// Returns `false` when there is nothing to draw.
    fn prepare_chunk(
        &mut self,
        layer: usize,
        ci: usize,
        layout: SheetLayout,
        addressing: PaletteAddressing,
    ) -> bool {
        let chunk_width = self.chunk_width;
        let chunk = &mut self.layers[layer].chunks[ci];
        if chunk.non_empty_tiles == 0 {
            return false;
        }
        chunk.last_relevant_frame = self.frame;

        if chunk.needs_rebuild() {
            let needed = chunk.non_empty_tiles as usize;
            let tier_quads = self.arena.tier_quads(self.arena.tier_for(needed));
            let handle = match chunk.mesh.take() {
                Some(h) if self.arena.capacity(h) == tier_quads => h,
                Some(h) => {
                    self.arena.release(h);
                    self.arena.acquire(needed)
                }
                None => self.arena.acquire(needed),
            };
            let Some(mesh) = self.arena.get_mut(handle) else {
                log::error!("tilemap: acquired mesh {handle:?} is not live");
                return false;
            };

            let tiles = chunk.tiles.as_deref().unwrap_or(&[]);
            let quads = build_chunk_mesh(tiles, chunk_width, chunk.non_empty_tiles, layout, addressing, mesh);
            log::trace!("tilemap: layer {layer} chunk {ci} rebuilt with {quads} quads");

            chunk.mesh = Some(handle);
            chunk.dirty = false;
            chunk.released = false;
            self.meshes_generated += 1;
        }

        if !chunk.active {
            chunk.active = true;
            self.active.push((layer, ci));
        }
        true
    }

    fn drop_mesh(&mut self, layer: usize, ci: usize) {
        let chunk = &mut self.layers[layer].chunks[ci];
        if let Some(h) = chunk.mesh.take() {
            self.arena.release(h);
        }
        if chunk.active {
            chunk.active = false;
            self.active.retain(|&k| k != (layer, ci));
        }
    }

    // ── maintenance ───────────────────────────────────────────────────────

    /// Advances the frame counter; every maintenance interval, releases the meshes
    /// of chunks not drawn within the stale window. Returns the number released.
    pub fn tick(&mut self) -> usize {
        self.frame += 1;
        if self.frame % self.maintenance_interval != 0 {
            return 0;
        }
        self.evict_stale()
    }

    fn evict_stale(&mut self) -> usize {
        let (frame, stale) = (self.frame, self.stale_frames);
        let layers = &mut self.layers;
        let arena = &mut self.arena;
        let mut evicted = 0;

        self.active.retain(|&(layer, ci)| {
            let chunk = &mut layers[layer].chunks[ci];
            if chunk.mesh.is_none() {
                chunk.active = false;
                return false;
            }
            if frame.saturating_sub(chunk.last_relevant_frame) <= stale {
                return true;
            }
            if let Some(h) = chunk.mesh.take() {
                arena.release(h);
            }
            chunk.released = true;
            chunk.active = false;
            evicted += 1;
            false
        });

        if evicted > 0 {
            log::debug!("tilemap: released {evicted} stale chunk meshes at frame {frame}");
        }
        evicted
    }

    // ── stats ─────────────────────────────────────────────────────────────

    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Chunk meshes built since creation.
    #[inline]
    pub fn meshes_generated(&self) -> u64 {
        self.meshes_generated
    }

    /// Chunks currently holding a mesh.
    #[inline]
    pub fn active_chunks(&self) -> usize {
        self.active.len()
    }

    /// Meshes waiting in the recycle pool.
    #[inline]
    pub fn pooled_meshes(&self) -> usize {
        self.arena.pooled()
    }

    pub fn chunk_info(&self, layer: usize, cx: usize, cy: usize) -> Option<ChunkInfo> {
        let ci = self.chunk_index(cx, cy)?;
        self.layers.get(layer).map(|l| ChunkInfo::from(&l.chunks[ci]))
    }

    /// Cached mesh of chunk `(cx, cy)`, local to the chunk's top-left corner.
    pub fn chunk_mesh(&self, layer: usize, cx: usize, cy: usize) -> Option<&PreparedMesh> {
        let ci = self.chunk_index(cx, cy)?;
        let handle = self.layers.get(layer)?.chunks[ci].mesh?;
        self.arena.get(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::testing::renderer;
    use crate::render::{FlushReason, RecordingBackend, SpriteSheetDesc};

    const SHEET: usize = 0;

    fn setup() -> (TilemapChunkCache, Renderer<RecordingBackend>) {
        let mut r = renderer();
        let rgba = vec![255u8; 64 * 64 * 4];
        r.sprite_sheet_setup(
            SHEET,
            &SpriteSheetDesc {
                size: Size::new(64, 64),
                sprite_size: Size::new(8, 8),
                rgba: &rgba,
                palettize: false,
            },
        )
        .unwrap();

        let mut map = TilemapChunkCache::new(r.config());
        map.layer_sprite_sheet_set(0, Some(SHEET), r.sheet_layout(SHEET)).unwrap();
        (map, r)
    }

    fn put(map: &mut TilemapChunkCache, x: i32, y: i32, sprite: u32) -> bool {
        map.sprite_set(0, x, y, sprite, Color32::WHITE, 0, SpriteFlags::empty())
    }

    // ── tiles ─────────────────────────────────────────────────────────────

    #[test]
    fn get_returns_last_write_or_empty() {
        let (mut map, _) = setup();
        assert_eq!(map.sprite_get(0, 3, 4), SPRITE_EMPTY);
        put(&mut map, 3, 4, 7);
        put(&mut map, 3, 4, 9);
        assert_eq!(map.sprite_get(0, 3, 4), 9);
    }

    #[test]
    fn writes_outside_map_are_ignored() {
        let (mut map, _) = setup();
        assert!(!put(&mut map, -1, 0, 1));
        assert!(!put(&mut map, 256, 0, 1));
        assert!(!map.sprite_set(99, 0, 0, 1, Color32::WHITE, 0, SpriteFlags::empty()));
        assert_eq!(map.sprite_get(0, 256, 0), SPRITE_EMPTY);
    }

    #[test]
    fn write_marks_chunk_dirty_and_counts_tiles() {
        let (mut map, _) = setup();
        put(&mut map, 17, 1, 2);
        put(&mut map, 18, 1, 2);
        let info = map.chunk_info(0, 1, 0).unwrap();
        assert!(info.dirty);
        assert_eq!(info.non_empty_tiles, 2);

        put(&mut map, 17, 1, SPRITE_EMPTY);
        assert_eq!(map.chunk_info(0, 1, 0).unwrap().non_empty_tiles, 1);
    }

    #[test]
    fn identical_write_is_not_a_change() {
        let (mut map, _) = setup();
        assert!(put(&mut map, 0, 0, 1));
        assert!(!put(&mut map, 0, 0, 1));
    }

    // ── generation ────────────────────────────────────────────────────────

    #[test]
    fn drawing_builds_visible_chunks_once() {
        let (mut map, mut r) = setup();
        put(&mut map, 0, 0, 5);
        put(&mut map, 20, 0, 5);

        map.draw_map_layer(&mut r, 0, Vec2i::zero());
        assert_eq!(map.meshes_generated(), 2);
        assert_eq!(map.active_chunks(), 2);
        assert!(!map.chunk_info(0, 0, 0).unwrap().dirty);

        map.draw_map_layer(&mut r, 0, Vec2i::zero());
        assert_eq!(map.meshes_generated(), 2);
        assert_eq!(r.batch().current_vertex(), 16);
    }

    #[test]
    fn offscreen_chunks_are_not_built() {
        let (mut map, mut r) = setup();
        // 480 px / 128 px per chunk: chunks 0..=3 are visible
        put(&mut map, 16 * 5, 0, 1);
        map.draw_map_layer(&mut r, 0, Vec2i::zero());
        assert_eq!(map.meshes_generated(), 0);

        r.camera_set(Vec2i::new(128 * 4, 0));
        map.draw_map_layer(&mut r, 0, Vec2i::zero());
        assert_eq!(map.meshes_generated(), 1);
    }

    #[test]
    fn extreme_camera_and_origin_draw_nothing() {
        let (mut map, mut r) = setup();
        put(&mut map, 0, 0, 1);
        r.camera_set(Vec2i::new(i32::MIN, i32::MAX));
        map.draw_map_layer(&mut r, 0, Vec2i::new(i32::MAX, i32::MIN));
        r.camera_set(Vec2i::new(i32::MAX, i32::MAX));
        map.draw_map_layer(&mut r, 0, Vec2i::new(i32::MIN, i32::MIN));
        assert_eq!(map.meshes_generated(), 0);
        assert!(r.batch().is_empty());
    }

    #[test]
    fn emptied_chunk_holds_no_mesh() {
        let (mut map, mut r) = setup();
        put(&mut map, 0, 0, 1);
        map.draw_map_layer(&mut r, 0, Vec2i::zero());
        assert!(map.chunk_info(0, 0, 0).unwrap().has_mesh);

        put(&mut map, 0, 0, SPRITE_EMPTY);
        let info = map.chunk_info(0, 0, 0).unwrap();
        assert!(!info.has_mesh);
        assert_eq!(map.active_chunks(), 0);
        assert_eq!(map.pooled_meshes(), 1);
    }

    #[test]
    fn layer_draw_restores_sprite_source() {
        let (mut map, mut r) = setup();
        put(&mut map, 0, 0, 1);
        map.draw_map_layer(&mut r, 0, Vec2i::zero());
        assert_eq!(r.sprite_source(), SpriteSource::None);
    }

    #[test]
    fn layout_change_regenerates_layer() {
        let (mut map, mut r) = setup();
        put(&mut map, 0, 0, 1);
        map.draw_map_layer(&mut r, 0, Vec2i::zero());

        let other = SheetLayout::new(Size::new(128, 64), Size::new(8, 8));
        map.layer_sprite_sheet_set(0, Some(SHEET), Some(other)).unwrap();
        assert!(map.chunk_info(0, 0, 0).unwrap().dirty);

        // Same layout again: no invalidation.
        map.draw_map_layer(&mut r, 0, Vec2i::zero());
        map.layer_sprite_sheet_set(0, Some(SHEET), r.sheet_layout(SHEET)).unwrap();
        assert!(!map.chunk_info(0, 0, 0).unwrap().dirty);
    }

    #[test]
    fn unbinding_the_sheet_invalidates() {
        let (mut map, mut r) = setup();
        put(&mut map, 0, 0, 1);
        map.draw_map_layer(&mut r, 0, Vec2i::zero());
        map.layer_sprite_sheet_set(0, None, None).unwrap();
        assert!(map.chunk_info(0, 0, 0).unwrap().dirty);
    }

    #[test]
    fn bad_layer_is_rejected() {
        let (mut map, _) = setup();
        assert!(matches!(
            map.layer_sprite_sheet_set(8, None, None),
            Err(EngineError::SlotOutOfRange { kind: SlotKind::MapLayer, .. })
        ));
    }

    #[test]
    fn chunk_meshes_share_the_batch() {
        let (mut map, mut r) = setup();
        for x in 0..40 {
            put(&mut map, x, 0, 1);
        }
        map.draw_map_layer(&mut r, 0, Vec2i::zero());
        r.flush(FlushReason::Explicit);
        assert_eq!(r.backend().draw_count(), 1);
    }

    // ── maintenance ───────────────────────────────────────────────────────

    #[test]
    fn stale_chunks_are_released_once() {
        let (mut map, mut r) = setup();
        put(&mut map, 0, 0, 1);
        map.draw_map_layer(&mut r, 0, Vec2i::zero());

        let mut released = 0;
        for _ in 0..300 {
            released += map.tick();
        }
        assert_eq!(released, 1);
        let info = map.chunk_info(0, 0, 0).unwrap();
        assert!(info.released);
        assert!(!info.has_mesh);
        assert_eq!(map.active_chunks(), 0);
        assert_eq!(map.pooled_meshes(), 1);

        for _ in 0..300 {
            released += map.tick();
        }
        assert_eq!(released, 1);
    }

    #[test]
    fn released_chunk_regenerates_from_pool() {
        let (mut map, mut r) = setup();
        put(&mut map, 0, 0, 1);
        map.draw_map_layer(&mut r, 0, Vec2i::zero());
        for _ in 0..300 {
            map.tick();
        }
        map.draw_map_layer(&mut r, 0, Vec2i::zero());
        assert_eq!(map.meshes_generated(), 2);
        assert_eq!(map.pooled_meshes(), 0);
        assert!(!map.chunk_info(0, 0, 0).unwrap().released);
    }

    #[test]
    fn drawn_chunks_stay_cached() {
        let (mut map, mut r) = setup();
        put(&mut map, 0, 0, 1);
        for _ in 0..300 {
            map.draw_map_layer(&mut r, 0, Vec2i::zero());
            r.flush(FlushReason::Explicit);
            map.tick();
        }
        assert_eq!(map.meshes_generated(), 1);
        assert_eq!(map.active_chunks(), 1);
    }

    #[test]
    fn clear_returns_meshes_and_tiles() {
        let (mut map, mut r) = setup();
        put(&mut map, 0, 0, 1);
        map.draw_map_layer(&mut r, 0, Vec2i::zero());
        map.map_clear();
        assert_eq!(map.sprite_get(0, 0, 0), SPRITE_EMPTY);
        assert_eq!(map.active_chunks(), 0);
        assert_eq!(map.pooled_meshes(), 1);
    }
}
