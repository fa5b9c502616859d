use std::borrow::Cow;

use anyhow::{Context, Result};

use crate::config::HardwareConfig;
use crate::coords::{ClipRect, Color32, Rect, Size, Vec2, Vec2i};
use crate::error::{check_slot, EngineError, SlotKind};
use crate::paint::{palettize, Paint, Palette, PaletteAddressing};

use super::backend::{
    BatchUniforms, DrawSubmission, FilterMode, GraphicsBackend, SourceBinding, SurfaceId,
    TextureId,
};
use super::batch::VertexBatch;
use super::clip::ClipCuller;
use super::flush::{FlushReason, FlushStats};
use super::resources::{
    Offscreen, RenderTarget, ShaderEntry, SheetLayout, SpriteSheet, SpriteSheetDesc, SpriteSource,
};
use super::state::DrawState;
use super::vertex::{Vertex, FLAGS_OFFSCREEN, FLAGS_SHEET, FLAGS_SYSTEM};

/// Resolved ink for one primitive: lookup column, lookup row, vertex color.
#[derive(Debug, Copy, Clone)]
pub(super) struct Ink {
    pub u: f32,
    pub row: f32,
    pub flags: [f32; 2],
    pub color: Color32,
}

impl Ink {
    #[inline]
    pub fn vertex(&self, p: Vec2) -> Vertex {
        Vertex::new(p, self.row, [self.u, 0.0], self.flags, self.color)
    }

    #[inline]
    pub fn textured_vertex(&self, p: Vec2, uv: [f32; 2]) -> Vertex {
        Vertex::new(p, self.row, uv, self.flags, self.color)
    }
}

/// Batched immediate-mode renderer.
///
/// Owns the backend, the batch buckets and all bound draw state. Every primitive
/// follows the same sequence: make room (flushing if the batch is full), compute
/// target-space geometry, cull against the clip, resolve the texture binding
/// (flushing on mismatch), append.
///
/// Drawing is only enabled between `start_render` and `frame_end`.
pub struct Renderer<B: GraphicsBackend> {
    pub(super) backend: B,
    pub(super) config: HardwareConfig,

    pub(super) batch: VertexBatch,
    pub(super) clip: ClipCuller,
    pub(super) stats: FlushStats,

    pub(super) palette: Palette,
    pub(super) addressing: PaletteAddressing,
    pub(super) system_texture: TextureId,

    pub(super) state: DrawState,
    /// Source remembered at the first write after a flush.
    pub(super) batch_source: SpriteSource,

    pub(super) sheets: Vec<Option<SpriteSheet>>,
    pub(super) shaders: Vec<Option<ShaderEntry>>,
    pub(super) offscreens: Vec<Option<Offscreen>>,

    pub(super) onscreen: Option<SurfaceId>,
    pub(super) onscreen_size: Size,

    pub(super) render_enabled: bool,
    pub(super) flush_debug: bool,
}

impl<B: GraphicsBackend> Renderer<B> {
    /// Creates the renderer and its system lookup texture.
    pub fn new(mut backend: B, config: HardwareConfig) -> Result<Self> {
        config.validate().context("invalid hardware config")?;

        let palette = Palette::new(config.max_palette_colors, config.max_palette_swaps);
        let system_texture = backend
            .create_texture("system lookup", palette.lookup_size(), palette.pixels())
            .context("failed to create system lookup texture")?;

        let batch = VertexBatch::new(
            config.min_bucket_quads as usize,
            config.max_batch_quads as usize,
        );

        log::info!(
            "renderer: {}x{} display, {} quads per batch, {} palette colors x {} swaps",
            config.display_size.width,
            config.display_size.height,
            config.max_batch_quads,
            config.max_palette_colors,
            config.max_palette_swaps
        );

        Ok(Self {
            backend,
            batch,
            clip: ClipCuller::new(config.display_size),
            stats: FlushStats::default(),
            addressing: PaletteAddressing::new(config.max_palette_colors, config.max_palette_swaps),
            palette,
            system_texture,
            state: DrawState::default(),
            batch_source: SpriteSource::None,
            sheets: vec![None; config.max_sprite_sheets],
            shaders: vec![None; config.max_shaders],
            offscreens: vec![None; config.max_offscreens],
            onscreen: None,
            onscreen_size: config.display_size,
            render_enabled: false,
            flush_debug: false,
            config,
        })
    }

    // ── accessors ─────────────────────────────────────────────────────────

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[inline]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    #[inline]
    pub fn config(&self) -> &HardwareConfig {
        &self.config
    }

    #[inline]
    pub fn batch(&self) -> &VertexBatch {
        &self.batch
    }

    #[inline]
    pub fn stats(&self) -> &FlushStats {
        &self.stats
    }

    #[inline]
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    #[inline]
    pub fn addressing(&self) -> PaletteAddressing {
        self.addressing
    }

    #[inline]
    pub fn state(&self) -> &DrawState {
        &self.state
    }

    #[inline]
    pub fn clip_rect(&self) -> ClipRect {
        self.clip.rect()
    }

    #[inline]
    pub fn render_enabled(&self) -> bool {
        self.render_enabled
    }

    /// Overlay per-reason flush counters at frame end.
    pub fn set_flush_debug(&mut self, enabled: bool) {
        self.flush_debug = enabled;
    }

    pub fn sprite_sheet(&self, slot: usize) -> Option<&SpriteSheet> {
        self.sheets.get(slot).and_then(|s| s.as_ref())
    }

    pub fn sheet_layout(&self, slot: usize) -> Option<SheetLayout> {
        self.sprite_sheet(slot).map(|s| s.layout)
    }

    /// Size of the active render target.
    pub fn target_size(&self) -> Size {
        match self.state.target {
            RenderTarget::Onscreen => self.onscreen_size,
            RenderTarget::Offscreen(i) => self
                .offscreens
                .get(i)
                .and_then(|o| o.as_ref())
                .map_or(self.onscreen_size, |o| o.size),
        }
    }

    /// Installs the surface behind `RenderTarget::Onscreen` (the current front buffer).
    pub fn set_onscreen_surface(&mut self, surface: SurfaceId, size: Size) {
        if self.onscreen == Some(surface) && self.onscreen_size == size {
            return;
        }
        if self.state.target == RenderTarget::Onscreen && !self.batch.is_empty() {
            self.flush(FlushReason::TargetChange);
        }
        self.onscreen = Some(surface);
        self.onscreen_size = size;
        if self.state.target == RenderTarget::Onscreen {
            self.reapply_clip();
        }
    }

    #[inline]
    pub fn onscreen_surface(&self) -> Option<SurfaceId> {
        self.onscreen
    }

    // ── draw state ────────────────────────────────────────────────────────

    pub fn camera_set(&mut self, pos: Vec2i) {
        self.state.camera = pos;
    }

    pub fn camera_reset(&mut self) {
        self.state.camera = Vec2i::zero();
    }

    #[inline]
    pub fn camera(&self) -> Vec2i {
        self.state.camera
    }

    pub fn alpha_set(&mut self, alpha: u8) {
        self.state.alpha = alpha;
    }

    pub fn tint_set(&mut self, tint: Color32) {
        self.state.tint = tint;
    }

    pub fn palette_swap_set(&mut self, swap: usize) -> Result<(), EngineError> {
        check_slot(SlotKind::PaletteSwap, swap, self.config.max_palette_swaps)?;
        self.state.palette_swap = swap;
        Ok(())
    }

    /// Restricts drawing to `rect` (target pixels). Flushes if the clip changes.
    pub fn clip_set(&mut self, rect: Rect) {
        let size = self.target_size();
        if self.clip.would_change(rect, size) && !self.batch.is_empty() {
            self.flush(FlushReason::ClipChange);
        }
        self.clip.set(rect, size);
        self.state.clip = Some(rect);
    }

    pub fn clip_reset(&mut self) {
        let size = self.target_size();
        if self.clip.rect() != ClipRect::full(size) && !self.batch.is_empty() {
            self.flush(FlushReason::ClipChange);
        }
        self.clip.reset(size);
        self.state.clip = None;
    }

    fn reapply_clip(&mut self) {
        match self.state.clip {
            Some(rect) => self.clip_set(rect),
            None => self.clip_reset(),
        }
    }

    /// Selects the sprite sheet sampled by textured draws.
    pub fn sprite_sheet_set(&mut self, slot: usize) -> Result<(), EngineError> {
        check_slot(SlotKind::SpriteSheet, slot, self.config.max_sprite_sheets)?;
        self.state.sprite_source = SpriteSource::Sheet(slot);
        Ok(())
    }

    /// Selects an offscreen surface as the texture sampled by textured draws.
    pub fn sprite_source_offscreen(&mut self, slot: usize) -> Result<(), EngineError> {
        check_slot(SlotKind::Offscreen, slot, self.config.max_offscreens)?;
        if self.offscreens[slot].is_none() {
            return Err(EngineError::ResourceMissing(format!("offscreen {slot} not set up")).logged());
        }
        self.state.sprite_source = SpriteSource::Offscreen(slot);
        Ok(())
    }

    #[inline]
    pub fn sprite_source(&self) -> SpriteSource {
        self.state.sprite_source
    }

    pub(crate) fn sprite_source_set(&mut self, source: SpriteSource) {
        self.state.sprite_source = source;
    }

    pub fn shader_set(&mut self, slot: usize) -> Result<(), EngineError> {
        check_slot(SlotKind::Shader, slot, self.config.max_shaders)?;
        if self.shaders[slot].is_none() {
            return Err(EngineError::ResourceMissing(format!("shader {slot} not loaded")).logged());
        }
        self.bind_shader(Some(slot));
        Ok(())
    }

    pub fn shader_reset(&mut self) {
        self.bind_shader(None);
    }

    fn bind_shader(&mut self, shader: Option<usize>) {
        if self.state.shader == shader {
            return;
        }
        if !self.batch.is_empty() {
            self.flush(FlushReason::ShaderChange);
        }
        self.state.shader = shader;
    }

    // ── render targets ────────────────────────────────────────────────────

    /// Declares offscreen surface `slot`. The surface is created (or resized) and
    /// cleared on its first use.
    pub fn offscreen_setup(&mut self, slot: usize, size: Size) -> Result<(), EngineError> {
        check_slot(SlotKind::Offscreen, slot, self.config.max_offscreens)?;
        if size.is_empty() {
            return Err(EngineError::InvalidSize(format!("offscreen {slot} size {size:?}")).logged());
        }

        let in_use = self.state.target == RenderTarget::Offscreen(slot)
            || self.batch_source == SpriteSource::Offscreen(slot);
        if in_use && !self.batch.is_empty() {
            self.flush(FlushReason::Explicit);
        }

        match self.offscreens[slot].as_mut() {
            Some(o) if o.size == size => {}
            Some(o) => {
                o.size = size;
                o.needs_clear = true;
            }
            None => self.offscreens[slot] = Some(Offscreen::new(size)),
        }

        if self.state.target == RenderTarget::Offscreen(slot) {
            self.ensure_offscreen(slot);
            self.reapply_clip();
        }
        Ok(())
    }

    /// Redirects drawing to offscreen surface `slot`.
    pub fn offscreen_target(&mut self, slot: usize) -> Result<(), EngineError> {
        check_slot(SlotKind::Offscreen, slot, self.config.max_offscreens)?;
        if self.offscreens[slot].is_none() {
            return Err(EngineError::ResourceMissing(format!("offscreen {slot} not set up")).logged());
        }
        self.set_target(RenderTarget::Offscreen(slot));
        Ok(())
    }

    /// Redirects drawing to the current front buffer.
    pub fn onscreen(&mut self) {
        self.set_target(RenderTarget::Onscreen);
    }

    fn set_target(&mut self, target: RenderTarget) {
        if self.state.target == target {
            return;
        }
        if !self.batch.is_empty() {
            self.flush(FlushReason::TargetChange);
        }
        self.state.target = target;
        if let RenderTarget::Offscreen(slot) = target {
            self.ensure_offscreen(slot);
        }
        // Clip defaults to the whole new target.
        self.clip.reset(self.target_size());
        self.state.clip = None;
    }

    /// Clears offscreen `slot` to transparent.
    pub fn offscreen_clear(&mut self, slot: usize) -> Result<(), EngineError> {
        check_slot(SlotKind::Offscreen, slot, self.config.max_offscreens)?;
        if self.offscreens[slot].is_none() {
            return Err(EngineError::ResourceMissing(format!("offscreen {slot} not set up")).logged());
        }
        if self.state.target == RenderTarget::Offscreen(slot) && !self.batch.is_empty() {
            self.flush(FlushReason::Explicit);
        }
        if let Some(surface) = self.ensure_offscreen(slot) {
            self.backend.clear_surface(surface, Color32::TRANSPARENT);
        }
        Ok(())
    }

    /// Clears the active target. Indexed paints resolve through the active swap.
    pub fn clear(&mut self, paint: Paint) {
        if !self.batch.is_empty() {
            self.flush(FlushReason::Explicit);
        }
        let color = match paint {
            Paint::Indexed(i) => {
                let mapped = self.palette.swap_entry(self.state.palette_swap, i as usize);
                self.palette.color(mapped as usize)
            }
            Paint::Rgb(c) => c,
        };
        match self.target_surface() {
            Some(surface) => self.backend.clear_surface(surface, color),
            None => log::error!("clear: no surface bound for {:?}", self.state.target),
        }
    }

    /// Creates, resizes and clears offscreen `slot` as needed.
    fn ensure_offscreen(&mut self, slot: usize) -> Option<SurfaceId> {
        let o = self.offscreens.get_mut(slot)?.as_mut()?;

        let surface = match o.surface {
            Some(s) => {
                if o.allocated != o.size {
                    self.backend.resize_surface(s, o.size);
                    o.allocated = o.size;
                    o.needs_clear = true;
                }
                s
            }
            None => match self.backend.create_surface(&format!("offscreen {slot}"), o.size) {
                Ok(s) => {
                    log::debug!("offscreen {slot}: created {}x{}", o.size.width, o.size.height);
                    o.surface = Some(s);
                    o.allocated = o.size;
                    o.needs_clear = true;
                    s
                }
                Err(e) => {
                    log::warn!("offscreen {slot}: {e:#}");
                    return None;
                }
            },
        };

        if o.needs_clear {
            o.needs_clear = false;
            self.backend.clear_surface(surface, Color32::TRANSPARENT);
        }
        Some(surface)
    }

    fn target_surface(&mut self) -> Option<SurfaceId> {
        match self.state.target {
            RenderTarget::Onscreen => self.onscreen,
            RenderTarget::Offscreen(slot) => self.ensure_offscreen(slot),
        }
    }

    // ── resources ─────────────────────────────────────────────────────────

    /// Uploads a sprite sheet into `slot`, replacing any previous sheet.
    ///
    /// On failure the slot keeps its previous contents.
    pub fn sprite_sheet_setup(
        &mut self,
        slot: usize,
        desc: &SpriteSheetDesc<'_>,
    ) -> Result<(), EngineError> {
        check_slot(SlotKind::SpriteSheet, slot, self.config.max_sprite_sheets)?;

        if desc.size.is_empty()
            || desc.sprite_size.is_empty()
            || desc.sprite_size.width > desc.size.width
            || desc.sprite_size.height > desc.size.height
        {
            return Err(EngineError::InvalidSize(format!(
                "sprite sheet {slot}: {:?} with {:?} sprites",
                desc.size, desc.sprite_size
            ))
            .logged());
        }
        if desc.rgba.len() != desc.size.area() * 4 {
            return Err(EngineError::InvalidSize(format!(
                "sprite sheet {slot}: expected {} bytes, got {}",
                desc.size.area() * 4,
                desc.rgba.len()
            ))
            .logged());
        }

        let pixels: Cow<'_, [u8]> = if desc.palettize {
            Cow::Owned(palettize(desc.rgba, &self.palette))
        } else {
            Cow::Borrowed(desc.rgba)
        };

        let texture = self
            .backend
            .create_texture(&format!("sprite sheet {slot}"), desc.size, &pixels)
            .map_err(|e| EngineError::ResourceMissing(format!("sprite sheet {slot}: {e:#}")).logged())?;

        self.release_sheet(slot);
        self.sheets[slot] = Some(SpriteSheet {
            texture,
            layout: SheetLayout::new(desc.size, desc.sprite_size),
            indexed: desc.palettize,
        });

        log::debug!(
            "sprite sheet {slot}: {}x{} ({}x{} sprites, indexed={})",
            desc.size.width,
            desc.size.height,
            desc.sprite_size.width,
            desc.sprite_size.height,
            desc.palettize
        );
        Ok(())
    }

    pub fn sprite_sheet_delete(&mut self, slot: usize) -> Result<(), EngineError> {
        check_slot(SlotKind::SpriteSheet, slot, self.config.max_sprite_sheets)?;
        self.release_sheet(slot);
        Ok(())
    }

    fn release_sheet(&mut self, slot: usize) {
        let Some(old) = self.sheets[slot].take() else { return };
        if self.batch_source == SpriteSource::Sheet(slot) && !self.batch.is_empty() {
            // Pending geometry still references the old texture.
            self.sheets[slot] = Some(old);
            self.flush(FlushReason::Explicit);
            self.sheets[slot] = None;
        }
        self.backend.destroy_texture(old.texture);
    }

    /// Compiles a custom shader into `slot`. `passes` draws are issued per flush.
    pub fn shader_setup(
        &mut self,
        slot: usize,
        label: &str,
        source: &str,
        passes: u32,
    ) -> Result<(), EngineError> {
        check_slot(SlotKind::Shader, slot, self.config.max_shaders)?;
        if passes == 0 {
            return Err(EngineError::InvalidSize(format!("shader {slot}: zero passes")).logged());
        }

        let id = self
            .backend
            .load_shader(label, source)
            .map_err(|e| EngineError::ResourceMissing(format!("shader {label}: {e:#}")).logged())?;

        if self.state.shader == Some(slot) && !self.batch.is_empty() {
            self.flush(FlushReason::ShaderChange);
        }
        self.shaders[slot] = Some(ShaderEntry { id, passes, offscreen_filters: Vec::new() });
        log::debug!("shader {slot}: loaded {label} ({passes} passes)");
        Ok(())
    }

    /// Requests `filter` on offscreen `offscreen` while shader `slot` draws.
    pub fn shader_offscreen_filter_set(
        &mut self,
        slot: usize,
        offscreen: usize,
        filter: FilterMode,
    ) -> Result<(), EngineError> {
        check_slot(SlotKind::Shader, slot, self.config.max_shaders)?;
        check_slot(SlotKind::Offscreen, offscreen, self.config.max_offscreens)?;
        let Some(entry) = self.shaders[slot].as_mut() else {
            return Err(EngineError::ResourceMissing(format!("shader {slot} not loaded")).logged());
        };
        entry.offscreen_filters.retain(|(o, _)| *o != offscreen);
        if filter != FilterMode::Point {
            entry.offscreen_filters.push((offscreen, filter));
        }
        Ok(())
    }

    pub fn palette_color_set(&mut self, index: usize, color: Color32) -> Result<(), EngineError> {
        self.palette.set_color(index, color)
    }

    pub fn palette_load(&mut self, colors: &[Color32]) {
        self.palette.set_colors(colors);
    }

    pub fn palette_swap_setup(&mut self, swap: usize, mapping: &[u8]) -> Result<(), EngineError> {
        self.palette.set_swap(swap, mapping)
    }

    // ── flush ─────────────────────────────────────────────────────────────

    fn upload_palette(&mut self) {
        if let Some(region) = self.palette.take_dirty() {
            let bytes = self.palette.region_rgba(region);
            self.backend.write_texture(self.system_texture, region, &bytes);
        }
    }

    fn resolve_source(&mut self, source: SpriteSource) -> (SourceBinding, Size, bool) {
        match source {
            SpriteSource::Sheet(slot) => match self.sprite_sheet(slot) {
                Some(s) => (SourceBinding::Texture(s.texture), s.layout.texture_size, s.indexed),
                None => (SourceBinding::None, Size::new(1, 1), false),
            },
            SpriteSource::Offscreen(slot) => match self.ensure_offscreen(slot) {
                Some(surface) => {
                    let size = self.offscreens[slot].map_or(Size::new(1, 1), |o| o.size);
                    (SourceBinding::Surface(surface), size, false)
                }
                None => (SourceBinding::None, Size::new(1, 1), false),
            },
            SpriteSource::None => (SourceBinding::None, Size::new(1, 1), false),
        }
    }

    /// Submits the batch to the active target and resets the cursors.
    pub fn flush(&mut self, reason: FlushReason) {
        self.upload_palette();
        if self.batch.is_empty() {
            return;
        }

        let Some(target) = self.target_surface() else {
            log::error!("flush ({reason}): no surface for {:?}; batch dropped", self.state.target);
            self.batch.clear();
            return;
        };

        let (source, source_size, indexed) = self.resolve_source(self.batch_source);
        if source == SourceBinding::Surface(target) {
            log::error!("flush ({reason}): surface sampled while bound as target; batch dropped");
            self.batch.clear();
            return;
        }

        let shader = self.state.shader.and_then(|slot| self.shaders[slot].clone());

        let mut filtered = Vec::new();
        if let Some(entry) = &shader {
            for &(offscreen, filter) in &entry.offscreen_filters {
                if let Some(surface) = self.ensure_offscreen(offscreen) {
                    self.backend.set_surface_filter(surface, filter);
                    filtered.push(surface);
                }
            }
        }

        let mut uniforms = BatchUniforms::new(
            self.clip.rect(),
            self.target_size(),
            self.palette.lookup_size(),
            source_size,
            indexed,
        );
        let passes = shader.as_ref().map_or(1, |s| s.passes);
        let clip = self.clip.rect();

        self.stats.record(reason);

        let view = self.batch.reduce();
        for pass in 0..passes {
            uniforms.pass_index = pass as f32;
            self.backend.draw(&DrawSubmission {
                target,
                clip,
                system_texture: self.system_texture,
                source,
                shader: shader.as_ref().map(|s| s.id),
                pass,
                uniforms,
                bucket: view.bucket,
                vertices: view.vertices,
                indices: view.indices,
                vertex_count: view.vertex_count,
                index_count: view.index_count,
                reason,
            });
        }

        for surface in filtered {
            self.backend.set_surface_filter(surface, FilterMode::Point);
        }

        self.batch.clear();
    }

    // ── frame boundaries ──────────────────────────────────────────────────

    /// Enables drawing and resets the draw state to defaults.
    pub fn start_render(&mut self) {
        self.render_enabled = true;
        self.reset_draw_state();
    }

    /// Ends the render phase.
    ///
    /// `render_time` draws with default state onto the front buffer before the final
    /// flush; the flush diagnostics overlay (if enabled) follows it.
    pub fn frame_end<F>(&mut self, render_time: F)
    where
        F: FnOnce(&mut Self),
    {
        if !self.render_enabled {
            return;
        }

        let saved = self.capture_state();
        self.reset_draw_state();
        render_time(self);
        self.flush(FlushReason::FrameEnd);

        if self.flush_debug {
            self.draw_flush_overlay();
            self.flush(FlushReason::FrameEnd);
        }

        self.restore_state(saved);
        self.render_enabled = false;
    }

    /// Starts a new statistics frame.
    pub fn advance_stats(&mut self) {
        self.stats.advance();
    }

    /// Resets camera, alpha, tint, palette swap, clip, shader and target.
    pub(crate) fn reset_draw_state(&mut self) {
        self.set_target(RenderTarget::Onscreen);
        self.bind_shader(None);
        self.camera_reset();
        self.state.alpha = 255;
        self.state.tint = Color32::WHITE;
        self.state.palette_swap = 0;
        self.clip_reset();
    }

    #[inline]
    pub fn capture_state(&self) -> DrawState {
        self.state
    }

    pub fn restore_state(&mut self, state: DrawState) {
        self.set_target(state.target);
        self.bind_shader(state.shader);
        self.state.sprite_source = state.sprite_source;
        self.state.camera = state.camera;
        self.state.alpha = state.alpha;
        self.state.tint = state.tint;
        self.state.palette_swap = state.palette_swap;
        match state.clip {
            Some(rect) => self.clip_set(rect),
            None => self.clip_reset(),
        }
    }

    // ── primitive plumbing ────────────────────────────────────────────────

    /// Render-phase guard plus capacity check for a primitive of the given size.
    pub(super) fn begin_primitive(&mut self, vertices: usize, indices: usize) -> bool {
        if !self.render_enabled {
            return false;
        }
        if vertices > self.batch.max_vertices() || indices > self.batch.max_indices() {
            log::error!("primitive of {vertices} verts / {indices} indices exceeds batch capacity");
            return false;
        }
        if !self.batch.is_empty() && !self.batch.has_room(vertices, indices) {
            self.flush(FlushReason::BatchFull);
        }
        if self.batch.is_empty() {
            self.batch_source = self.state.sprite_source;
        }
        true
    }

    /// Camera-relative position in target space.
    #[inline]
    pub(super) fn to_target(&self, p: Vec2i) -> Vec2 {
        // In f32 so extreme coordinates cannot overflow.
        p.to_f32() - self.state.camera.to_f32()
    }

    /// Ink for a solid primitive.
    pub(super) fn solid_ink(&self, paint: Paint) -> Ink {
        let modulation = self.state.vertex_modulation();
        match paint {
            Paint::Indexed(i) => Ink {
                u: self.addressing.color_u(i as usize),
                row: self.addressing.swap_row(self.state.palette_swap),
                flags: FLAGS_SYSTEM,
                color: modulation,
            },
            Paint::Rgb(c) => Ink {
                u: 0.0,
                row: self.addressing.solid_row(),
                flags: FLAGS_SYSTEM,
                color: c.modulate(modulation),
            },
        }
    }

    /// Resolves the texture binding for a textured primitive, flushing on mismatch.
    ///
    /// Returns `None` (and logs) when no usable source is bound.
    pub(super) fn textured_ink(&mut self) -> Option<Ink> {
        let source = self.state.sprite_source;
        let flags = match source {
            SpriteSource::Sheet(slot) if self.sprite_sheet(slot).is_some() => FLAGS_SHEET,
            SpriteSource::Offscreen(slot)
                if self.offscreens.get(slot).is_some_and(|o| o.is_some()) =>
            {
                FLAGS_OFFSCREEN
            }
            _ => {
                log::debug!("textured draw skipped: no usable source ({source:?})");
                return None;
            }
        };

        if self.batch_source != source {
            if !self.batch.is_empty() {
                self.flush(FlushReason::TextureChange);
            }
            self.batch_source = source;
        }

        Some(Ink {
            u: 0.0,
            row: self.addressing.swap_row(self.state.palette_swap),
            flags,
            color: self.state.vertex_modulation(),
        })
    }

    #[inline]
    pub(super) fn rejects(&self, corners: &[Vec2]) -> bool {
        let (mut min, mut max) = (corners[0], corners[0]);
        for p in &corners[1..] {
            min = Vec2::new(min.x.min(p.x), min.y.min(p.y));
            max = Vec2::new(max.x.max(p.x), max.y.max(p.y));
        }
        self.clip.rejects(min.x, min.y, max.x, max.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::recording::{BackendCall, RecordingBackend};
    use crate::render::testing::{renderer, renderer_with};

    fn px(r: &mut Renderer<RecordingBackend>, x: i32, y: i32) {
        r.draw_pixel(Vec2i::new(x, y), Paint::Indexed(1));
    }

    // ── construction ────────────────────────────────────────────────────────

    #[test]
    fn batch_overflowing_u16_indices_is_rejected() {
        let config = HardwareConfig { max_batch_quads: 32768, ..Default::default() };
        assert!(Renderer::new(RecordingBackend::new(), config).is_err());
    }

    #[test]
    fn invalid_bucket_size_is_reported() {
        let config = HardwareConfig { min_bucket_quads: 3, ..Default::default() };
        let err = Renderer::new(RecordingBackend::new(), config).err().map(|e| format!("{e:#}"));
        assert!(err.is_some_and(|e| e.contains("powers of two")));
    }

    // ── flush policy ────────────────────────────────────────────────────────

    #[test]
    fn draws_within_capacity_do_not_flush() {
        let mut r = renderer();
        for i in 0..100 {
            px(&mut r, i % 400, i / 400);
        }
        assert_eq!(r.backend().draw_count(), 0);
        assert_eq!(r.batch().current_vertex(), 400);
    }

    #[test]
    fn full_batch_flushes_before_next_write() {
        let config = HardwareConfig {
            max_batch_quads: 8,
            min_bucket_quads: 4,
            chunk_width: 2,
            chunk_height: 2,
            ..Default::default()
        };
        let mut r = renderer_with(config);
        for i in 0..9 {
            px(&mut r, i, 0);
        }
        assert_eq!(r.backend().draws_with_reason(FlushReason::BatchFull), 1);
        assert_eq!(r.batch().current_vertex(), 4);
        assert_eq!(r.stats().current(FlushReason::BatchFull), 1);
    }

    #[test]
    fn flush_uses_smallest_fitting_bucket() {
        let mut r = renderer();
        px(&mut r, 0, 0);
        r.flush(FlushReason::Explicit);
        let draw = r.backend().draws().next().unwrap().clone();
        assert_eq!(draw.bucket, 0);
        assert_eq!(draw.vertices.len(), 4);
        assert!(r.batch().is_empty());
    }

    #[test]
    fn empty_flush_submits_nothing() {
        let mut r = renderer();
        r.flush(FlushReason::Explicit);
        assert_eq!(r.backend().draw_count(), 0);
        assert_eq!(r.stats().current_total(), 0);
    }

    #[test]
    fn palette_upload_precedes_draw() {
        let mut r = renderer();
        r.palette_color_set(3, Color32::rgb(1, 2, 3)).unwrap();
        px(&mut r, 0, 0);
        r.flush(FlushReason::Explicit);
        let calls = r.backend().calls();
        assert!(matches!(calls[0], BackendCall::WriteTexture { .. }));
        assert!(matches!(calls[1], BackendCall::Draw(_)));
        assert!(!r.palette().is_dirty());
    }

    // ── clip ────────────────────────────────────────────────────────────────

    #[test]
    fn clip_change_flushes_pending_geometry() {
        let mut r = renderer();
        px(&mut r, 0, 0);
        r.clip_set(Rect::new(10, 10, 20, 20));
        assert_eq!(r.backend().draws_with_reason(FlushReason::ClipChange), 1);
        let first = r.backend().draws().next().unwrap().clone();
        assert_eq!(first.clip, ClipRect::full(Size::new(480, 270)));
        assert_eq!(r.clip_rect(), ClipRect::new(10, 10, 29, 29));
    }

    #[test]
    fn unchanged_clip_does_not_flush() {
        let mut r = renderer();
        r.clip_set(Rect::new(10, 10, 20, 20));
        px(&mut r, 12, 12);
        r.clip_set(Rect::new(10, 10, 20, 20));
        assert_eq!(r.backend().draw_count(), 0);
    }

    #[test]
    fn geometry_outside_clip_is_rejected() {
        let mut r = renderer();
        r.clip_set(Rect::new(10, 10, 20, 20));
        px(&mut r, 5, 5);
        px(&mut r, 30, 30);
        assert!(r.batch().is_empty());
    }

    // ── targets ─────────────────────────────────────────────────────────────

    #[test]
    fn offscreen_is_created_and_cleared_on_first_use() {
        let mut r = renderer();
        r.offscreen_setup(0, Size::new(64, 64)).unwrap();
        assert!(r.backend().calls().is_empty());
        r.offscreen_target(0).unwrap();
        let calls = r.backend().calls();
        assert!(matches!(calls[0], BackendCall::CreateSurface { size, .. } if size == Size::new(64, 64)));
        assert!(matches!(calls[1], BackendCall::ClearSurface { color, .. } if color == Color32::TRANSPARENT));
        assert_eq!(r.target_size(), Size::new(64, 64));
        assert_eq!(r.clip_rect(), ClipRect::full(Size::new(64, 64)));
    }

    #[test]
    fn target_switch_flushes_to_previous_target() {
        let mut r = renderer();
        let front = r.onscreen_surface().unwrap();
        r.offscreen_setup(1, Size::new(32, 32)).unwrap();
        px(&mut r, 0, 0);
        r.offscreen_target(1).unwrap();
        let draw = r.backend().draws().next().unwrap().clone();
        assert_eq!(draw.target, front);
        assert_eq!(draw.reason, FlushReason::TargetChange);
    }

    #[test]
    fn offscreen_resize_recreates_storage() {
        let mut r = renderer();
        r.offscreen_setup(0, Size::new(16, 16)).unwrap();
        r.offscreen_target(0).unwrap();
        r.backend_mut().clear_calls();
        r.offscreen_setup(0, Size::new(32, 16)).unwrap();
        assert!(r
            .backend()
            .calls()
            .iter()
            .any(|c| matches!(c, BackendCall::ResizeSurface { size, .. } if *size == Size::new(32, 16))));
    }

    #[test]
    fn sampling_the_bound_target_drops_the_batch() {
        let mut r = renderer();
        r.offscreen_setup(0, Size::new(16, 16)).unwrap();
        r.offscreen_target(0).unwrap();
        r.sprite_source_offscreen(0).unwrap();
        r.draw_texture(Rect::new(0, 0, 4, 4), Rect::new(0, 0, 4, 4), crate::render::SpriteFlags::empty());
        r.flush(FlushReason::Explicit);
        assert_eq!(r.backend().draw_count(), 0);
        assert!(r.batch().is_empty());
    }

    #[test]
    fn unset_offscreen_target_is_rejected() {
        let mut r = renderer();
        assert!(matches!(r.offscreen_target(2), Err(EngineError::ResourceMissing(_))));
        assert!(matches!(
            r.offscreen_target(99),
            Err(EngineError::SlotOutOfRange { kind: SlotKind::Offscreen, .. })
        ));
        assert_eq!(r.state().target, RenderTarget::Onscreen);
    }

    #[test]
    fn clear_resolves_indexed_paint_through_swap() {
        let mut r = renderer();
        r.palette_swap_setup(1, &[0, 0, 9]).unwrap();
        r.palette_swap_set(1).unwrap();
        r.clear(Paint::Indexed(2));
        let expected = r.palette().color(9);
        assert!(r
            .backend()
            .calls()
            .iter()
            .any(|c| matches!(c, BackendCall::ClearSurface { color, .. } if *color == expected)));
    }

    // ── shaders ─────────────────────────────────────────────────────────────

    #[test]
    fn multi_pass_shader_draws_each_pass() {
        let mut r = renderer();
        r.shader_setup(0, "glow", "", 3).unwrap();
        r.shader_set(0).unwrap();
        px(&mut r, 0, 0);
        r.flush(FlushReason::Explicit);
        let passes: Vec<u32> = r.backend().draws().map(|d| d.pass).collect();
        assert_eq!(passes, vec![0, 1, 2]);
        assert_eq!(r.stats().current(FlushReason::Explicit), 1);
    }

    #[test]
    fn shader_change_flushes() {
        let mut r = renderer();
        r.shader_setup(0, "glow", "", 1).unwrap();
        px(&mut r, 0, 0);
        r.shader_set(0).unwrap();
        assert_eq!(r.backend().draws_with_reason(FlushReason::ShaderChange), 1);
    }

    #[test]
    fn shader_filters_restore_to_point() {
        let mut r = renderer();
        r.offscreen_setup(2, Size::new(16, 16)).unwrap();
        r.shader_setup(0, "blur", "", 1).unwrap();
        r.shader_offscreen_filter_set(0, 2, FilterMode::Linear).unwrap();
        r.shader_set(0).unwrap();
        px(&mut r, 0, 0);
        r.flush(FlushReason::Explicit);

        let filters: Vec<FilterMode> = r
            .backend()
            .calls()
            .iter()
            .filter_map(|c| match c {
                BackendCall::SetFilter { filter, .. } => Some(*filter),
                _ => None,
            })
            .collect();
        assert_eq!(filters, vec![FilterMode::Linear, FilterMode::Point]);
    }

    #[test]
    fn failed_shader_leaves_slot_empty() {
        let mut r = renderer();
        r.backend_mut().fail_shader_loading = true;
        assert!(r.shader_setup(0, "broken", "", 1).is_err());
        assert!(r.shader_set(0).is_err());
    }

    // ── resources ───────────────────────────────────────────────────────────

    fn sheet(rgba: &[u8]) -> SpriteSheetDesc<'_> {
        SpriteSheetDesc {
            size: Size::new(16, 16),
            sprite_size: Size::new(8, 8),
            rgba,
            palettize: false,
        }
    }

    #[test]
    fn sheet_with_wrong_byte_count_is_rejected() {
        let mut r = renderer();
        let rgba = vec![0u8; 10];
        assert!(matches!(r.sprite_sheet_setup(0, &sheet(&rgba)), Err(EngineError::InvalidSize(_))));
        assert!(r.sprite_sheet(0).is_none());
    }

    #[test]
    fn failed_upload_keeps_previous_sheet() {
        let mut r = renderer();
        let rgba = vec![0u8; 16 * 16 * 4];
        r.sprite_sheet_setup(0, &sheet(&rgba)).unwrap();
        let before = *r.sprite_sheet(0).unwrap();
        r.backend_mut().fail_texture_creation = true;
        assert!(r.sprite_sheet_setup(0, &sheet(&rgba)).is_err());
        assert_eq!(r.sprite_sheet(0), Some(&before));
    }

    #[test]
    fn replacing_a_sheet_in_use_flushes_then_destroys() {
        let mut r = renderer();
        let rgba = vec![0u8; 16 * 16 * 4];
        r.sprite_sheet_setup(0, &sheet(&rgba)).unwrap();
        let old = r.sprite_sheet(0).unwrap().texture;
        r.sprite_sheet_set(0).unwrap();
        r.draw_sprite(0, Vec2i::new(0, 0), crate::render::SpriteFlags::empty());
        r.sprite_sheet_setup(0, &sheet(&rgba)).unwrap();

        let calls = r.backend().calls();
        let draw_at = calls.iter().position(|c| matches!(c, BackendCall::Draw(_))).unwrap();
        let destroy_at = calls
            .iter()
            .position(|c| matches!(c, BackendCall::DestroyTexture(id) if *id == old))
            .unwrap();
        assert!(draw_at < destroy_at);
    }

    #[test]
    fn palettized_sheet_is_marked_indexed() {
        let mut r = renderer();
        let rgba = vec![255u8; 16 * 16 * 4];
        let desc = SpriteSheetDesc { palettize: true, ..sheet(&rgba) };
        r.sprite_sheet_setup(0, &desc).unwrap();
        assert!(r.sprite_sheet(0).unwrap().indexed);
    }

    // ── frame boundaries ────────────────────────────────────────────────────

    #[test]
    fn frame_end_flushes_and_disables_drawing() {
        let mut r = renderer();
        px(&mut r, 0, 0);
        r.frame_end(|_| {});
        assert_eq!(r.backend().draws_with_reason(FlushReason::FrameEnd), 1);
        assert!(!r.render_enabled());
    }

    #[test]
    fn frame_end_restores_state_after_render_time_draws() {
        let mut r = renderer();
        r.camera_set(Vec2i::new(5, 5));
        r.alpha_set(128);
        r.clip_set(Rect::new(0, 0, 10, 10));
        let saved = r.capture_state();

        r.frame_end(|r| {
            assert_eq!(r.camera(), Vec2i::zero());
            assert_eq!(r.clip_rect(), ClipRect::full(Size::new(480, 270)));
            r.draw_pixel(Vec2i::new(100, 100), Paint::Indexed(1));
        });

        assert_eq!(r.backend().draw_count(), 1);
        assert_eq!(r.capture_state(), saved);
    }

    #[test]
    fn start_render_resets_state_but_keeps_source() {
        let mut r = renderer();
        let rgba = vec![0u8; 16 * 16 * 4];
        r.sprite_sheet_setup(3, &sheet(&rgba)).unwrap();
        r.sprite_sheet_set(3).unwrap();
        r.tint_set(Color32::BLACK);
        r.frame_end(|_| {});
        r.start_render();
        assert_eq!(r.state().tint, Color32::WHITE);
        assert_eq!(r.sprite_source(), SpriteSource::Sheet(3));
    }
}
