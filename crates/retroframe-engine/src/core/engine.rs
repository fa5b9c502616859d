use anyhow::{Context, Result};

use crate::config::HardwareConfig;
use crate::coords::{Color32, Size, Vec2i};
use crate::effects::{draw_render_time, EffectParams, FrontBuffer, FrontBufferSequencer};
use crate::error::{check_slot, EngineError, SlotKind};
use crate::input::Buttons;
use crate::render::{FlushReason, GraphicsBackend, Renderer};
use crate::tilemap::TilemapChunkCache;
use crate::time::FixedStep;

use super::app::{AppControl, Game};

/// Most fixed updates run for a single rendered frame.
const MAX_UPDATES_PER_FRAME: u32 = 4;

/// Renderer, tile map, effect state and pad input behind explicit frame phases.
///
/// A frame runs `begin_frame`, zero or more fixed updates, `start_render`, the
/// game's draw calls, `frame_end`; the host then composites `present_layers`.
/// Drawing is only possible between `start_render` and `frame_end`.
pub struct Engine<B: GraphicsBackend> {
    renderer: Renderer<B>,
    tilemap: TilemapChunkCache,
    effects: EffectParams,
    front: FrontBufferSequencer,
    buttons: Buttons,
    fixed: FixedStep,
    display: Size,
    frame: u64,
}

impl<B: GraphicsBackend> Engine<B> {
    pub fn new(backend: B, config: HardwareConfig) -> Result<Self> {
        config.validate().context("invalid hardware config")?;

        let display = config.display_size;
        let tilemap = TilemapChunkCache::new(&config);
        let fixed = FixedStep::new(config.fixed_update_hz, MAX_UPDATES_PER_FRAME);
        let mut renderer = Renderer::new(backend, config)?;

        let mut front = FrontBufferSequencer::new(display);
        let surface = front.ensure_initial(renderer.backend_mut())?;
        renderer.set_onscreen_surface(surface, display);

        Ok(Self {
            renderer,
            tilemap,
            effects: EffectParams::default(),
            front,
            buttons: Buttons::new(),
            fixed,
            display,
            frame: 0,
        })
    }

    // ── accessors ─────────────────────────────────────────────────────────

    #[inline]
    pub fn renderer(&self) -> &Renderer<B> {
        &self.renderer
    }

    #[inline]
    pub fn renderer_mut(&mut self) -> &mut Renderer<B> {
        &mut self.renderer
    }

    #[inline]
    pub fn tilemap(&self) -> &TilemapChunkCache {
        &self.tilemap
    }

    #[inline]
    pub fn tilemap_mut(&mut self) -> &mut TilemapChunkCache {
        &mut self.tilemap
    }

    /// Live effect parameters, captured into the current front buffer when it ends.
    #[inline]
    pub fn effects(&self) -> &EffectParams {
        &self.effects
    }

    #[inline]
    pub fn effects_mut(&mut self) -> &mut EffectParams {
        &mut self.effects
    }

    #[inline]
    pub fn buttons(&self) -> &Buttons {
        &self.buttons
    }

    #[inline]
    pub fn buttons_mut(&mut self) -> &mut Buttons {
        &mut self.buttons
    }

    #[inline]
    pub fn front_buffers(&self) -> &FrontBufferSequencer {
        &self.front
    }

    #[inline]
    pub fn display_size(&self) -> Size {
        self.display
    }

    /// Frames begun since creation.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    #[inline]
    pub fn render_enabled(&self) -> bool {
        self.renderer.render_enabled()
    }

    // ── phases ────────────────────────────────────────────────────────────

    /// Rewinds the front buffers, runs tile map maintenance and starts a new
    /// statistics frame.
    pub fn begin_frame(&mut self) {
        self.front.reset();
        self.tilemap.tick();
        self.renderer.advance_stats();
        self.frame += 1;
    }

    /// Runs the fixed updates due after `dt` seconds. The pad is sampled once per
    /// update.
    pub fn update<G: Game<B>>(&mut self, game: &mut G, dt: f32) -> AppControl {
        let steps = self.fixed.advance(dt);
        for _ in 0..steps {
            self.buttons.advance();
            if game.update(self) == AppControl::Exit {
                return AppControl::Exit;
            }
        }
        AppControl::Continue
    }

    /// Enters the render phase on front buffer 0, cleared to transparent.
    pub fn start_render(&mut self) -> Result<()> {
        let surface = self
            .front
            .ensure_initial(self.renderer.backend_mut())
            .context("no front buffer to render into")?;
        self.renderer.set_onscreen_surface(surface, self.display);
        self.renderer
            .backend_mut()
            .clear_surface(surface, Color32::TRANSPARENT);
        self.renderer.start_render();
        Ok(())
    }

    /// Ends the current front buffer with a copy of the live effect parameters and
    /// continues drawing on the next one.
    ///
    /// Render-time effects are drawn into the ending buffer first. The draw state
    /// (target, camera, clip, shader) carries over to the next buffer.
    pub fn effect_apply_now(&mut self) -> Result<(), EngineError> {
        if !self.renderer.render_enabled() {
            log::warn!("effect_apply_now called outside the render phase");
            return Err(EngineError::NotInRenderPhase);
        }

        let saved = self.renderer.capture_state();
        self.renderer.reset_draw_state();
        draw_render_time(&mut self.renderer, &self.effects, self.display);
        self.renderer.flush(FlushReason::EffectApply);

        let next = self.front.next_buffer(self.renderer.backend_mut(), &self.effects);
        let result = match next {
            Ok(surface) => {
                self.renderer.set_onscreen_surface(surface, self.display);
                Ok(())
            }
            Err(err) => {
                log::error!("effect_apply_now: {err:#}");
                Err(EngineError::ResourceMissing(format!("front buffer: {err}")))
            }
        };

        self.renderer.restore_state(saved);
        result
    }

    /// Draws render-time effects, flushes and leaves the render phase. The live
    /// effect parameters are captured into the last front buffer.
    pub fn frame_end(&mut self) {
        if !self.renderer.render_enabled() {
            return;
        }
        let effects = self.effects;
        let display = self.display;
        self.renderer
            .frame_end(|r| draw_render_time(r, &effects, display));
        self.front.capture_current(&effects);
    }

    /// Front buffers written this frame, bottom first, each with its effects.
    #[inline]
    pub fn present_layers(&self) -> &[FrontBuffer] {
        self.front.layers()
    }

    /// One complete frame: begin, updates, render, end.
    pub fn run_frame<G: Game<B>>(&mut self, game: &mut G, dt: f32) -> Result<AppControl> {
        self.begin_frame();
        if self.update(game, dt) == AppControl::Exit {
            return Ok(AppControl::Exit);
        }
        self.start_render()?;
        game.render(self);
        self.frame_end();
        Ok(AppControl::Continue)
    }

    // ── tile map ──────────────────────────────────────────────────────────

    /// Binds sprite sheet `sheet` to map `layer`, or unbinds it with `None`.
    pub fn layer_sprite_sheet_set(&mut self, layer: usize, sheet: Option<usize>) -> Result<(), EngineError> {
        let layout = match sheet {
            Some(slot) => {
                check_slot(SlotKind::SpriteSheet, slot, self.renderer.config().max_sprite_sheets)?;
                self.renderer.sheet_layout(slot)
            }
            None => None,
        };
        self.tilemap.layer_sprite_sheet_set(layer, sheet, layout)
    }

    pub fn draw_map_layer(&mut self, layer: usize, pos: Vec2i) {
        self.tilemap.draw_map_layer(&mut self.renderer, layer, pos);
    }

    // ── display & host resources ──────────────────────────────────────────

    /// Changes the display resolution between frames.
    ///
    /// Every front buffer is resized in place; contents are undefined until the
    /// next frame draws them.
    pub fn display_resize(&mut self, size: Size) -> Result<(), EngineError> {
        if self.renderer.render_enabled() {
            return Err(EngineError::InvalidSize(
                "display cannot be resized during the render phase".into(),
            )
            .logged());
        }
        if size.is_empty() {
            return Err(EngineError::InvalidSize(format!(
                "display size {}x{} must be non-zero",
                size.width, size.height
            ))
            .logged());
        }
        if size == self.display {
            return Ok(());
        }

        self.front.resize(self.renderer.backend_mut(), size);
        self.display = size;
        if let Some(surface) = self.front.current_surface() {
            self.renderer.set_onscreen_surface(surface, size);
        }
        log::info!("display resized to {}x{}", size.width, size.height);
        Ok(())
    }

    /// Validates a channel index for the host audio layer.
    pub fn sound_channel_check(&self, channel: usize) -> Result<(), EngineError> {
        check_slot(SlotKind::SoundChannel, channel, self.renderer.config().sound_channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::{ClipRect, Rect};
    use crate::effects::EffectKind;
    use crate::input::Button;
    use crate::paint::Paint;
    use crate::render::{BackendCall, RecordingBackend};

    fn engine() -> Engine<RecordingBackend> {
        Engine::new(RecordingBackend::new(), HardwareConfig::default()).unwrap()
    }

    #[derive(Default)]
    struct Counter {
        updates: u32,
        renders: u32,
        pressed: u32,
        exit_after: Option<u32>,
    }

    impl Game<RecordingBackend> for Counter {
        fn init(&mut self, _engine: &mut Engine<RecordingBackend>) -> Result<()> {
            Ok(())
        }

        fn update(&mut self, engine: &mut Engine<RecordingBackend>) -> AppControl {
            self.updates += 1;
            if engine.buttons().button_pressed(Button::A) {
                self.pressed += 1;
            }
            match self.exit_after {
                Some(n) if self.updates >= n => AppControl::Exit,
                _ => AppControl::Continue,
            }
        }

        fn render(&mut self, engine: &mut Engine<RecordingBackend>) {
            self.renders += 1;
            engine
                .renderer_mut()
                .draw_rect_fill(Rect::new(0, 0, 8, 8), Paint::Indexed(1));
        }
    }

    // ── phases ────────────────────────────────────────────────────────────

    #[test]
    fn render_enabled_only_inside_render_phase() {
        let mut e = engine();
        assert!(!e.render_enabled());
        e.begin_frame();
        e.start_render().unwrap();
        assert!(e.render_enabled());
        e.frame_end();
        assert!(!e.render_enabled());
    }

    #[test]
    fn draws_outside_render_phase_are_dropped() {
        let mut e = engine();
        e.renderer_mut().draw_rect_fill(Rect::new(0, 0, 4, 4), Paint::Indexed(1));
        assert!(e.renderer().batch().is_empty());
    }

    #[test]
    fn start_render_clears_front_buffer_zero() {
        let mut e = engine();
        let surface = e.present_layers()[0].surface;
        e.renderer_mut().backend_mut().clear_calls();
        e.start_render().unwrap();
        assert!(e.renderer().backend().calls().iter().any(|c| matches!(
            c,
            BackendCall::ClearSurface { id, color } if *id == surface && *color == Color32::TRANSPARENT
        )));
    }

    #[test]
    fn frame_end_flushes_with_frame_end_reason() {
        let mut e = engine();
        let mut g = Counter::default();
        e.run_frame(&mut g, 1.0 / 60.0 + 1e-4).unwrap();
        assert_eq!(g.renders, 1);
        assert_eq!(e.renderer().backend().draws_with_reason(FlushReason::FrameEnd), 1);
    }

    #[test]
    fn updates_follow_the_fixed_rate() {
        let mut e = engine();
        let mut g = Counter::default();
        e.run_frame(&mut g, 0.008).unwrap();
        assert_eq!(g.updates, 0);
        e.run_frame(&mut g, 0.010).unwrap();
        assert_eq!(g.updates, 1);
        e.run_frame(&mut g, 0.05).unwrap();
        assert_eq!(g.updates, 4);
    }

    #[test]
    fn exit_from_update_skips_render() {
        let mut e = engine();
        let mut g = Counter { exit_after: Some(1), ..Default::default() };
        assert_eq!(e.run_frame(&mut g, 0.02).unwrap(), AppControl::Exit);
        assert_eq!(g.renders, 0);
    }

    #[test]
    fn buttons_are_sampled_per_update() {
        let mut e = engine();
        let mut g = Counter::default();
        e.buttons_mut().set_held(Button::A, true);
        e.run_frame(&mut g, 0.05).unwrap();
        assert_eq!(g.updates, 3);
        assert_eq!(g.pressed, 1);
    }

    // ── effects ───────────────────────────────────────────────────────────

    #[test]
    fn effect_apply_outside_render_is_rejected() {
        let mut e = engine();
        assert_eq!(e.effect_apply_now(), Err(EngineError::NotInRenderPhase));
        assert_eq!(e.present_layers().len(), 1);
    }

    #[test]
    fn effect_apply_splits_the_frame() {
        let mut e = engine();
        e.begin_frame();
        e.start_render().unwrap();
        e.renderer_mut().draw_rect_fill(Rect::new(0, 0, 8, 8), Paint::Indexed(1));

        e.effects_mut().set_intensity(EffectKind::Scanlines, 1.0);
        e.effect_apply_now().unwrap();
        e.effects_mut().set_intensity(EffectKind::Scanlines, 0.0);

        e.renderer_mut().draw_rect_fill(Rect::new(0, 0, 8, 8), Paint::Indexed(2));
        e.frame_end();

        let layers = e.present_layers();
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0].params.get(EffectKind::Scanlines).intensity, 1.0);
        assert_eq!(layers[1].params.get(EffectKind::Scanlines).intensity, 0.0);

        let backend = e.renderer().backend();
        assert_eq!(backend.draws_with_reason(FlushReason::EffectApply), 1);
        let targets: Vec<_> = backend.draws().map(|d| d.target).collect();
        assert_eq!(targets, vec![layers[0].surface, layers[1].surface]);
    }

    #[test]
    fn effect_apply_keeps_draw_state() {
        let mut e = engine();
        e.begin_frame();
        e.start_render().unwrap();
        e.renderer_mut().camera_set(Vec2i::new(10, 20));
        e.renderer_mut().clip_set(Rect::new(5, 5, 50, 50));
        e.effect_apply_now().unwrap();
        assert_eq!(e.renderer().camera(), Vec2i::new(10, 20));
        assert_eq!(e.renderer().state().clip, Some(Rect::new(5, 5, 50, 50)));
    }

    #[test]
    fn next_frame_starts_on_buffer_zero() {
        let mut e = engine();
        e.begin_frame();
        e.start_render().unwrap();
        e.effect_apply_now().unwrap();
        e.frame_end();
        assert_eq!(e.present_layers().len(), 2);

        e.begin_frame();
        assert_eq!(e.present_layers().len(), 1);
        assert_eq!(e.front_buffers().current_index(), 0);
    }

    #[test]
    fn render_time_pinhole_lands_before_the_split() {
        let mut e = engine();
        e.begin_frame();
        e.start_render().unwrap();
        e.effects_mut().set_intensity(EffectKind::Pinhole, 1.0);
        e.effect_apply_now().unwrap();
        let backend = e.renderer().backend();
        assert_eq!(backend.draw_count(), 1);
        assert_eq!(backend.draws().next().map(|d| d.vertices.len()), Some(4));
    }

    #[test]
    fn failed_buffer_growth_is_reported() {
        let mut e = engine();
        e.begin_frame();
        e.start_render().unwrap();
        e.renderer_mut().backend_mut().fail_surface_creation = true;
        assert!(matches!(e.effect_apply_now(), Err(EngineError::ResourceMissing(_))));
        assert!(e.render_enabled());
        assert_eq!(e.front_buffers().current_index(), 0);
    }

    // ── tile map ──────────────────────────────────────────────────────────

    #[test]
    fn unknown_sheet_slot_is_rejected() {
        let mut e = engine();
        assert!(matches!(
            e.layer_sprite_sheet_set(0, Some(99)),
            Err(EngineError::SlotOutOfRange { kind: SlotKind::SpriteSheet, .. })
        ));
    }

    #[test]
    fn tick_runs_once_per_frame() {
        let mut e = engine();
        for _ in 0..3 {
            e.begin_frame();
        }
        assert_eq!(e.tilemap().frame(), 3);
        assert_eq!(e.frame(), 3);
    }

    // ── display & host resources ──────────────────────────────────────────

    #[test]
    fn display_resize_resizes_every_front_buffer() {
        let mut e = engine();
        e.begin_frame();
        e.start_render().unwrap();
        e.effect_apply_now().unwrap();
        e.frame_end();
        e.renderer_mut().backend_mut().clear_calls();

        let size = Size::new(320, 180);
        e.display_resize(size).unwrap();

        assert_eq!(e.display_size(), size);
        assert_eq!(e.front_buffers().size(), size);
        assert_eq!(e.renderer().target_size(), size);
        let resized = e
            .renderer()
            .backend()
            .calls()
            .iter()
            .filter(|c| matches!(c, BackendCall::ResizeSurface { size: s, .. } if *s == size))
            .count();
        assert_eq!(resized, 2);

        e.begin_frame();
        e.start_render().unwrap();
        assert_eq!(e.renderer().clip_rect(), ClipRect::full(size));
    }

    #[test]
    fn display_resize_is_rejected_while_rendering() {
        let mut e = engine();
        e.begin_frame();
        e.start_render().unwrap();
        assert!(matches!(e.display_resize(Size::new(320, 180)), Err(EngineError::InvalidSize(_))));
        assert_eq!(e.display_size(), Size::new(480, 270));
    }

    #[test]
    fn empty_display_size_is_rejected() {
        let mut e = engine();
        assert!(e.display_resize(Size::new(0, 180)).is_err());
        assert_eq!(e.front_buffers().size(), Size::new(480, 270));
    }

    #[test]
    fn sound_channels_are_bounded_by_config() {
        let e = engine();
        assert!(e.sound_channel_check(7).is_ok());
        assert!(matches!(
            e.sound_channel_check(8),
            Err(EngineError::SlotOutOfRange { kind: SlotKind::SoundChannel, index: 8, max: 8 })
        ));
    }
}
