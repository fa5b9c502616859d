mod sheet;

use anyhow::Result;

use retroframe_engine::core::{AppControl, Engine, Game};
use retroframe_engine::coords::{Color32, Rect, Size, Vec2, Vec2i};
use retroframe_engine::device::GpuInit;
use retroframe_engine::effects::{EffectKind, EffectParam};
use retroframe_engine::input::Button;
use retroframe_engine::logging::{init_logging, LoggingConfig};
use retroframe_engine::paint::Paint;
use retroframe_engine::render::{GraphicsBackend, SpriteFlags, SpriteSheetDesc};
use retroframe_engine::window::{Runtime, RuntimeConfig};

const SHEET: usize = 0;
const GROUND: usize = 0;
const MAP_W: i32 = 256;
const MAP_H: i32 = 34;
const IRIS_FRAMES: u32 = 90;

/// Side-scrolling field with a player sprite. Start toggles the autumn palette
/// swap, A plays an iris transition over the world while the HUD stays visible.
struct Scroller {
    player: Vec2i,
    camera: Vec2i,
    facing_left: bool,
    autumn: bool,
    iris: Option<u32>,
    ticks: u32,
}

impl Scroller {
    fn new() -> Self {
        Self {
            player: Vec2i::new(64, 200),
            camera: Vec2i::zero(),
            facing_left: false,
            autumn: false,
            iris: None,
            ticks: 0,
        }
    }

    /// Closes over the first half of the transition and opens over the second.
    fn iris_intensity(&self) -> f32 {
        match self.iris {
            Some(t) => {
                let half = IRIS_FRAMES as f32 / 2.0;
                1.0 - ((t as f32 - half).abs() / half)
            }
            None => 0.0,
        }
    }

    fn ground_row(column: i32) -> i32 {
        28 - ((column as f32 * 0.15).sin() * 2.0).round() as i32
    }

    fn build_map<B: GraphicsBackend>(engine: &mut Engine<B>) {
        let map = engine.tilemap_mut();
        for x in 0..MAP_W {
            let ground = Self::ground_row(x);
            for y in ground..MAP_H {
                let sprite = if y == ground { sheet::GRASS } else { sheet::BRICK };
                map.sprite_set(GROUND, x, y, sprite, Color32::WHITE, 0, SpriteFlags::empty());
            }
            if x % 23 == 7 {
                for y in 30..MAP_H {
                    map.sprite_set(GROUND, x, y, sheet::WATER, Color32::WHITE, 0, SpriteFlags::empty());
                }
            }
            if x % 11 == 3 {
                let y = 4 + (x * 7) % 12;
                map.sprite_set(GROUND, x, y, sheet::STAR, Color32::WHITE, 0, SpriteFlags::empty());
            }
        }
    }

    /// Rewrites every tile with palette swap `swap`; changed chunks regenerate on
    /// their next draw.
    fn restyle_map<B: GraphicsBackend>(engine: &mut Engine<B>, swap: u16) {
        let map = engine.tilemap_mut();
        for y in 0..MAP_H {
            for x in 0..MAP_W {
                let t = map.tile_get(GROUND, x, y);
                if !t.is_empty() {
                    map.sprite_set(GROUND, x, y, t.sprite, t.tint, swap, t.flags);
                }
            }
        }
    }
}

impl<B: GraphicsBackend> Game<B> for Scroller {
    fn init(&mut self, engine: &mut Engine<B>) -> Result<()> {
        let r = engine.renderer_mut();
        r.palette_load(&sheet::palette());
        r.palette_swap_setup(1, &sheet::autumn_swap())?;

        let rgba = sheet::build();
        r.sprite_sheet_setup(
            SHEET,
            &SpriteSheetDesc {
                size: sheet::SHEET_SIZE,
                sprite_size: Size::new(sheet::SPRITE, sheet::SPRITE),
                rgba: &rgba,
                palettize: true,
            },
        )?;

        engine.layer_sprite_sheet_set(GROUND, Some(SHEET))?;
        Self::build_map(engine);
        log::info!("demo: map built, {} tiles wide", MAP_W);
        Ok(())
    }

    fn update(&mut self, engine: &mut Engine<B>) -> AppControl {
        self.ticks += 1;
        let pad = engine.buttons();

        if pad.button_down(Button::Left) {
            self.player.x -= 2;
            self.facing_left = true;
        }
        if pad.button_down(Button::Right) {
            self.player.x += 2;
            self.facing_left = false;
        }
        let toggle = pad.button_pressed(Button::Start);
        if pad.button_pressed(Button::A) && self.iris.is_none() {
            self.iris = Some(0);
        }
        if pad.button_pressed(Button::Select) {
            return AppControl::Exit;
        }
        if toggle {
            self.autumn = !self.autumn;
            Self::restyle_map(engine, u16::from(self.autumn));
        }

        let map_px = MAP_W * sheet::SPRITE as i32;
        self.player.x = self.player.x.clamp(0, map_px - sheet::SPRITE as i32);

        let display = engine.display_size();
        let half = display.width as i32 / 2;
        self.camera.x = (self.player.x - half).clamp(0, map_px - display.width as i32);

        self.iris = match self.iris {
            Some(t) if t + 1 >= IRIS_FRAMES => None,
            Some(t) => Some(t + 1),
            None => None,
        };
        AppControl::Continue
    }

    fn render(&mut self, engine: &mut Engine<B>) {
        let display = engine.display_size();
        let swap = usize::from(self.autumn);

        {
            let r = engine.renderer_mut();
            r.clear(Paint::Indexed(1));
            r.camera_set(self.camera);
            // Parallax hills, slower than the map.
            let hills = self.camera.x / 3;
            for i in 0..6 {
                let cx = i * 120 - hills % 120;
                r.draw_ellipse_fill(Vec2i::new(cx, 230), Vec2i::new(80, 50), Paint::Indexed(13));
            }
            let _ = r.palette_swap_set(swap);
        }

        engine.draw_map_layer(GROUND, Vec2i::zero());

        {
            let r = engine.renderer_mut();
            let _ = r.sprite_sheet_set(SHEET);
            let flags = if self.facing_left { SpriteFlags::FLIP_H } else { SpriteFlags::empty() };
            let ground = Self::ground_row(self.player.x / sheet::SPRITE as i32);
            r.draw_sprite(sheet::PLAYER, Vec2i::new(self.player.x, ground * 8 - 8), flags);
            let _ = r.palette_swap_set(0);
        }

        // Everything so far is the world; the iris only covers it.
        let iris = self.iris_intensity();
        if iris > 0.0 {
            let effects = engine.effects_mut();
            effects.set(
                EffectKind::Pinhole,
                EffectParam {
                    intensity: iris,
                    vector: Vec2::new((self.player.x - self.camera.x - display.width as i32 / 2) as f32, 0.0),
                    color: Color32::BLACK,
                },
            );
            effects.set_intensity(EffectKind::Scanlines, 0.3);
            if let Err(err) = engine.effect_apply_now() {
                log::warn!("iris: {err}");
            }
            let effects = engine.effects_mut();
            effects.reset(EffectKind::Pinhole);
            effects.reset(EffectKind::Scanlines);
        }

        let r = engine.renderer_mut();
        r.camera_reset();
        r.draw_rect_fill(Rect::new(0, 0, display.width as i32, 11), Paint::Rgb(Color32::BLACK));
        r.draw_line(Vec2i::new(0, 11), Vec2i::new(display.width as i32 - 1, 11), Paint::Indexed(6));
        let stats = r.stats().previous_total();
        let hud = format!(
            "X {:4}  FLUSHES {:3}  {}",
            self.player.x,
            stats,
            if self.autumn { "AUTUMN" } else { "SUMMER" }
        );
        r.draw_debug_text(Vec2i::new(2, 2), &hud, Paint::Indexed(7));
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = RuntimeConfig {
        title: "retroframe demo".to_string(),
        ..Default::default()
    };
    Runtime::run(config, GpuInit::default(), Scroller::new())
}
