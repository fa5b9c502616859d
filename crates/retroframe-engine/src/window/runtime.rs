use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::config::HardwareConfig;
use crate::coords::Size;
use crate::core::{AppControl, Engine, Game};
use crate::device::{Gpu, GpuInit, SurfaceErrorAction};
use crate::input::platform::winit::apply_window_event;
use crate::render::gpu::{Compositor, WgpuBackend};
use crate::time::FrameClock;

/// Window and engine configuration for `Runtime::run`.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    /// Initial window size; the display is letterboxed into whatever size it ends up.
    pub initial_size: LogicalSize<f64>,
    pub hardware: HardwareConfig,
    /// Escape closes the window.
    pub escape_exits: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let hardware = HardwareConfig::default();
        let scale = 3.0;
        Self {
            title: "retroframe".to_string(),
            initial_size: LogicalSize::new(
                hardware.display_size.width as f64 * scale,
                hardware.display_size.height as f64 * scale,
            ),
            hardware,
            escape_exits: true,
        }
    }
}

/// Entry point: opens the window, creates the engine on its device and drives
/// `game` until it exits or the window closes.
pub struct Runtime;

impl Runtime {
    pub fn run<G>(config: RuntimeConfig, gpu_init: GpuInit, game: G) -> Result<()>
    where
        G: Game<WgpuBackend> + 'static,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, gpu_init, game);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.failure.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[self_referencing]
struct WindowEntry {
    clock: FrameClock,

    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

struct AppState<G>
where
    G: Game<WgpuBackend> + 'static,
{
    config: RuntimeConfig,
    gpu_init: GpuInit,
    game: G,

    entry: Option<WindowEntry>,
    engine: Option<Engine<WgpuBackend>>,
    compositor: Compositor,

    exit_requested: bool,
    /// First fatal error, returned from `Runtime::run`.
    failure: Option<anyhow::Error>,
}

impl<G> AppState<G>
where
    G: Game<WgpuBackend> + 'static,
{
    fn new(config: RuntimeConfig, gpu_init: GpuInit, game: G) -> Self {
        Self {
            config,
            gpu_init,
            game,
            entry: None,
            engine: None,
            compositor: Compositor::new(),
            exit_requested: false,
            failure: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        if self.failure.is_none() {
            self.failure = Some(err);
        }
        self.exit_requested = true;
        event_loop.exit();
    }

    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);
        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let gpu_init = self.gpu_init.clone();
        let entry = WindowEntryTryBuilder {
            clock: FrameClock::default(),
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .try_build()
        .context("GPU initialization failed")?;

        let backend = entry.with_gpu(|gpu| {
            WgpuBackend::new(gpu.device(), gpu.queue(), &self.config.hardware)
        });
        let mut engine = Engine::new(backend, self.config.hardware.clone())?;
        self.game.init(&mut engine).context("game init failed")?;

        entry.with_window(|w| w.request_redraw());
        self.entry = Some(entry);
        self.engine = Some(engine);
        Ok(())
    }

    /// Runs one engine frame and composites it onto the swapchain.
    fn redraw(&mut self) -> Result<AppControl> {
        let (Some(entry), Some(engine)) = (self.entry.as_mut(), self.engine.as_mut()) else {
            return Ok(AppControl::Continue);
        };

        let ft = entry.with_clock_mut(|c| c.tick());
        if engine.run_frame(&mut self.game, ft.dt)? == AppControl::Exit {
            return Ok(AppControl::Exit);
        }

        let compositor = &mut self.compositor;
        let engine = &*engine;
        let control = entry.with_mut(|fields| {
            let mut frame = match fields.gpu.begin_frame() {
                Ok(frame) => frame,
                Err(err) => {
                    log::warn!("surface error: {err}");
                    return match fields.gpu.handle_surface_error(err) {
                        SurfaceErrorAction::Fatal => AppControl::Exit,
                        _ => AppControl::Continue,
                    };
                }
            };

            let physical = fields.gpu.size();
            compositor.present(
                engine.renderer().backend(),
                &mut frame.encoder,
                &frame.view,
                fields.gpu.surface_format(),
                Size::new(physical.width, physical.height),
                engine.display_size(),
                engine.present_layers(),
            );

            fields.window.pre_present_notify();
            fields.gpu.submit(frame);
            AppControl::Continue
        });
        Ok(control)
    }
}

impl<G> ApplicationHandler for AppState<G>
where
    G: Game<WgpuBackend> + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() {
            return;
        }
        if let Err(err) = self.create_window(event_loop) {
            self.fail(event_loop, err.context("failed to start runtime"));
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw; the fixed step paces updates.
        if let Some(entry) = &self.entry {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        if let Some(engine) = self.engine.as_mut() {
            apply_window_event(engine.buttons_mut(), &event);
        }

        match &event {
            WindowEvent::CloseRequested => {
                self.exit_requested = true;
                event_loop.exit();
            }

            WindowEvent::KeyboardInput { event: key, .. }
                if self.config.escape_exits
                    && key.state == ElementState::Pressed
                    && key.physical_key == PhysicalKey::Code(KeyCode::Escape) =>
            {
                self.exit_requested = true;
                event_loop.exit();
            }

            WindowEvent::Resized(new_size) => {
                if let Some(entry) = self.entry.as_mut() {
                    entry.with_gpu_mut(|gpu| gpu.resize(*new_size));
                    entry.with_window(|w| w.request_redraw());
                }
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(entry) = self.entry.as_mut() {
                    let new_size = entry.with_window(|w| w.inner_size());
                    entry.with_gpu_mut(|gpu| gpu.resize(new_size));
                    entry.with_window(|w| w.request_redraw());
                }
            }

            WindowEvent::Focused(true) => {
                if let Some(entry) = self.entry.as_mut() {
                    entry.with_clock_mut(|c| c.reset());
                }
            }

            WindowEvent::RedrawRequested => match self.redraw() {
                Ok(AppControl::Continue) => {}
                Ok(AppControl::Exit) => {
                    self.exit_requested = true;
                    event_loop.exit();
                }
                Err(err) => self.fail(event_loop, err),
            },

            _ => {}
        }
    }
}
