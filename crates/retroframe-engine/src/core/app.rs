use crate::render::GraphicsBackend;

use super::engine::Engine;

/// Control directive returned by game callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Game contract driven by the runtime loop.
pub trait Game<B: GraphicsBackend> {
    /// Called once after the engine is created, before the first frame.
    fn init(&mut self, engine: &mut Engine<B>) -> anyhow::Result<()>;

    /// Called once per fixed update.
    fn update(&mut self, engine: &mut Engine<B>) -> AppControl;

    /// Called once per frame, inside the render phase.
    fn render(&mut self, engine: &mut Engine<B>);
}
