//! Fixtures shared by renderer tests across the crate.

use crate::config::HardwareConfig;
use crate::coords::Vec2;
use crate::render::backend::GraphicsBackend;
use crate::render::recording::RecordingBackend;
use crate::render::renderer::Renderer;

/// Renderer on a recording backend, in the render phase, with an onscreen surface.
pub fn renderer_with(config: HardwareConfig) -> Renderer<RecordingBackend> {
    let mut backend = RecordingBackend::new();
    let size = config.display_size;
    let surface = backend.create_surface("front 0", size).expect("surface");
    let mut r = Renderer::new(backend, config).expect("renderer");
    r.set_onscreen_surface(surface, size);
    r.start_render();
    r.backend_mut().clear_calls();
    r
}

pub fn renderer() -> Renderer<RecordingBackend> {
    renderer_with(HardwareConfig::default())
}

/// Positions of the live batch vertices.
pub fn positions(r: &Renderer<RecordingBackend>) -> Vec<Vec2> {
    r.batch().live_vertices().iter().map(|v| v.position()).collect()
}
