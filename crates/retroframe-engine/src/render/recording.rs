use anyhow::Result;

use crate::coords::{ClipRect, Color32, Rect, Size};

use super::backend::{
    DrawSubmission, FilterMode, GraphicsBackend, ShaderId, SourceBinding, SurfaceId, TextureId,
};
use super::flush::FlushReason;
use super::vertex::Vertex;

/// A draw as seen by `RecordingBackend`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDraw {
    pub target: SurfaceId,
    pub clip: ClipRect,
    pub source: SourceBinding,
    pub shader: Option<ShaderId>,
    pub pass: u32,
    pub bucket: usize,
    pub reason: FlushReason,
    /// Live vertices (`vertex_count` of the submission, not the whole bucket).
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    CreateTexture { id: TextureId, label: String, size: Size },
    WriteTexture { id: TextureId, region: Rect },
    DestroyTexture(TextureId),
    CreateSurface { id: SurfaceId, label: String, size: Size },
    ResizeSurface { id: SurfaceId, size: Size },
    ClearSurface { id: SurfaceId, color: Color32 },
    SetFilter { id: SurfaceId, filter: FilterMode },
    LoadShader { id: ShaderId, label: String },
    Draw(RecordedDraw),
}

/// Headless backend that records every call.
///
/// Used by tests and tools that need the engine's output without a GPU. Creation
/// calls can be made to fail to exercise resource-missing paths.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Vec<BackendCall>,
    next_id: u32,
    pub fail_texture_creation: bool,
    pub fail_surface_creation: bool,
    pub fail_shader_loading: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn draws(&self) -> impl Iterator<Item = &RecordedDraw> + '_ {
        self.calls.iter().filter_map(|c| match c {
            BackendCall::Draw(d) => Some(d),
            _ => None,
        })
    }

    pub fn draw_count(&self) -> usize {
        self.draws().count()
    }

    pub fn draws_with_reason(&self, reason: FlushReason) -> usize {
        self.draws().filter(|d| d.reason == reason).count()
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

impl GraphicsBackend for RecordingBackend {
    fn create_texture(&mut self, label: &str, size: Size, rgba: &[u8]) -> Result<TextureId> {
        anyhow::ensure!(!self.fail_texture_creation, "texture creation disabled");
        anyhow::ensure!(
            rgba.len() == size.area() * 4,
            "texture {label}: expected {} bytes, got {}",
            size.area() * 4,
            rgba.len()
        );
        let id = TextureId(self.next());
        self.calls.push(BackendCall::CreateTexture { id, label: label.to_string(), size });
        Ok(id)
    }

    fn write_texture(&mut self, id: TextureId, region: Rect, _rgba: &[u8]) {
        self.calls.push(BackendCall::WriteTexture { id, region });
    }

    fn destroy_texture(&mut self, id: TextureId) {
        self.calls.push(BackendCall::DestroyTexture(id));
    }

    fn create_surface(&mut self, label: &str, size: Size) -> Result<SurfaceId> {
        anyhow::ensure!(!self.fail_surface_creation, "surface creation disabled");
        let id = SurfaceId(self.next());
        self.calls.push(BackendCall::CreateSurface { id, label: label.to_string(), size });
        Ok(id)
    }

    fn resize_surface(&mut self, id: SurfaceId, size: Size) {
        self.calls.push(BackendCall::ResizeSurface { id, size });
    }

    fn clear_surface(&mut self, id: SurfaceId, color: Color32) {
        self.calls.push(BackendCall::ClearSurface { id, color });
    }

    fn set_surface_filter(&mut self, id: SurfaceId, filter: FilterMode) {
        self.calls.push(BackendCall::SetFilter { id, filter });
    }

    fn load_shader(&mut self, label: &str, _source: &str) -> Result<ShaderId> {
        anyhow::ensure!(!self.fail_shader_loading, "shader {label} failed to compile");
        let id = ShaderId(self.next());
        self.calls.push(BackendCall::LoadShader { id, label: label.to_string() });
        Ok(id)
    }

    fn draw(&mut self, s: &DrawSubmission<'_>) {
        self.calls.push(BackendCall::Draw(RecordedDraw {
            target: s.target,
            clip: s.clip,
            source: s.source,
            shader: s.shader,
            pass: s.pass,
            bucket: s.bucket,
            reason: s.reason,
            vertices: s.vertices[..s.vertex_count].to_vec(),
            indices: s.indices[..s.index_count].to_vec(),
        }));
    }
}
