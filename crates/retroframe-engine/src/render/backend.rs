use anyhow::Result;
use bytemuck::{Pod, Zeroable};

use crate::coords::{ClipRect, Color32, Rect, Size};

use super::flush::FlushReason;
use super::vertex::Vertex;

/// Backend texture handle (sprite sheets, the system lookup texture).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureId(pub u32);

/// Backend render-target handle (front buffers, offscreen surfaces).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SurfaceId(pub u32);

/// Backend shader program handle.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ShaderId(pub u32);

/// Sampling filter for a surface bound as a texture.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum FilterMode {
    #[default]
    Point,
    Linear,
}

/// Texture sampled by `flags != 0` vertices of a draw.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SourceBinding {
    None,
    Texture(TextureId),
    Surface(SurfaceId),
}

/// Per-draw shader globals.
///
/// Layout matches the `Uniforms` block of the batch shader.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct BatchUniforms {
    /// Inclusive clip `(x0, y0, x1, y1)` in target pixels.
    pub clip: [f32; 4],
    pub target_size: [f32; 2],
    pub system_size: [f32; 2],
    pub source_size: [f32; 2],
    /// 1.0 when the source holds palette indices.
    pub source_indexed: f32,
    pub pass_index: f32,
}

impl BatchUniforms {
    pub fn new(clip: ClipRect, target: Size, system: Size, source: Size, indexed: bool) -> Self {
        Self {
            clip: [clip.x0 as f32, clip.y0 as f32, clip.x1 as f32, clip.y1 as f32],
            target_size: [target.width as f32, target.height as f32],
            system_size: [system.width as f32, system.height as f32],
            source_size: [source.width.max(1) as f32, source.height.max(1) as f32],
            source_indexed: if indexed { 1.0 } else { 0.0 },
            pass_index: 0.0,
        }
    }
}

/// One indexed triangle-list submission against a render target.
#[derive(Debug)]
pub struct DrawSubmission<'a> {
    pub target: SurfaceId,
    pub clip: ClipRect,
    pub system_texture: TextureId,
    pub source: SourceBinding,
    pub shader: Option<ShaderId>,
    pub pass: u32,
    pub uniforms: BatchUniforms,
    /// Bucket the mesh was reduced into; backends keep one GPU buffer pair per bucket.
    pub bucket: usize,
    pub vertices: &'a [Vertex],
    pub indices: &'a [u16],
    pub vertex_count: usize,
    pub index_count: usize,
    pub reason: FlushReason,
}

/// GPU operations the renderer needs.
///
/// Resource creation returns `anyhow::Result`; per-frame operations are fire-and-forget
/// and log their own failures.
pub trait GraphicsBackend {
    /// Creates an RGBA8 texture initialized with `rgba` (tightly packed).
    fn create_texture(&mut self, label: &str, size: Size, rgba: &[u8]) -> Result<TextureId>;

    /// Replaces `region` of `texture` with tightly packed RGBA8 data.
    fn write_texture(&mut self, texture: TextureId, region: Rect, rgba: &[u8]);

    fn destroy_texture(&mut self, texture: TextureId);

    /// Creates a render target cleared to transparent.
    fn create_surface(&mut self, label: &str, size: Size) -> Result<SurfaceId>;

    /// Resizes `surface`; contents become undefined.
    fn resize_surface(&mut self, surface: SurfaceId, size: Size);

    fn clear_surface(&mut self, surface: SurfaceId, color: Color32);

    fn set_surface_filter(&mut self, surface: SurfaceId, filter: FilterMode);

    /// Compiles a program with the batch vertex interface.
    fn load_shader(&mut self, label: &str, source: &str) -> Result<ShaderId>;

    fn draw(&mut self, submission: &DrawSubmission<'_>);
}
