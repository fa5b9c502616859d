//! Batched renderer.
//!
//! Draw calls append palette-addressed vertices into size-bucketed batches that are
//! flushed to a `GraphicsBackend` when bound state changes or room runs out.
//!
//! Convention:
//! - Geometry is in target pixels (top-left origin, +Y down), after the camera offset.
//! - Vertex `z` selects the palette lookup row; UVs are in texels.

mod backend;
mod batch;
mod clip;
pub mod debug_text;
mod flush;
mod mesh;
mod recording;
mod renderer;
mod resources;
mod shapes;
mod state;
#[cfg(test)]
pub(crate) mod testing;
mod vertex;

pub mod gpu;

pub use backend::{
    BatchUniforms, DrawSubmission, FilterMode, GraphicsBackend, ShaderId, SourceBinding,
    SurfaceId, TextureId,
};
pub use batch::{bucket_sizes, BatchView, VertexBatch};
pub use clip::ClipCuller;
pub use flush::{FlushReason, FlushStats};
pub use mesh::PreparedMesh;
pub use recording::{BackendCall, RecordedDraw, RecordingBackend};
pub use renderer::Renderer;
pub use resources::{RenderTarget, SheetLayout, SpriteSheet, SpriteSheetDesc, SpriteSource};
pub use shapes::NineSlice;
pub use state::DrawState;
pub use vertex::{oriented_uvs, SpriteFlags, Vertex};
pub(crate) use vertex::FLAGS_SHEET;
