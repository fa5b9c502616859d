//! wgpu implementation of the graphics backend and the front-buffer compositor.

mod backend;
mod compositor;
mod pipeline;

pub use backend::WgpuBackend;
pub use compositor::{letterbox, Compositor};
