//! Fixed-resolution, palette-aware 2D rendering engine.
//!
//! Draw calls are batched by [`render::Renderer`] into pooled vertex buckets and
//! flushed to a [`render::GraphicsBackend`]. Tile layers are drawn through cached
//! chunk meshes ([`tilemap::TilemapChunkCache`]). Mid-frame effect application
//! splits a frame into front buffers ([`effects::FrontBufferSequencer`]) that the
//! compositor replays with their own effect parameters.
//!
//! [`core::Engine`] ties these together behind explicit frame phases;
//! [`window::Runtime`] drives it from a winit event loop on wgpu.

pub mod config;
pub mod coords;
pub mod error;

pub mod paint;
pub mod render;
pub mod tilemap;
pub mod effects;

pub mod core;
pub mod input;
pub mod time;

pub mod logging;
pub mod device;
pub mod window;

pub use config::HardwareConfig;
pub use error::EngineError;
