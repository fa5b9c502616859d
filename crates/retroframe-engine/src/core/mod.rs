//! Engine phases and the game contract.
//!
//! The runtime loop owns an `Engine` and a `Game` and calls the phases in order:
//! `begin_frame`, fixed updates, `start_render`, the game's render, `frame_end`,
//! then composites `present_layers`.

mod app;
mod double_buffer;
mod engine;

pub use app::{AppControl, Game};
pub use double_buffer::DoubleBuffered;
pub use engine::Engine;
