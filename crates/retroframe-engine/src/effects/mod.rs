//! Front-buffer sequencing and post-processing effect state.
//!
//! A frame is a stack of front buffers. Applying effects mid-frame closes the
//! current buffer with a copy of the live effect parameters; the compositor later
//! replays each buffer with its own parameters.

mod params;
mod render_time;
mod sequencer;

pub use params::{EffectKind, EffectParam, EffectParams};
pub use render_time::draw_render_time;
pub use sequencer::{FrontBuffer, FrontBufferSequencer};
