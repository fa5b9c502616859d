//! Frame timing.
//!
//! One `FrameClock` tick per presented frame; `FixedStep` converts its delta into
//! the number of fixed-rate updates to run before rendering.

mod fixed_step;
mod frame_clock;

pub use fixed_step::FixedStep;
pub use frame_clock::{FrameClock, FrameTime};
