//! winit window and the loop driving the engine phases.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
