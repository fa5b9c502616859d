//! Virtual pad input.
//!
//! The pad state is platform-agnostic; `platform` translates winit keyboard
//! events into it.

mod buttons;
pub mod platform {
    pub mod winit;
}

pub use buttons::{Button, Buttons};
