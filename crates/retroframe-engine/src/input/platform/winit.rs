use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::input::{Button, Buttons};

/// Default keyboard layout of the pad: arrows or WASD, Z/X/A/S for the face
/// buttons, Enter and Backspace/Shift for Start and Select.
pub fn map_key(code: KeyCode) -> Option<Button> {
    use KeyCode::*;
    let button = match code {
        ArrowUp | KeyW => Button::Up,
        ArrowDown | KeyS => Button::Down,
        ArrowLeft | KeyA => Button::Left,
        ArrowRight | KeyD => Button::Right,
        KeyZ | KeyJ => Button::A,
        KeyX | KeyK => Button::B,
        KeyC | KeyU => Button::X,
        KeyV | KeyI => Button::Y,
        Enter => Button::Start,
        Backspace | ShiftRight => Button::Select,
        _ => return None,
    };
    Some(button)
}

/// Feeds keyboard and focus events into `buttons`. Returns `true` when the event
/// was consumed.
pub fn apply_window_event(buttons: &mut Buttons, event: &WindowEvent) -> bool {
    match event {
        WindowEvent::KeyboardInput { event, .. } => {
            let PhysicalKey::Code(code) = event.physical_key else {
                return false;
            };
            let Some(button) = map_key(code) else {
                return false;
            };
            buttons.set_held(button, event.state == ElementState::Pressed);
            true
        }
        WindowEvent::Focused(false) => {
            // Avoids buttons stuck down when focus changes mid-press.
            buttons.release_all();
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrows_and_wasd_share_directions() {
        assert_eq!(map_key(KeyCode::ArrowUp), Some(Button::Up));
        assert_eq!(map_key(KeyCode::KeyW), Some(Button::Up));
        assert_eq!(map_key(KeyCode::KeyD), Some(Button::Right));
    }

    #[test]
    fn unmapped_keys_are_ignored() {
        assert_eq!(map_key(KeyCode::F5), None);
        assert_eq!(map_key(KeyCode::Escape), None);
    }

    #[test]
    fn focus_loss_releases_buttons() {
        let mut b = Buttons::new();
        b.set_held(Button::A, true);
        b.advance();
        assert!(apply_window_event(&mut b, &WindowEvent::Focused(false)));
        b.advance();
        assert!(b.button_released(Button::A));
    }
}
