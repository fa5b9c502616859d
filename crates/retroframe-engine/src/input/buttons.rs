use crate::core::DoubleBuffered;

/// Buttons of the virtual pad.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Button {
    Up,
    Down,
    Left,
    Right,
    A,
    B,
    X,
    Y,
    Start,
    Select,
}

impl Button {
    pub const COUNT: usize = 10;

    pub const ALL: [Button; Button::COUNT] = [
        Button::Up,
        Button::Down,
        Button::Left,
        Button::Right,
        Button::A,
        Button::B,
        Button::X,
        Button::Y,
        Button::Start,
        Button::Select,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Pad state sampled once per fixed update.
///
/// Platform events update `held` at any time; `advance` snapshots it into the
/// current frame and retires the previous one, so `button_pressed` and
/// `button_released` report edges between two consecutive updates.
#[derive(Debug, Default)]
pub struct Buttons {
    held: [bool; Button::COUNT],
    frames: DoubleBuffered<[bool; Button::COUNT]>,
}

impl Buttons {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the latest platform state of `button`.
    pub fn set_held(&mut self, button: Button, down: bool) {
        self.held[button.index()] = down;
    }

    /// Releases everything, e.g. on focus loss.
    pub fn release_all(&mut self) {
        self.held = [false; Button::COUNT];
    }

    pub fn advance(&mut self) {
        self.frames.advance_with(self.held);
    }

    #[inline]
    pub fn button_down(&self, button: Button) -> bool {
        self.frames.current()[button.index()]
    }

    #[inline]
    pub fn button_pressed(&self, button: Button) -> bool {
        let i = button.index();
        self.frames.current()[i] && !self.frames.previous()[i]
    }

    #[inline]
    pub fn button_released(&self, button: Button) -> bool {
        let i = button.index();
        !self.frames.current()[i] && self.frames.previous()[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_indexes_in_order() {
        for (i, b) in Button::ALL.iter().enumerate() {
            assert_eq!(b.index(), i);
        }
    }

    #[test]
    fn state_is_sampled_on_advance() {
        let mut b = Buttons::new();
        b.set_held(Button::A, true);
        assert!(!b.button_down(Button::A));
        b.advance();
        assert!(b.button_down(Button::A));
    }

    #[test]
    fn press_and_release_are_single_update_edges() {
        let mut b = Buttons::new();
        b.set_held(Button::Start, true);
        b.advance();
        assert!(b.button_pressed(Button::Start));
        b.advance();
        assert!(!b.button_pressed(Button::Start));
        assert!(b.button_down(Button::Start));

        b.set_held(Button::Start, false);
        b.advance();
        assert!(b.button_released(Button::Start));
        b.advance();
        assert!(!b.button_released(Button::Start));
    }

    #[test]
    fn tap_between_updates_is_missed() {
        let mut b = Buttons::new();
        b.set_held(Button::B, true);
        b.set_held(Button::B, false);
        b.advance();
        assert!(!b.button_pressed(Button::B));
    }

    #[test]
    fn release_all_clears_held() {
        let mut b = Buttons::new();
        b.set_held(Button::Left, true);
        b.advance();
        b.release_all();
        b.advance();
        assert!(b.button_released(Button::Left));
    }
}
