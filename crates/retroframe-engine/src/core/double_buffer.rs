/// Current/previous pair with an explicit advance step.
///
/// Producers write into `current` during a frame (or fixed update); `advance_with`
/// retires it to `previous` and installs the next value. Button polling and flush
/// statistics both read "this frame vs last frame" through this type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DoubleBuffered<T> {
    current: T,
    previous: T,
}

impl<T> DoubleBuffered<T> {
    pub fn new(current: T, previous: T) -> Self {
        Self { current, previous }
    }

    #[inline]
    pub fn current(&self) -> &T {
        &self.current
    }

    #[inline]
    pub fn current_mut(&mut self) -> &mut T {
        &mut self.current
    }

    #[inline]
    pub fn previous(&self) -> &T {
        &self.previous
    }

    /// Retires `current` to `previous` and installs `next`.
    #[inline]
    pub fn advance_with(&mut self, next: T) {
        self.previous = std::mem::replace(&mut self.current, next);
    }
}

impl<T: Clone> DoubleBuffered<T> {
    /// Retires `current` to `previous`, keeping it as the starting value.
    #[inline]
    pub fn advance(&mut self) {
        self.previous = self.current.clone();
    }
}
