use super::{Rect, Size};

/// Inclusive pixel rectangle `(x0, y0)..=(x1, y1)` used as the scissor region.
///
/// An empty clip is represented with `x1 < x0` or `y1 < y0`; it rejects everything.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ClipRect {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl ClipRect {
    pub const EMPTY: ClipRect = ClipRect { x0: 0, y0: 0, x1: -1, y1: -1 };

    #[inline]
    pub const fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Clip covering a whole surface of `size`.
    #[inline]
    pub fn full(size: Size) -> Self {
        Self::new(0, 0, size.width as i32 - 1, size.height as i32 - 1)
    }

    /// Clip covering `rect`, bounded by a surface of `size`.
    pub fn bounded(rect: Rect, size: Size) -> Self {
        match rect.intersect(Rect::from_size(size)) {
            Some(r) => Self::new(r.x, r.y, r.right() - 1, r.bottom() - 1),
            None => Self::EMPTY,
        }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.x1 < self.x0 || self.y1 < self.y0
    }

    #[inline]
    pub fn width(self) -> u32 {
        (self.x1 - self.x0 + 1).max(0) as u32
    }

    #[inline]
    pub fn height(self) -> u32 {
        (self.y1 - self.y0 + 1).max(0) as u32
    }

    #[inline]
    pub fn to_rect(self) -> Rect {
        Rect::new(self.x0, self.y0, self.width() as i32, self.height() as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_is_inclusive() {
        let c = ClipRect::full(Size::new(320, 240));
        assert_eq!((c.x1, c.y1), (319, 239));
        assert_eq!(c.width(), 320);
    }

    #[test]
    fn bounded_clamps_to_surface() {
        let c = ClipRect::bounded(Rect::new(-10, -10, 20, 20), Size::new(100, 100));
        assert_eq!(c, ClipRect::new(0, 0, 9, 9));
    }

    #[test]
    fn bounded_outside_surface_is_empty() {
        let c = ClipRect::bounded(Rect::new(200, 200, 5, 5), Size::new(100, 100));
        assert!(c.is_empty());
        assert_eq!(c.to_rect().width, 0);
    }
}
