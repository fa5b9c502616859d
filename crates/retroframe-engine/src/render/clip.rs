use crate::coords::{ClipRect, Rect, Size};

/// Active scissor region plus coarse early rejection.
///
/// Rejection is an AABB test against the clip in continuous pixel space; exact
/// clipping is left to the GPU scissor.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ClipCuller {
    rect: ClipRect,
}

impl ClipCuller {
    pub fn new(target: Size) -> Self {
        Self { rect: ClipRect::full(target) }
    }

    #[inline]
    pub fn rect(&self) -> ClipRect {
        self.rect
    }

    /// Clip that `set(rect, target)` would install.
    #[inline]
    pub fn resolve(rect: Rect, target: Size) -> ClipRect {
        ClipRect::bounded(rect.normalized(), target)
    }

    #[inline]
    pub fn would_change(&self, rect: Rect, target: Size) -> bool {
        Self::resolve(rect, target) != self.rect
    }

    /// Installs `rect` bounded by `target`. Returns whether the clip changed.
    pub fn set(&mut self, rect: Rect, target: Size) -> bool {
        let next = Self::resolve(rect, target);
        let changed = next != self.rect;
        self.rect = next;
        changed
    }

    /// Resets the clip to cover the whole target. Returns whether the clip changed.
    pub fn reset(&mut self, target: Size) -> bool {
        let next = ClipRect::full(target);
        let changed = next != self.rect;
        self.rect = next;
        changed
    }

    /// True when the box `[min, max)` lies entirely outside the clip on some side.
    #[inline]
    pub fn rejects(&self, min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> bool {
        let c = self.rect;
        if c.is_empty() {
            return true;
        }
        max_x <= c.x0 as f32
            || max_y <= c.y0 as f32
            || min_x >= (c.x1 + 1) as f32
            || min_y >= (c.y1 + 1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: Size = Size::new(320, 240);

    #[test]
    fn default_covers_target() {
        let c = ClipCuller::new(TARGET);
        assert_eq!(c.rect(), ClipRect::new(0, 0, 319, 239));
        assert!(!c.rejects(0.0, 0.0, 1.0, 1.0));
        assert!(!c.rejects(319.0, 239.0, 320.0, 240.0));
    }

    #[test]
    fn boxes_outside_each_side_rejected() {
        let mut c = ClipCuller::new(TARGET);
        c.set(Rect::new(10, 10, 10, 10), TARGET);
        assert!(c.rejects(0.0, 12.0, 10.0, 13.0)); // left, touching
        assert!(c.rejects(20.0, 12.0, 25.0, 13.0)); // right
        assert!(c.rejects(12.0, 0.0, 13.0, 10.0)); // above
        assert!(c.rejects(12.0, 20.0, 13.0, 30.0)); // below
        assert!(!c.rejects(19.0, 19.0, 20.0, 20.0));
    }

    #[test]
    fn set_reports_change_once() {
        let mut c = ClipCuller::new(TARGET);
        assert!(c.set(Rect::new(0, 0, 8, 8), TARGET));
        assert!(!c.set(Rect::new(0, 0, 8, 8), TARGET));
        assert!(c.reset(TARGET));
        assert!(!c.reset(TARGET));
    }

    #[test]
    fn empty_clip_rejects_everything() {
        let mut c = ClipCuller::new(TARGET);
        c.set(Rect::new(400, 400, 8, 8), TARGET);
        assert!(c.rejects(0.0, 0.0, 320.0, 240.0));
    }
}
