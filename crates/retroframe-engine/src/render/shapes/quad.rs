use crate::coords::{Rect, Vec2, Vec2i};
use crate::paint::Paint;
use crate::render::backend::GraphicsBackend;
use crate::render::renderer::Renderer;

use super::quad_corners;

impl<B: GraphicsBackend> Renderer<B> {
    pub fn draw_pixel(&mut self, pos: Vec2i, paint: Paint) {
        self.fill_rect(Rect::new(pos.x, pos.y, 1, 1), paint);
    }

    pub fn draw_rect_fill(&mut self, rect: Rect, paint: Paint) {
        let r = rect.normalized();
        if r.is_empty() {
            return;
        }
        self.fill_rect(r, paint);
    }

    /// Filled rectangle rotated by `degrees` about `pivot` (world pixels).
    pub fn draw_rect_fill_rotated(&mut self, rect: Rect, paint: Paint, pivot: Vec2, degrees: f32) {
        if degrees == 0.0 {
            self.draw_rect_fill(rect, paint);
            return;
        }
        let r = rect.normalized();
        if r.is_empty() || !self.begin_primitive(4, 6) {
            return;
        }
        let pivot = pivot - self.camera().to_f32();
        let corners = quad_corners(self.to_target(r.origin()), r.width as f32, r.height as f32)
            .map(|c| c.rotated_about(pivot, degrees));
        self.push_solid_quad(corners, paint);
    }

    /// One-pixel outline along the inside of `rect`.
    pub fn draw_rect(&mut self, rect: Rect, paint: Paint) {
        let r = rect.normalized();
        if r.is_empty() {
            return;
        }
        let (x0, y0) = (r.x, r.y);
        let (x1, y1) = (r.right() - 1, r.bottom() - 1);

        if r.height == 1 || r.width == 1 {
            self.draw_ortho_line(Vec2i::new(x0, y0), Vec2i::new(x1, y1), paint);
            return;
        }

        self.draw_ortho_line(Vec2i::new(x0, y0), Vec2i::new(x1, y0), paint);
        self.draw_ortho_line(Vec2i::new(x0, y1), Vec2i::new(x1, y1), paint);
        if r.height > 2 {
            self.draw_ortho_line(Vec2i::new(x0, y0 + 1), Vec2i::new(x0, y1 - 1), paint);
            self.draw_ortho_line(Vec2i::new(x1, y0 + 1), Vec2i::new(x1, y1 - 1), paint);
        }
    }

    fn fill_rect(&mut self, r: Rect, paint: Paint) {
        if !self.begin_primitive(4, 6) {
            return;
        }
        let corners = quad_corners(self.to_target(r.origin()), r.width as f32, r.height as f32);
        self.push_solid_quad(corners, paint);
    }

    /// Culls and appends a solid quad. Room must already be reserved.
    pub(in crate::render) fn push_solid_quad(&mut self, corners: [Vec2; 4], paint: Paint) {
        if self.rejects(&corners) {
            return;
        }
        let ink = self.solid_ink(paint);
        self.batch.push_quad(corners.map(|c| ink.vertex(c)));
    }
}
