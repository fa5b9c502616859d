use crate::coords::{Vec2, Vec2i};
use crate::paint::Paint;
use crate::render::backend::GraphicsBackend;
use crate::render::renderer::Renderer;

/// Dominant direction of a line, split at the diagonals.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum LineQuadrant {
    East,
    South,
    West,
    North,
}

impl LineQuadrant {
    fn of(d: Vec2) -> Self {
        if d.x.abs() >= d.y.abs() {
            if d.x >= 0.0 {
                LineQuadrant::East
            } else {
                LineQuadrant::West
            }
        } else if d.y >= 0.0 {
            LineQuadrant::South
        } else {
            LineQuadrant::North
        }
    }

    /// Half-pixel offset applied to the long edges, turning left of the direction.
    fn edge_offset(self) -> Vec2 {
        match self {
            LineQuadrant::East => Vec2::new(0.0, -0.5),
            LineQuadrant::South => Vec2::new(0.5, 0.0),
            LineQuadrant::West => Vec2::new(0.0, 0.5),
            LineQuadrant::North => Vec2::new(-0.5, 0.0),
        }
    }
}

impl<B: GraphicsBackend> Renderer<B> {
    /// Horizontal or vertical line as a single triangle.
    ///
    /// The triangle spans the first pixel's full edge and tapers to the center of
    /// the edge past the last pixel, which covers exactly the pixel centers of the
    /// run. Lines that are neither are forwarded to `draw_line`.
    pub fn draw_ortho_line(&mut self, p0: Vec2i, p1: Vec2i, paint: Paint) {
        if p0.x != p1.x && p0.y != p1.y {
            self.draw_line(p0, p1, paint);
            return;
        }
        if !self.begin_primitive(3, 3) {
            return;
        }

        let a = self.to_target(p0);
        let b = self.to_target(p1);
        let tri = if p0.y == p1.y {
            let (x0, x1) = (a.x.min(b.x), a.x.max(b.x));
            [
                Vec2::new(x0, a.y),
                Vec2::new(x0, a.y + 1.0),
                Vec2::new(x1 + 1.0, a.y + 0.5),
            ]
        } else {
            let (y0, y1) = (a.y.min(b.y), a.y.max(b.y));
            [
                Vec2::new(a.x, y0),
                Vec2::new(a.x + 1.0, y0),
                Vec2::new(a.x + 0.5, y1 + 1.0),
            ]
        };

        if self.rejects(&tri) {
            return;
        }
        let ink = self.solid_ink(paint);
        self.batch.push_triangle(tri.map(|p| ink.vertex(p)));
    }

    pub fn draw_line(&mut self, p0: Vec2i, p1: Vec2i, paint: Paint) {
        self.draw_line_caps(p0, p1, paint, true, true);
    }

    /// Line with optional end pixels.
    ///
    /// Polylines pass `end_pixel = false` so shared vertices are only drawn once.
    pub fn draw_line_caps(
        &mut self,
        p0: Vec2i,
        p1: Vec2i,
        paint: Paint,
        start_pixel: bool,
        end_pixel: bool,
    ) {
        if p0 == p1 {
            if start_pixel || end_pixel {
                self.draw_pixel(p0, paint);
            }
            return;
        }

        if p0.x == p1.x || p0.y == p1.y {
            let horizontal = p0.y == p1.y;
            let (a, b) = if horizontal { (p0.x, p1.x) } else { (p0.y, p1.y) };
            let step = if b > a { 1 } else { -1 };
            let s = if start_pixel { a } else { a.saturating_add(step) };
            let e = if end_pixel { b } else { b.saturating_sub(step) };
            if (step > 0 && e < s) || (step < 0 && e > s) {
                return;
            }
            let (q0, q1) = if horizontal {
                (Vec2i::new(s, p0.y), Vec2i::new(e, p0.y))
            } else {
                (Vec2i::new(p0.x, s), Vec2i::new(p0.x, e))
            };
            self.draw_ortho_line(q0, q1, paint);
            return;
        }

        if self.begin_primitive(4, 6) {
            let half = Vec2::new(0.5, 0.5);
            let c0 = self.to_target(p0) + half;
            let c1 = self.to_target(p1) + half;
            let off = LineQuadrant::of(c1 - c0).edge_offset();
            let body = [c0 + off, c1 + off, c1 - off, c0 - off];
            self.push_solid_quad(body, paint);
        }

        if start_pixel {
            self.draw_pixel(p0, paint);
        }
        if end_pixel {
            self.draw_pixel(p1, paint);
        }
    }
}
