use std::f32::consts::TAU;

use crate::coords::{Color32, Rect, Vec2, Vec2i};
use crate::paint::Paint;
use crate::render::backend::GraphicsBackend;
use crate::render::renderer::Renderer;
use crate::render::vertex::Vertex;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum EllipseMode {
    Outline,
    Fill,
    InvertedFill,
}

/// Per-row half widths of an ellipse, index `|dy|` for `dy` in `0..=ry`.
///
/// A pixel `(dx, dy)` is inside when its center lies within the ellipse of radii
/// `(rx + 0.5, ry + 0.5)`. The test is done in integers scaled by 4:
/// `4dx²(2ry+1)² + 4dy²(2rx+1)² <= (2rx+1)²(2ry+1)²`.
fn half_widths(rx: i64, ry: i64) -> Vec<i32> {
    let a = (2 * rx + 1) * (2 * rx + 1);
    let b = (2 * ry + 1) * (2 * ry + 1);
    let limit = a * b;

    let mut out = Vec::with_capacity(ry as usize + 1);
    let mut dx = rx;
    for dy in 0..=ry {
        while dx > 0 && 4 * dx * dx * b + 4 * dy * dy * a > limit {
            dx -= 1;
        }
        out.push(dx as i32);
    }
    out
}

/// Row `cy + dy` and its mirror; the center row once.
fn mirrored_rows(cy: i32, dy: i32) -> impl Iterator<Item = i32> {
    let n = if dy == 0 { 1 } else { 2 };
    [cy + dy, cy - dy].into_iter().take(n)
}

/// Rim point count for the polygon path, a multiple of 4 so quarter fans split evenly.
fn polygon_points(max_radius: u32, cap: usize) -> usize {
    let n = ((max_radius as f32).sqrt().floor() as usize * 4).max(8);
    (n.min(cap) / 4 * 4).max(4)
}

impl<B: GraphicsBackend> Renderer<B> {
    pub fn draw_ellipse(&mut self, center: Vec2i, radius: Vec2i, paint: Paint) {
        self.ellipse(center, radius, paint, EllipseMode::Outline);
    }

    pub fn draw_ellipse_fill(&mut self, center: Vec2i, radius: Vec2i, paint: Paint) {
        self.ellipse(center, radius, paint, EllipseMode::Fill);
    }

    /// Fills the ellipse's bounding rectangle except the ellipse itself.
    pub fn draw_ellipse_inverted_fill(&mut self, center: Vec2i, radius: Vec2i, paint: Paint) {
        self.ellipse(center, radius, paint, EllipseMode::InvertedFill);
    }

    fn ellipse(&mut self, center: Vec2i, radius: Vec2i, paint: Paint, mode: EllipseMode) {
        if !self.render_enabled {
            return;
        }
        let (rx, ry) = (radius.x.unsigned_abs(), radius.y.unsigned_abs());
        if rx.max(ry) < self.config.ellipse_slow_radius {
            self.ellipse_spans(center, rx as i32, ry as i32, paint, mode);
        } else {
            self.ellipse_polygon(center, rx, ry, paint, mode);
        }
    }

    // ── midpoint spans ──────────────────────────────────────────────────────

    fn ellipse_spans(&mut self, c: Vec2i, rx: i32, ry: i32, paint: Paint, mode: EllipseMode) {
        let hw = half_widths(rx as i64, ry as i64);

        match mode {
            EllipseMode::Fill => {
                // Rows with equal half width merge into one rect per half.
                let mut dy = 0usize;
                while dy <= ry as usize {
                    let w = hw[dy];
                    let mut end = dy;
                    while end < ry as usize && hw[end + 1] == w {
                        end += 1;
                    }
                    let (top, bottom) = (dy as i32, end as i32);
                    let height = bottom - top + 1;
                    let width = 2 * w + 1;
                    if top == 0 {
                        self.draw_rect_fill(
                            Rect::new(c.x - w, c.y - bottom, width, 2 * bottom + 1),
                            paint,
                        );
                    } else {
                        self.draw_rect_fill(Rect::new(c.x - w, c.y + top, width, height), paint);
                        self.draw_rect_fill(Rect::new(c.x - w, c.y - bottom, width, height), paint);
                    }
                    dy = end + 1;
                }
            }
            EllipseMode::Outline => {
                for dy in 0..=ry as usize {
                    let w = hw[dy];
                    let inner = if dy == ry as usize { -1 } else { hw[dy + 1] };
                    let from = (inner + 1).min(w);
                    for y in mirrored_rows(c.y, dy as i32) {
                        if from <= 0 {
                            self.draw_rect_fill(Rect::new(c.x - w, y, 2 * w + 1, 1), paint);
                        } else {
                            let len = w - from + 1;
                            self.draw_rect_fill(Rect::new(c.x + from, y, len, 1), paint);
                            self.draw_rect_fill(Rect::new(c.x - w, y, len, 1), paint);
                        }
                    }
                }
            }
            EllipseMode::InvertedFill => {
                for dy in 0..=ry as usize {
                    let gap = rx - hw[dy];
                    if gap == 0 {
                        continue;
                    }
                    for y in mirrored_rows(c.y, dy as i32) {
                        self.draw_rect_fill(Rect::new(c.x - rx, y, gap, 1), paint);
                        self.draw_rect_fill(Rect::new(c.x + hw[dy] + 1, y, gap, 1), paint);
                    }
                }
            }
        }
    }

    // ── polygon ─────────────────────────────────────────────────────────────

    fn ellipse_polygon(&mut self, c: Vec2i, rx: u32, ry: u32, paint: Paint, mode: EllipseMode) {
        let n = polygon_points(rx.max(ry), self.config.max_polygon_points);
        let radii = Vec2::new(rx as f32 + 0.5, ry as f32 + 0.5);
        let rim = |center: Vec2, i: usize| {
            let (s, co) = (TAU * i as f32 / n as f32).sin_cos();
            Vec2::new(center.x + co * radii.x, center.y + s * radii.y)
        };

        match mode {
            EllipseMode::Outline => {
                let world_center = c.to_f32() + Vec2::new(0.5, 0.5);
                let points: Vec<Vec2i> = (0..n)
                    .map(|i| {
                        let p = rim(world_center, i);
                        Vec2i::new(p.x.floor() as i32, p.y.floor() as i32)
                    })
                    .collect();
                for i in 0..n {
                    self.draw_line_caps(points[i], points[(i + 1) % n], paint, true, false);
                }
            }
            EllipseMode::Fill => {
                if !self.begin_primitive(n + 1, 3 * n) {
                    return;
                }
                let center = self.to_target(c) + Vec2::new(0.5, 0.5);
                let bounds = [center - radii, center + radii];
                if self.rejects(&bounds) {
                    return;
                }
                let ink = self.solid_ink(paint);
                let mut vertices = Vec::with_capacity(n + 1);
                vertices.push(ink.vertex(center));
                vertices.extend((0..n).map(|i| ink.vertex(rim(center, i))));
                let indices: Vec<u16> = (0..n)
                    .flat_map(|i| [0, i as u16 + 1, ((i + 1) % n) as u16 + 1])
                    .collect();
                self.push_mesh(&vertices, &indices);
            }
            EllipseMode::InvertedFill => {
                let quarter = n / 4;
                for k in 0..4 {
                    if !self.begin_primitive(quarter + 2, 3 * quarter) {
                        return;
                    }
                    let center = self.to_target(c) + Vec2::new(0.5, 0.5);
                    // Quarter k spans angles k*90..(k+1)*90, clockwise from +X in Y-down space.
                    let corner = match k {
                        0 => center + radii,
                        1 => Vec2::new(center.x - radii.x, center.y + radii.y),
                        2 => center - radii,
                        _ => Vec2::new(center.x + radii.x, center.y - radii.y),
                    };
                    let arc: Vec<Vec2> =
                        (k * quarter..=(k + 1) * quarter).map(|i| rim(center, i)).collect();
                    let mut bounds = arc.clone();
                    bounds.push(corner);
                    if self.rejects(&bounds) {
                        continue;
                    }
                    let ink = self.solid_ink(paint);
                    let mut vertices = Vec::with_capacity(arc.len() + 1);
                    vertices.push(ink.vertex(corner));
                    vertices.extend(arc.iter().map(|&p| ink.vertex(p)));
                    let indices: Vec<u16> = (0..quarter as u16)
                        .flat_map(|j| [0, j + 1, j + 2])
                        .collect();
                    self.push_mesh(&vertices, &indices);
                }
            }
        }
    }

    /// Appends pre-colored vertices. Room must already be reserved.
    pub(in crate::render) fn push_mesh(&mut self, vertices: &[Vertex], indices: &[u16]) {
        self.batch.push_vertices(vertices, indices, Vec2::zero(), Color32::WHITE);
    }
}
