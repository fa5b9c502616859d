use crate::coords::{Rect, Size, Vec2i};
use crate::paint::Paint;
use crate::render::{GraphicsBackend, Renderer};

use super::params::{EffectKind, EffectParams};

/// Pinhole radius for `intensity` in `[0, 1]`: 0 leaves the screen open, 1 closes it.
fn pinhole_radius(display: Size, intensity: f32) -> i32 {
    let half_diagonal =
        ((display.width as f32).hypot(display.height as f32) * 0.5).ceil();
    ((1.0 - intensity.clamp(0.0, 1.0)) * half_diagonal).round() as i32
}

fn pinhole_center(display: Size, params: &EffectParams, kind: EffectKind) -> Vec2i {
    let v = params.get(kind).vector;
    Vec2i::new(
        (display.width / 2) as i32 + v.x.round() as i32,
        (display.height / 2) as i32 + v.y.round() as i32,
    )
}

/// Draws the geometry-based effects of `params` onto the current target.
///
/// Expects default draw state (no camera, full clip) on the front buffer.
pub fn draw_render_time<B: GraphicsBackend>(
    renderer: &mut Renderer<B>,
    params: &EffectParams,
    display: Size,
) {
    let pinhole = params.get(EffectKind::Pinhole);
    if pinhole.intensity > 0.0 {
        let paint = Paint::Rgb(pinhole.color);
        let r = pinhole_radius(display, pinhole.intensity);
        let c = pinhole_center(display, params, EffectKind::Pinhole);
        if r <= 0 {
            renderer.draw_rect_fill(Rect::from_size(display), paint);
        } else {
            renderer.draw_ellipse_inverted_fill(c, Vec2i::new(r, r), paint);
            draw_bands(renderer, Rect::new(c.x - r, c.y - r, 2 * r + 1, 2 * r + 1), display, paint);
        }
    }

    let inverted = params.get(EffectKind::InvertedPinhole);
    if inverted.intensity > 0.0 {
        let paint = Paint::Rgb(inverted.color);
        // Grows from nothing to covering the screen.
        let r = pinhole_radius(display, 1.0 - inverted.intensity);
        let c = pinhole_center(display, params, EffectKind::InvertedPinhole);
        if r > 0 {
            renderer.draw_ellipse_fill(c, Vec2i::new(r, r), paint);
        }
    }
}

/// Covers the display outside `hole` with four bands.
fn draw_bands<B: GraphicsBackend>(renderer: &mut Renderer<B>, hole: Rect, display: Size, paint: Paint) {
    let (w, h) = (display.width as i32, display.height as i32);
    renderer.draw_rect_fill(Rect::new(0, 0, w, hole.y), paint);
    renderer.draw_rect_fill(Rect::new(0, hole.bottom(), w, h - hole.bottom()), paint);
    renderer.draw_rect_fill(Rect::new(0, hole.y, hole.x, hole.height), paint);
    renderer.draw_rect_fill(Rect::new(hole.right(), hole.y, w - hole.right(), hole.height), paint);
}
