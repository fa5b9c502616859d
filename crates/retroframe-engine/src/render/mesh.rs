use crate::coords::Vec2;

use super::vertex::Vertex;

/// Pre-built triangle mesh drawn through `Renderer::draw_prepared_mesh`.
///
/// Positions are local to the draw position. Bounds are tracked as quads are added
/// so the renderer can cull the whole mesh without walking its vertices.
#[derive(Debug, Clone, Default)]
pub struct PreparedMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
    min: Vec2,
    max: Vec2,
    textured: bool,
}

impl PreparedMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quad_capacity(quads: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(quads * 4),
            indices: Vec::with_capacity(quads * 6),
            ..Self::default()
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    #[inline]
    pub fn quad_capacity(&self) -> usize {
        self.vertices.capacity() / 4
    }

    /// Local-space bounds `(min, max)`.
    #[inline]
    pub fn bounds(&self) -> (Vec2, Vec2) {
        (self.min, self.max)
    }

    /// True when any vertex samples a sprite sheet or offscreen surface.
    #[inline]
    pub fn is_textured(&self) -> bool {
        self.textured
    }

    /// Empties the mesh, keeping its allocation.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.min = Vec2::zero();
        self.max = Vec2::zero();
        self.textured = false;
    }

    pub fn push_quad(&mut self, quad: [Vertex; 4]) {
        let base = self.vertices.len() as u16;
        if self.vertices.is_empty() {
            let p = quad[0].position();
            self.min = p;
            self.max = p;
        }
        for v in &quad {
            let p = v.position();
            self.min = Vec2::new(self.min.x.min(p.x), self.min.y.min(p.y));
            self.max = Vec2::new(self.max.x.max(p.x), self.max.y.max(p.y));
            self.textured |= v.flags != [0.0, 0.0];
        }
        self.vertices.extend_from_slice(&quad);
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
}
