use crate::coords::{Color32, Vec2};

use super::vertex::Vertex;

/// One fixed-capacity vertex/index array.
#[derive(Debug)]
struct Bucket {
    quads: usize,
    vertices: Vec<Vertex>,
    indices: Vec<u16>,
    /// Upper bound of indices that may hold stale data; everything past the current
    /// count up to this mark is zeroed on upload so stale triangles degenerate.
    index_high_water: usize,
}

impl Bucket {
    fn new(quads: usize) -> Self {
        Self {
            quads,
            vertices: vec![Vertex::default(); quads * 4],
            indices: vec![0; quads * 6],
            index_high_water: 0,
        }
    }

    #[inline]
    fn max_vertices(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    fn max_indices(&self) -> usize {
        self.indices.len()
    }

    fn zero_stale_tail(&mut self, index_count: usize) {
        if self.index_high_water > index_count {
            self.indices[index_count..self.index_high_water].fill(0);
        }
        self.index_high_water = index_count;
    }
}

/// Batch contents reduced to the smallest bucket that fits.
///
/// `vertices`/`indices` span the whole bucket; entries past the counts are
/// degenerate.
#[derive(Debug)]
pub struct BatchView<'a> {
    pub bucket: usize,
    pub vertices: &'a [Vertex],
    pub indices: &'a [u16],
    pub vertex_count: usize,
    pub index_count: usize,
}

/// Bucket capacities in quads: `min_quads` doubling up to `max_quads`.
///
/// GPU backends size their per-bucket buffers from the same list.
pub fn bucket_sizes(min_quads: usize, max_quads: usize) -> Vec<usize> {
    let max_quads = max_quads.max(1);
    let mut quads = min_quads.clamp(1, max_quads);
    let mut out = Vec::new();
    loop {
        out.push(quads);
        if quads >= max_quads {
            break;
        }
        quads = (quads * 2).min(max_quads);
    }
    out
}

/// Pool of vertex/index buckets at power-of-two quad counts.
///
/// Writes always go into the largest bucket. `reduce` copies the batch into the
/// smallest bucket that fits (or hands out the largest one directly), which bounds
/// the upload size to actual usage. Buckets are allocated once and never resized.
#[derive(Debug)]
pub struct VertexBatch {
    buckets: Vec<Bucket>,
    current_vertex: usize,
    current_index: usize,
}

impl VertexBatch {
    pub fn new(min_quads: usize, max_quads: usize) -> Self {
        let buckets: Vec<Bucket> = bucket_sizes(min_quads, max_quads)
            .into_iter()
            .map(Bucket::new)
            .collect();

        log::debug!(
            "vertex batch: {} buckets, {}..={} quads",
            buckets.len(),
            min_quads,
            max_quads
        );

        Self {
            buckets,
            current_vertex: 0,
            current_index: 0,
        }
    }

    #[inline]
    fn largest(&self) -> &Bucket {
        &self.buckets[self.buckets.len() - 1]
    }

    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Capacity of bucket `i` in quads.
    #[inline]
    pub fn bucket_quads(&self, i: usize) -> usize {
        self.buckets[i].quads
    }

    #[inline]
    pub fn max_vertices(&self) -> usize {
        self.largest().max_vertices()
    }

    #[inline]
    pub fn max_indices(&self) -> usize {
        self.largest().max_indices()
    }

    #[inline]
    pub fn current_vertex(&self) -> usize {
        self.current_vertex
    }

    #[inline]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.current_vertex == 0 && self.current_index == 0
    }

    #[inline]
    pub fn remaining_vertices(&self) -> usize {
        self.max_vertices() - self.current_vertex
    }

    #[inline]
    pub fn remaining_indices(&self) -> usize {
        self.max_indices() - self.current_index
    }

    /// Vertices written since the last flush.
    #[inline]
    pub fn live_vertices(&self) -> &[Vertex] {
        &self.largest().vertices[..self.current_vertex]
    }

    #[inline]
    pub fn live_indices(&self) -> &[u16] {
        &self.largest().indices[..self.current_index]
    }

    #[inline]
    pub fn has_room(&self, vertices: usize, indices: usize) -> bool {
        vertices <= self.remaining_vertices() && indices <= self.remaining_indices()
    }

    /// Appends a quad as two triangles `(0, 1, 2)` and `(0, 2, 3)`.
    pub fn push_quad(&mut self, quad: [Vertex; 4]) -> bool {
        self.push_vertices(&quad, &[0, 1, 2, 0, 2, 3], Vec2::zero(), Color32::WHITE)
    }

    pub fn push_triangle(&mut self, tri: [Vertex; 3]) -> bool {
        self.push_vertices(&tri, &[0, 1, 2], Vec2::zero(), Color32::WHITE)
    }

    /// Appends a mesh. `indices` are local to `vertices`; positions are translated by
    /// `offset` and colors multiplied by `color` (`WHITE` leaves them untouched).
    ///
    /// Returns `false` without writing anything if the batch lacks room; callers are
    /// expected to have flushed first.
    pub fn push_vertices(
        &mut self,
        vertices: &[Vertex],
        indices: &[u16],
        offset: Vec2,
        color: Color32,
    ) -> bool {
        if !self.has_room(vertices.len(), indices.len()) {
            log::error!(
                "vertex batch overflow: {} verts / {} indices requested, {} / {} left",
                vertices.len(),
                indices.len(),
                self.remaining_vertices(),
                self.remaining_indices()
            );
            return false;
        }

        let base = self.current_vertex;
        let index_base = self.current_index;
        let last = self.buckets.len() - 1;
        let bucket = &mut self.buckets[last];

        let tint = color != Color32::WHITE;
        for (dst, src) in bucket.vertices[base..base + vertices.len()].iter_mut().zip(vertices) {
            let mut v = *src;
            v.pos[0] += offset.x;
            v.pos[1] += offset.y;
            if tint {
                let c = Color32::new(v.color[0], v.color[1], v.color[2], v.color[3]);
                v.color = c.modulate(color).to_array();
            }
            *dst = v;
        }

        for (dst, &i) in bucket.indices[index_base..index_base + indices.len()]
            .iter_mut()
            .zip(indices)
        {
            *dst = (base + i as usize) as u16;
        }
        bucket.index_high_water = bucket.index_high_water.max(index_base + indices.len());

        self.current_vertex += vertices.len();
        self.current_index += indices.len();
        true
    }

    /// Index of the smallest bucket holding the current contents.
    pub fn fit_bucket(&self) -> usize {
        self.buckets
            .iter()
            .position(|b| {
                b.max_vertices() >= self.current_vertex && b.max_indices() >= self.current_index
            })
            .unwrap_or(self.buckets.len() - 1)
    }

    /// Moves the batch into the smallest bucket that fits and returns a view of it.
    pub fn reduce(&mut self) -> BatchView<'_> {
        let target = self.fit_bucket();
        let last = self.buckets.len() - 1;
        let (vc, ic) = (self.current_vertex, self.current_index);

        if target != last {
            let (head, tail) = self.buckets.split_at_mut(last);
            let src = &tail[0];
            let dst = &mut head[target];
            dst.vertices[..vc].copy_from_slice(&src.vertices[..vc]);
            dst.indices[..ic].copy_from_slice(&src.indices[..ic]);
        }

        let bucket = &mut self.buckets[target];
        bucket.zero_stale_tail(ic);

        BatchView {
            bucket: target,
            vertices: &bucket.vertices,
            indices: &bucket.indices,
            vertex_count: vc,
            index_count: ic,
        }
    }

    /// Resets the cursors. Bucket storage is kept.
    #[inline]
    pub fn clear(&mut self) {
        self.current_vertex = 0;
        self.current_index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> [Vertex; 4] {
        [Vertex::default(); 4]
    }

    // ── allocation ────────────────────────────────────────────────────────

    #[test]
    fn buckets_double_from_min_to_max() {
        let b = VertexBatch::new(4, 512);
        let sizes: Vec<usize> = (0..b.bucket_count()).map(|i| b.bucket_quads(i)).collect();
        assert_eq!(sizes, vec![4, 8, 16, 32, 64, 128, 256, 512]);
        assert_eq!(b.max_vertices(), 2048);
    }

    // ── cursors ───────────────────────────────────────────────────────────

    #[test]
    fn push_quad_advances_cursors() {
        let mut b = VertexBatch::new(4, 16);
        assert!(b.push_quad(quad()));
        assert_eq!((b.current_vertex(), b.current_index()), (4, 6));
        assert!(b.push_triangle([Vertex::default(); 3]));
        assert_eq!((b.current_vertex(), b.current_index()), (7, 9));
    }

    #[test]
    fn indices_are_rebased() {
        let mut b = VertexBatch::new(4, 16);
        b.push_quad(quad());
        b.push_quad(quad());
        let view = b.reduce();
        assert_eq!(&view.indices[6..12], &[4, 5, 6, 4, 6, 7]);
    }

    #[test]
    fn overflow_is_refused() {
        let mut b = VertexBatch::new(1, 2);
        assert!(b.push_quad(quad()));
        assert!(b.push_quad(quad()));
        assert!(!b.push_quad(quad()));
        assert_eq!(b.current_vertex(), 8);
    }

    #[test]
    fn clear_resets_cursors() {
        let mut b = VertexBatch::new(4, 16);
        b.push_quad(quad());
        b.clear();
        assert!(b.is_empty());
        assert_eq!(b.remaining_vertices(), 64);
    }

    // ── reduce ────────────────────────────────────────────────────────────

    #[test]
    fn reduce_picks_smallest_fitting_bucket() {
        let mut b = VertexBatch::new(4, 64);
        for _ in 0..5 {
            b.push_quad(quad());
        }
        let view = b.reduce();
        assert_eq!(view.bucket, 1); // 8 quads
        assert_eq!(view.vertices.len(), 32);
        assert_eq!(view.index_count, 30);
    }

    #[test]
    fn reduce_references_largest_when_full() {
        let mut b = VertexBatch::new(4, 8);
        for _ in 0..8 {
            b.push_quad(quad());
        }
        assert_eq!(b.reduce().bucket, 1);
    }

    #[test]
    fn reduce_zeroes_stale_index_tail() {
        let mut b = VertexBatch::new(8, 8);
        for _ in 0..3 {
            b.push_quad(quad());
        }
        b.reduce();
        b.clear();
        b.push_quad(quad());
        let view = b.reduce();
        assert_eq!(view.index_count, 6);
        assert!(view.indices[6..18].iter().all(|&i| i == 0));
    }

    #[test]
    fn fan_bound_by_indices_picks_larger_bucket() {
        let mut b = VertexBatch::new(4, 64);
        // 10 vertices but 30 indices: 16 vertices fit bucket 0 but 24 indices do not.
        let verts = [Vertex::default(); 10];
        let idx: Vec<u16> = (0..30).map(|i| (i % 10) as u16).collect();
        b.push_vertices(&verts, &idx, Vec2::zero(), Color32::WHITE);
        assert_eq!(b.fit_bucket(), 1);
    }

    #[test]
    fn push_vertices_applies_offset_and_color() {
        let mut b = VertexBatch::new(4, 4);
        let mut v = Vertex::default();
        v.pos = [1.0, 2.0, 0.0];
        v.color = [255, 255, 255, 255];
        b.push_vertices(&[v], &[0], Vec2::new(10.0, 20.0), Color32::new(255, 255, 255, 128));
        let view = b.reduce();
        assert_eq!(view.vertices[0].pos, [11.0, 22.0, 0.0]);
        assert_eq!(view.vertices[0].color[3], 128);
    }
}
