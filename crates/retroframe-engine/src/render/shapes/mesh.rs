use crate::coords::Vec2i;
use crate::render::backend::GraphicsBackend;
use crate::render::mesh::PreparedMesh;
use crate::render::renderer::Renderer;

impl<B: GraphicsBackend> Renderer<B> {
    /// Appends a pre-built mesh at `pos`, modulated by the current tint and alpha.
    ///
    /// Textured meshes sample the bound sprite source; the mesh is culled as a whole
    /// by its bounds.
    pub fn draw_prepared_mesh(&mut self, mesh: &PreparedMesh, pos: Vec2i) {
        if mesh.is_empty() {
            return;
        }
        if !self.begin_primitive(mesh.vertices.len(), mesh.indices.len()) {
            return;
        }

        let offset = self.to_target(pos);
        let (min, max) = mesh.bounds();
        if self.rejects(&[min + offset, max + offset]) {
            return;
        }

        if mesh.is_textured() && self.textured_ink().is_none() {
            return;
        }

        let modulation = self.state.vertex_modulation();
        self.batch.push_vertices(&mesh.vertices, &mesh.indices, offset, modulation);
    }
}
