use anyhow::{ensure, Result};

use crate::config::HardwareConfig;
use crate::coords::{ClipRect, Color32, Rect, Size};
use crate::render::backend::{
    BatchUniforms, DrawSubmission, FilterMode, GraphicsBackend, ShaderId, SourceBinding, SurfaceId,
    TextureId,
};
use crate::render::batch::bucket_sizes;
use crate::render::vertex::Vertex;

use super::pipeline::{self, SURFACE_FORMAT};

struct GpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: Size,
}

struct GpuSurface {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: Size,
    filter: FilterMode,
}

/// Per-bucket vertex/index buffers, sized like the CPU buckets.
struct BucketBuffers {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
}

/// `GraphicsBackend` on top of a wgpu device.
///
/// Every draw is encoded into its own command buffer and submitted immediately, so
/// backend operations stay ordered with respect to each other (a surface cleared
/// after a draw really is cleared after it).
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,

    textures: Vec<Option<GpuTexture>>,
    surfaces: Vec<Option<GpuSurface>>,
    shaders: Vec<Option<wgpu::RenderPipeline>>,

    buckets: Vec<BucketBuffers>,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline: wgpu::RenderPipeline,
    uniform_ubo: wgpu::Buffer,
    nearest: wgpu::Sampler,
    linear: wgpu::Sampler,
    /// Bound as the source when a draw samples nothing.
    placeholder: wgpu::TextureView,
}

fn texture_desc<'a>(label: &'a str, size: Size, usage: wgpu::TextureUsages) -> wgpu::TextureDescriptor<'a> {
    wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size.width,
            height: size.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: SURFACE_FORMAT,
        usage,
        view_formats: &[],
    }
}

const SURFACE_USAGE: wgpu::TextureUsages = wgpu::TextureUsages::RENDER_ATTACHMENT
    .union(wgpu::TextureUsages::TEXTURE_BINDING)
    .union(wgpu::TextureUsages::COPY_DST)
    .union(wgpu::TextureUsages::COPY_SRC);

const TEXTURE_USAGE: wgpu::TextureUsages =
    wgpu::TextureUsages::TEXTURE_BINDING.union(wgpu::TextureUsages::COPY_DST);

fn to_wgpu_color(c: Color32) -> wgpu::Color {
    wgpu::Color {
        r: c.r as f64 / 255.0,
        g: c.g as f64 / 255.0,
        b: c.b as f64 / 255.0,
        a: c.a as f64 / 255.0,
    }
}

/// Inclusive clip to a scissor `(x, y, w, h)` inside `target`; `None` when nothing
/// remains.
fn clip_to_scissor(clip: ClipRect, target: Size) -> Option<(u32, u32, u32, u32)> {
    let x0 = clip.x0.max(0);
    let y0 = clip.y0.max(0);
    let x1 = clip.x1.min(target.width as i32 - 1);
    let y1 = clip.y1.min(target.height as i32 - 1);
    if x1 < x0 || y1 < y0 {
        return None;
    }
    Some((x0 as u32, y0 as u32, (x1 - x0 + 1) as u32, (y1 - y0 + 1) as u32))
}

impl WgpuBackend {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, config: &HardwareConfig) -> Self {
        let bind_group_layout = pipeline::batch_bind_group_layout(device);
        let batch_pipeline = pipeline::batch_pipeline(
            device,
            "retroframe batch pipeline",
            pipeline::BATCH_SHADER,
            &bind_group_layout,
        );

        let buckets = bucket_sizes(config.min_bucket_quads as usize, config.max_batch_quads as usize)
            .into_iter()
            .map(|quads| BucketBuffers {
                vertices: device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("retroframe batch vbo"),
                    size: (quads * 4 * std::mem::size_of::<Vertex>()) as u64,
                    usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                }),
                indices: device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("retroframe batch ibo"),
                    size: (quads * 6 * std::mem::size_of::<u16>()) as u64,
                    usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                }),
            })
            .collect::<Vec<_>>();

        let uniform_ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("retroframe batch ubo"),
            size: std::mem::size_of::<BatchUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let placeholder = device
            .create_texture(&texture_desc("retroframe placeholder", Size::new(1, 1), TEXTURE_USAGE))
            .create_view(&wgpu::TextureViewDescriptor::default());

        log::info!("wgpu backend: {} batch buckets", buckets.len());

        Self {
            device: device.clone(),
            queue: queue.clone(),
            textures: Vec::new(),
            surfaces: Vec::new(),
            shaders: Vec::new(),
            buckets,
            bind_group_layout,
            pipeline: batch_pipeline,
            uniform_ubo,
            nearest: pipeline::sampler(device, "retroframe nearest sampler", wgpu::FilterMode::Nearest),
            linear: pipeline::sampler(device, "retroframe linear sampler", wgpu::FilterMode::Linear),
            placeholder,
        }
    }

    #[inline]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[inline]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// View of `surface`, for compositing.
    pub fn surface_view(&self, surface: SurfaceId) -> Option<&wgpu::TextureView> {
        self.surface(surface).map(|s| &s.view)
    }

    pub(crate) fn sampler_for(&self, filter: FilterMode) -> &wgpu::Sampler {
        match filter {
            FilterMode::Point => &self.nearest,
            FilterMode::Linear => &self.linear,
        }
    }

    fn texture(&self, id: TextureId) -> Option<&GpuTexture> {
        self.textures.get((id.0 as usize).wrapping_sub(1))?.as_ref()
    }

    fn surface(&self, id: SurfaceId) -> Option<&GpuSurface> {
        self.surfaces.get((id.0 as usize).wrapping_sub(1))?.as_ref()
    }

    fn surface_mut(&mut self, id: SurfaceId) -> Option<&mut GpuSurface> {
        self.surfaces.get_mut((id.0 as usize).wrapping_sub(1))?.as_mut()
    }

    fn check_size(&self, label: &str, size: Size) -> Result<()> {
        let max = self.device.limits().max_texture_dimension_2d;
        ensure!(!size.is_empty(), "{label}: empty size");
        ensure!(
            size.width <= max && size.height <= max,
            "{label}: {}x{} exceeds device limit {max}",
            size.width,
            size.height
        );
        Ok(())
    }

    fn upload(&self, texture: &wgpu::Texture, region: Rect, rgba: &[u8]) {
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: region.x as u32,
                    y: region.y as u32,
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(region.width as u32 * 4),
                rows_per_image: Some(region.height as u32),
            },
            wgpu::Extent3d {
                width: region.width as u32,
                height: region.height as u32,
                depth_or_array_layers: 1,
            },
        );
    }

    fn clear_view(&self, view: &wgpu::TextureView, color: Color32) {
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("retroframe clear encoder"),
        });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("retroframe clear pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(to_wgpu_color(color)),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }
        self.queue.submit(Some(encoder.finish()));
    }

    fn source_view(&self, source: SourceBinding) -> (&wgpu::TextureView, &wgpu::Sampler) {
        match source {
            SourceBinding::Texture(id) => match self.texture(id) {
                Some(t) => (&t.view, &self.nearest),
                None => (&self.placeholder, &self.nearest),
            },
            SourceBinding::Surface(id) => match self.surface(id) {
                Some(s) => (&s.view, self.sampler_for(s.filter)),
                None => (&self.placeholder, &self.nearest),
            },
            SourceBinding::None => (&self.placeholder, &self.nearest),
        }
    }
}

impl GraphicsBackend for WgpuBackend {
    fn create_texture(&mut self, label: &str, size: Size, rgba: &[u8]) -> Result<TextureId> {
        self.check_size(label, size)?;
        ensure!(
            rgba.len() == size.area() * 4,
            "{label}: expected {} bytes, got {}",
            size.area() * 4,
            rgba.len()
        );

        let texture = self.device.create_texture(&texture_desc(label, size, TEXTURE_USAGE));
        self.upload(&texture, Rect::from_size(size), rgba);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        self.textures.push(Some(GpuTexture { texture, view, size }));
        log::debug!("texture {label}: {}x{}", size.width, size.height);
        Ok(TextureId(self.textures.len() as u32))
    }

    fn write_texture(&mut self, id: TextureId, region: Rect, rgba: &[u8]) {
        let Some(t) = self.texture(id) else {
            log::warn!("write_texture: unknown {id:?}");
            return;
        };
        let fits = region.x >= 0
            && region.y >= 0
            && region.right() <= t.size.width as i32
            && region.bottom() <= t.size.height as i32
            && rgba.len() == region.width.max(0) as usize * region.height.max(0) as usize * 4;
        if !fits || region.is_empty() {
            log::warn!("write_texture: region {region:?} rejected for {id:?}");
            return;
        }
        self.upload(&t.texture, region, rgba);
    }

    fn destroy_texture(&mut self, id: TextureId) {
        let slot = self.textures.get_mut((id.0 as usize).wrapping_sub(1));
        if let Some(t) = slot.and_then(Option::take) {
            t.texture.destroy();
        }
    }

    fn create_surface(&mut self, label: &str, size: Size) -> Result<SurfaceId> {
        self.check_size(label, size)?;
        let texture = self.device.create_texture(&texture_desc(label, size, SURFACE_USAGE));
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.clear_view(&view, Color32::TRANSPARENT);

        self.surfaces.push(Some(GpuSurface {
            texture,
            view,
            size,
            filter: FilterMode::Point,
        }));
        log::debug!("surface {label}: {}x{}", size.width, size.height);
        Ok(SurfaceId(self.surfaces.len() as u32))
    }

    fn resize_surface(&mut self, id: SurfaceId, size: Size) {
        if self.check_size("surface resize", size).is_err() {
            log::warn!("resize_surface: invalid size {size:?}");
            return;
        }
        let device = self.device.clone();
        let Some(s) = self.surface_mut(id) else {
            log::warn!("resize_surface: unknown {id:?}");
            return;
        };
        if s.size == size {
            return;
        }
        s.texture.destroy();
        s.texture = device.create_texture(&texture_desc("retroframe surface", size, SURFACE_USAGE));
        s.view = s.texture.create_view(&wgpu::TextureViewDescriptor::default());
        s.size = size;
    }

    fn clear_surface(&mut self, id: SurfaceId, color: Color32) {
        match self.surface(id) {
            Some(s) => self.clear_view(&s.view, color),
            None => log::warn!("clear_surface: unknown {id:?}"),
        }
    }

    fn set_surface_filter(&mut self, id: SurfaceId, filter: FilterMode) {
        if let Some(s) = self.surface_mut(id) {
            s.filter = filter;
        }
    }

    fn load_shader(&mut self, label: &str, source: &str) -> Result<ShaderId> {
        ensure!(
            pipeline::has_entry_points(source),
            "shader {label}: missing vs_main/fs_main"
        );
        let pipeline = pipeline::batch_pipeline(&self.device, label, source, &self.bind_group_layout);
        self.shaders.push(Some(pipeline));
        log::info!("shader {label} loaded");
        Ok(ShaderId(self.shaders.len() as u32))
    }

    fn draw(&mut self, s: &DrawSubmission<'_>) {
        let Some(target) = self.surface(s.target) else {
            log::error!("draw: unknown target {:?}", s.target);
            return;
        };
        let Some(system) = self.texture(s.system_texture) else {
            log::error!("draw: missing system texture");
            return;
        };
        let Some(bucket) = self.buckets.get(s.bucket) else {
            log::error!("draw: bucket {} out of range", s.bucket);
            return;
        };
        let Some(scissor) = clip_to_scissor(s.clip, target.size) else {
            return;
        };
        let pipeline = match s.shader {
            Some(id) => match self.shaders.get((id.0 as usize).wrapping_sub(1)).and_then(Option::as_ref) {
                Some(p) => p,
                None => {
                    log::warn!("draw: unknown {id:?}, using the default shader");
                    &self.pipeline
                }
            },
            None => &self.pipeline,
        };

        // Index uploads must be 4-byte aligned.
        let index_upload = (s.index_count + 1) & !1;
        self.queue
            .write_buffer(&bucket.vertices, 0, bytemuck::cast_slice(&s.vertices[..s.vertex_count]));
        self.queue
            .write_buffer(&bucket.indices, 0, bytemuck::cast_slice(&s.indices[..index_upload]));
        self.queue.write_buffer(&self.uniform_ubo, 0, bytemuck::bytes_of(&s.uniforms));

        let (source_view, source_sampler) = self.source_view(s.source);
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("retroframe batch bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_ubo.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&system.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(source_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&self.nearest),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(source_sampler),
                },
            ],
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("retroframe batch encoder"),
        });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("retroframe batch pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            let (sx, sy, sw, sh) = scissor;
            rpass.set_pipeline(pipeline);
            rpass.set_bind_group(0, &bind_group, &[]);
            rpass.set_vertex_buffer(0, bucket.vertices.slice(..));
            rpass.set_index_buffer(bucket.indices.slice(..), wgpu::IndexFormat::Uint16);
            rpass.set_scissor_rect(sx, sy, sw, sh);
            rpass.draw_indexed(0..s.index_count as u32, 0, 0..1);
        }
        self.queue.submit(Some(encoder.finish()));
    }
}
