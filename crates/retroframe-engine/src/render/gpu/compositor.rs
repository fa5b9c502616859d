use anyhow::{ensure, Result};
use bytemuck::{Pod, Zeroable};

use crate::coords::Size;
use crate::effects::{EffectKind, FrontBuffer};

use super::backend::WgpuBackend;
use super::pipeline;

pub(crate) const PRESENT_SHADER: &str = include_str!("shaders/present.wgsl");

/// Uniform block of the present shader.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct PresentUniforms {
    /// Display width, display height, frame seed, layer index.
    header: [f32; 4],
    params: [[f32; 4]; EffectKind::COUNT * 2],
}

/// Destination rectangle `(x, y, w, h)` of the display inside `output`.
///
/// Integer scale when the output is at least display-sized, otherwise the largest
/// fractional scale that fits. Centered with black bars.
pub fn letterbox(display: Size, output: Size) -> (f32, f32, f32, f32) {
    if display.is_empty() || output.is_empty() {
        return (0.0, 0.0, output.width as f32, output.height as f32);
    }
    let sx = output.width as f32 / display.width as f32;
    let sy = output.height as f32 / display.height as f32;
    let fit = sx.min(sy);
    let scale = if fit >= 1.0 { fit.floor() } else { fit };

    let w = display.width as f32 * scale;
    let h = display.height as f32 * scale;
    let x = ((output.width as f32 - w) * 0.5).floor();
    let y = ((output.height as f32 - h) * 0.5).floor();
    (x, y, w, h)
}

/// Draws the frame's front buffers onto the swapchain, bottom first.
///
/// Each buffer is drawn with the present shader (or the custom present shader its
/// captured params select) and its own copy of the effect parameters.
#[derive(Default)]
pub struct Compositor {
    format: Option<wgpu::TextureFormat>,
    bind_group_layout: Option<wgpu::BindGroupLayout>,
    pipeline: Option<wgpu::RenderPipeline>,

    /// `(label, source)` per present shader slot, rebuilt when the format changes.
    custom_sources: Vec<Option<(String, String)>>,
    custom: Vec<Option<wgpu::RenderPipeline>>,

    layer_ubos: Vec<wgpu::Buffer>,
    frame: u32,
}

impl Compositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a custom present shader for `slot`. Layers whose params select
    /// `slot` use it instead of the built-in one.
    pub fn load_present_shader(&mut self, slot: usize, label: &str, source: &str) -> Result<()> {
        ensure!(
            pipeline::has_entry_points(source),
            "present shader {label}: missing vs_main/fs_main"
        );
        if self.custom_sources.len() <= slot {
            self.custom_sources.resize(slot + 1, None);
        }
        self.custom_sources[slot] = Some((label.to_string(), source.to_string()));
        // Rebuilt lazily on the next present.
        self.format = None;
        log::info!("present shader {label} registered in slot {slot}");
        Ok(())
    }

    fn ensure_pipelines(&mut self, device: &wgpu::Device, format: wgpu::TextureFormat) {
        if self.format == Some(format) && self.pipeline.is_some() {
            return;
        }

        let bgl = pipeline::present_bind_group_layout(
            device,
            std::mem::size_of::<PresentUniforms>() as u64,
        );
        let build = |label: &str, source: &str| {
            pipeline::build_pipeline(device, label, source, &bgl, &[], format)
        };

        self.pipeline = Some(build("retroframe present pipeline", PRESENT_SHADER));
        self.custom = self
            .custom_sources
            .iter()
            .map(|entry| entry.as_ref().map(|(label, source)| build(label, source)))
            .collect();

        log::debug!("compositor pipelines built for {format:?}");
        self.bind_group_layout = Some(bgl);
        self.format = Some(format);
    }

    fn ensure_layer_ubos(&mut self, device: &wgpu::Device, count: usize) {
        while self.layer_ubos.len() < count {
            self.layer_ubos.push(device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("retroframe present ubo"),
                size: std::mem::size_of::<PresentUniforms>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
        }
    }

    /// Records the composite pass into `encoder`, clearing `view` to black first.
    #[allow(clippy::too_many_arguments)]
    pub fn present(
        &mut self,
        backend: &WgpuBackend,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        format: wgpu::TextureFormat,
        output: Size,
        display: Size,
        layers: &[FrontBuffer],
    ) {
        let device = backend.device();
        self.ensure_pipelines(device, format);
        self.ensure_layer_ubos(device, layers.len());
        self.frame = self.frame.wrapping_add(1);

        let Some(bgl) = self.bind_group_layout.as_ref() else { return };
        let Some(default_pipeline) = self.pipeline.as_ref() else { return };

        let mut draws = Vec::with_capacity(layers.len());
        for (i, layer) in layers.iter().enumerate() {
            let Some(layer_view) = backend.surface_view(layer.surface) else {
                log::error!("present: front buffer {i} has no surface");
                continue;
            };

            let uniforms = PresentUniforms {
                header: [
                    display.width as f32,
                    display.height as f32,
                    (self.frame % 4096) as f32,
                    i as f32,
                ],
                params: layer.params.to_uniform_array(),
            };
            backend
                .queue()
                .write_buffer(&self.layer_ubos[i], 0, bytemuck::bytes_of(&uniforms));

            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("retroframe present bind group"),
                layout: bgl,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: self.layer_ubos[i].as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(layer_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(
                            backend.sampler_for(layer.params.filter),
                        ),
                    },
                ],
            });

            let pipeline = layer
                .params
                .shader
                .and_then(|slot| self.custom.get(slot).and_then(Option::as_ref))
                .unwrap_or(default_pipeline);
            draws.push((pipeline, bind_group));
        }

        let (x, y, w, h) = letterbox(display, output);

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("retroframe present pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        if w <= 0.0 || h <= 0.0 {
            return;
        }
        rpass.set_viewport(x, y, w, h, 0.0, 1.0);

        for (pipeline, bind_group) in &draws {
            rpass.set_pipeline(pipeline);
            rpass.set_bind_group(0, bind_group, &[]);
            rpass.draw(0..3, 0..1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_block_matches_shader_layout() {
        // vec4 header + 32 vec4 params
        assert_eq!(std::mem::size_of::<PresentUniforms>(), 16 + 32 * 16);
    }

    // ── letterbox ─────────────────────────────────────────────────────────

    #[test]
    fn integer_scale_is_centered() {
        let (x, y, w, h) = letterbox(Size::new(480, 270), Size::new(1280, 720));
        assert_eq!((w, h), (960.0, 540.0));
        assert_eq!((x, y), (160.0, 90.0));
    }

    #[test]
    fn exact_multiple_fills_output() {
        assert_eq!(
            letterbox(Size::new(480, 270), Size::new(1920, 1080)),
            (0.0, 0.0, 1920.0, 1080.0)
        );
    }

    #[test]
    fn small_output_scales_down_fractionally() {
        let (_, _, w, h) = letterbox(Size::new(480, 270), Size::new(240, 200));
        assert_eq!((w, h), (240.0, 135.0));
    }

    #[test]
    fn empty_output_is_passed_through() {
        assert_eq!(letterbox(Size::new(480, 270), Size::new(0, 0)), (0.0, 0.0, 0.0, 0.0));
    }
}
