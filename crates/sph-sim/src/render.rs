use sph_engine::render::{RenderCtx, RenderTarget};

use crate::error::SimError;
use crate::store::ParticleStore;
use crate::validation;
use crate::vec2::Vec2;

const KERNEL_NAME: &str = "particle";

/// Draws the position range of the particle buffer as a point list.
///
/// The position range is bound directly as the vertex buffer; no copy is made.
pub struct ParticleRenderer {
    source: String,
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,
}

impl ParticleRenderer {
    /// Compiles the point pipeline for `format` up front so shader errors
    /// surface at startup.
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        source: impl Into<String>,
    ) -> Result<Self, SimError> {
        let mut renderer = Self {
            source: source.into(),
            pipeline_format: None,
            pipeline: None,
        };
        renderer.ensure_pipeline(device, format)?;
        Ok(renderer)
    }

    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        store: &ParticleStore,
    ) -> Result<(), SimError> {
        self.ensure_pipeline(ctx.device, ctx.surface_format)?;
        let Some(pipeline) = self.pipeline.as_ref() else {
            return Ok(());
        };

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("sph particle pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
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

        rpass.set_pipeline(pipeline);
        rpass.set_vertex_buffer(0, store.position_slice());
        rpass.draw(0..store.layout().count(), 0..1);
        Ok(())
    }

    // ── private helpers ────────────────────────────────────────────────────

    fn ensure_pipeline(
        &mut self,
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
    ) -> Result<(), SimError> {
        if self.pipeline_format == Some(format) && self.pipeline.is_some() {
            return Ok(());
        }

        let ((shader, pipeline), error) =
            validation::scoped(device, wgpu::ErrorFilter::Validation, || {
                self.create_pipeline(device, format)
            });
        if let Some(error) = error {
            let diagnostic =
                validation::compilation_errors(&shader).unwrap_or_else(|| error.to_string());
            return Err(SimError::asset(KERNEL_NAME, diagnostic));
        }

        log::debug!("particle pipeline built for {format:?}");
        self.pipeline_format = Some(format);
        self.pipeline = Some(pipeline);
        Ok(())
    }

    fn create_pipeline(
        &self,
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
    ) -> (wgpu::ShaderModule, wgpu::RenderPipeline) {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("sph particle shader"),
            source: wgpu::ShaderSource::Wgsl(self.source.as_str().into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sph particle pipeline layout"),
            bind_group_layouts: &[],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("sph particle pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[position_layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::PointList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        (shader, pipeline)
    }
}

const POSITION_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

fn position_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vec2>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &POSITION_ATTRS,
    }
}
