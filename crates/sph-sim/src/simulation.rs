use sph_engine::device::Gpu;
use sph_engine::render::{RenderCtx, RenderTarget};

use crate::config::SimConfig;
use crate::encoder::GpuStageEncoder;
use crate::error::SimError;
use crate::kernels::{CompiledKernels, KernelSources};
use crate::layout::{Field, ParticleLayout};
use crate::render::ParticleRenderer;
use crate::scene;
use crate::stage::StagePipeline;
use crate::store::ParticleStore;

/// Everything the simulation keeps on the device.
pub struct GpuSimulation {
    pipeline: StagePipeline,
    kernels: CompiledKernels,
    renderer: ParticleRenderer,
    bind_group: wgpu::BindGroup,
    store: ParticleStore,
}

impl GpuSimulation {
    /// Builds the scene, compiles every kernel and uploads the particle buffer.
    pub fn new(gpu: &Gpu<'_>, config: &SimConfig) -> Result<Self, SimError> {
        let device = gpu.device();
        let count = config.particle_count;

        let positions = scene::generate(config.scenario, count)?;
        log::info!("scenario `{}`: {count} particles", config.scenario.name());

        let sources = match &config.shader_dir {
            Some(dir) => KernelSources::from_dir(dir)?,
            None => KernelSources::embedded(),
        };
        let kernels = CompiledKernels::compile(device, &sources, count)?;
        let renderer = ParticleRenderer::new(device, gpu.surface_format(), sources.render_source())?;

        let alignment = gpu.limits().min_storage_buffer_offset_alignment as u64;
        let store = ParticleStore::allocate(device, ParticleLayout::aligned(count, alignment), &positions)?;

        let entries: Vec<wgpu::BindGroupEntry<'_>> = Field::ALL
            .iter()
            .map(|&field| wgpu::BindGroupEntry {
                binding: field.binding(),
                resource: wgpu::BindingResource::Buffer(store.binding(field)),
            })
            .collect();
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sph particle bind group"),
            layout: kernels.bind_group_layout(),
            entries: &entries,
        });

        Ok(Self {
            pipeline: StagePipeline::new(count),
            kernels,
            renderer,
            bind_group,
            store,
        })
    }

    pub fn particle_count(&self) -> u32 {
        self.pipeline.particle_count()
    }

    /// Records all stages of one step and submits them as one command buffer.
    pub fn step(&self, gpu: &Gpu<'_>) -> Result<(), SimError> {
        if gpu.is_lost() {
            return Err(SimError::Device("GPU device lost".into()));
        }

        let mut encoder = GpuStageEncoder::new(gpu.device(), &self.kernels, &self.bind_group);
        self.pipeline.run_step(&mut encoder)?;
        gpu.queue().submit(std::iter::once(encoder.finish()?));

        if gpu.is_lost() {
            return Err(SimError::Device("GPU device lost during step".into()));
        }
        Ok(())
    }

    pub fn draw(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>) -> Result<(), SimError> {
        self.renderer.render(ctx, target, &self.store)
    }
}
