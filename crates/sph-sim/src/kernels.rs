//! Kernel sources and their compiled pipelines.
//!
//! Every compute kernel is assembled as `header + common.wgsl + <stage>.wgsl`,
//! where the header is generated from [`crate::params`]. Sources come either
//! from the copies embedded at build time or from a directory on disk.

use std::fs;
use std::path::Path;

use crate::error::SimError;
use crate::layout::Field;
use crate::params::{PARTICLE_RADIUS, TIME_STEP, WORK_GROUP_SIZE};
use crate::stage::Stage;
use crate::validation;

const COMMON_FILE: &str = "common.wgsl";
const RENDER_FILE: &str = "particle.wgsl";

/// Raw WGSL sources for one run.
#[derive(Debug, Clone)]
pub struct KernelSources {
    /// Where the sources came from, for diagnostics.
    pub origin: String,
    common: String,
    stages: [String; 3],
    render: String,
}

impl KernelSources {
    /// Sources compiled into the binary.
    pub fn embedded() -> Self {
        Self {
            origin: "embedded".to_string(),
            common: include_str!("../shaders/common.wgsl").to_string(),
            stages: [
                include_str!("../shaders/density_pressure.wgsl").to_string(),
                include_str!("../shaders/force.wgsl").to_string(),
                include_str!("../shaders/integrate.wgsl").to_string(),
            ],
            render: include_str!("../shaders/particle.wgsl").to_string(),
        }
    }

    /// Reads `common.wgsl`, one `<entry point>.wgsl` per stage and
    /// `particle.wgsl` from `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self, SimError> {
        let read = |file: &str| {
            let path = dir.join(file);
            fs::read_to_string(&path)
                .map_err(|e| SimError::asset(file, format!("{}: {e}", path.display())))
        };

        let sources = Self {
            origin: dir.display().to_string(),
            common: read(COMMON_FILE)?,
            stages: [
                read(&stage_file(Stage::DensityPressure))?,
                read(&stage_file(Stage::Force))?,
                read(&stage_file(Stage::Integrate))?,
            ],
            render: read(RENDER_FILE)?,
        };
        log::debug!("loaded kernel sources from {}", sources.origin);
        Ok(sources)
    }

    /// Complete WGSL for `stage` with the constants header for `particle_count`.
    pub fn compute_source(&self, stage: Stage, particle_count: u32) -> String {
        let mut code = constants_header(particle_count);
        code.push_str(&self.common);
        code.push('\n');
        code.push_str(&self.stages[stage_index(stage)]);
        code
    }

    pub fn render_source(&self) -> &str {
        &self.render
    }
}

/// WGSL constant declarations shared by host and kernels.
pub fn constants_header(particle_count: u32) -> String {
    format!(
        "const PARTICLE_COUNT: u32 = {particle_count}u;\n\
         const WORK_GROUP_SIZE: u32 = {WORK_GROUP_SIZE}u;\n\
         const PARTICLE_RADIUS: f32 = {PARTICLE_RADIUS:?};\n\
         const TIME_STEP: f32 = {TIME_STEP:?};\n\n"
    )
}

fn stage_file(stage: Stage) -> String {
    format!("{}.wgsl", stage.entry_point())
}

fn stage_index(stage: Stage) -> usize {
    match stage {
        Stage::DensityPressure => 0,
        Stage::Force => 1,
        Stage::Integrate => 2,
    }
}

/// One compute pipeline per stage, sharing the particle bind group layout.
pub struct CompiledKernels {
    bind_group_layout: wgpu::BindGroupLayout,
    pipelines: [wgpu::ComputePipeline; 3],
}

impl CompiledKernels {
    /// Compiles and links every stage. The first failure aborts with the
    /// compiler's diagnostic.
    pub fn compile(
        device: &wgpu::Device,
        sources: &KernelSources,
        particle_count: u32,
    ) -> Result<Self, SimError> {
        let bind_group_layout = create_particle_bind_group_layout(device);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sph compute pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let compile = |stage| compile_stage(device, &pipeline_layout, sources, stage, particle_count);
        let pipelines = [
            compile(Stage::DensityPressure)?,
            compile(Stage::Force)?,
            compile(Stage::Integrate)?,
        ];

        Ok(Self {
            bind_group_layout,
            pipelines,
        })
    }

    pub fn pipeline(&self, stage: Stage) -> &wgpu::ComputePipeline {
        &self.pipelines[stage_index(stage)]
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }
}

fn create_particle_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    // Every field is read_write: ranges of one buffer, so mixing read-only and
    // writable bindings of it in one dispatch would be a usage conflict.
    let entries: Vec<wgpu::BindGroupLayoutEntry> = Field::ALL
        .iter()
        .map(|field| wgpu::BindGroupLayoutEntry {
            binding: field.binding(),
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: false },
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(field.element_size()),
            },
            count: None,
        })
        .collect();

    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("sph particle bgl"),
        entries: &entries,
    })
}

fn compile_stage(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    sources: &KernelSources,
    stage: Stage,
    particle_count: u32,
) -> Result<wgpu::ComputePipeline, SimError> {
    let name = stage.entry_point();
    let code = sources.compute_source(stage, particle_count);

    let ((module, pipeline), error) =
        validation::scoped(device, wgpu::ErrorFilter::Validation, || {
            let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(name),
                source: wgpu::ShaderSource::Wgsl(code.into()),
            });
            let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(name),
                layout: Some(layout),
                module: &module,
                entry_point: Some(name),
                compilation_options: Default::default(),
                cache: None,
            });
            (module, pipeline)
        });

    if let Some(error) = error {
        let diagnostic = validation::compilation_errors(&module).unwrap_or_else(|| error.to_string());
        return Err(SimError::asset(name, diagnostic));
    }

    log::debug!("compiled kernel `{name}` ({})", sources.origin);
    Ok(pipeline)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_declares_shared_constants() {
        let header = constants_header(20_000);

        assert!(header.contains("const PARTICLE_COUNT: u32 = 20000u;"));
        assert!(header.contains("const WORK_GROUP_SIZE: u32 = 128u;"));
        assert!(header.contains("const PARTICLE_RADIUS: f32 = 0.005;"));
        assert!(header.contains("const TIME_STEP: f32 = 0.0001;"));
    }

    #[test]
    fn composed_kernels_carry_header_bindings_and_entry_point() {
        let sources = KernelSources::embedded();

        for stage in Stage::ORDER {
            let code = sources.compute_source(stage, 500);
            assert!(code.starts_with("const PARTICLE_COUNT: u32 = 500u;"));
            assert!(code.contains(&format!("fn {}(", stage.entry_point())));
            for field in Field::ALL {
                assert!(
                    code.contains(&format!("@binding({})", field.binding())),
                    "{stage:?} lacks binding for {field:?}"
                );
            }
        }
    }

    fn wgsl_array(field: Field) -> &'static str {
        match field {
            Field::Position => "positions",
            Field::Velocity => "velocities",
            Field::Force => "forces",
            Field::Density => "densities",
            Field::Pressure => "pressures",
        }
    }

    /// Every `name[...]` access that is not the target of `name[i] =`.
    fn reads_array(code: &str, name: &str) -> bool {
        let accesses = code.matches(&format!("{name}[")).count();
        let stores = code.matches(&format!("{name}[i] =")).count();
        accesses > stores
    }

    fn writes_array(code: &str, name: &str) -> bool {
        code.contains(&format!("{name}[i] ="))
    }

    #[test]
    fn declared_stage_access_matches_kernel_source() {
        let sources = KernelSources::embedded();

        for stage in Stage::ORDER {
            let code = sources.compute_source(stage, 64);
            for field in Field::ALL {
                let name = wgsl_array(field);
                assert_eq!(
                    reads_array(&code, name),
                    stage.reads().contains(&field),
                    "{stage:?} read of {field:?}"
                );
                assert_eq!(
                    writes_array(&code, name),
                    stage.writes().contains(&field),
                    "{stage:?} write of {field:?}"
                );
            }
        }
    }

    #[test]
    fn render_source_has_both_entry_points() {
        let sources = KernelSources::embedded();
        assert!(sources.render_source().contains("fn vs_main("));
        assert!(sources.render_source().contains("fn fs_main("));
    }

    #[test]
    fn shader_dir_round_trip_matches_embedded() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("shaders");
        let disk = KernelSources::from_dir(&dir).unwrap();
        let embedded = KernelSources::embedded();

        for stage in Stage::ORDER {
            assert_eq!(disk.compute_source(stage, 42), embedded.compute_source(stage, 42));
        }
        assert_eq!(disk.render_source(), embedded.render_source());
    }

    #[test]
    fn missing_shader_dir_is_an_asset_error() {
        let dir = std::env::temp_dir().join("sph-sim-no-such-shader-dir");
        let err = KernelSources::from_dir(&dir).unwrap_err();

        match err {
            SimError::Asset { kernel, diagnostic } => {
                assert_eq!(kernel, COMMON_FILE);
                assert!(diagnostic.contains("sph-sim-no-such-shader-dir"));
            }
            other => panic!("expected asset error, got {other:?}"),
        }
    }
}
