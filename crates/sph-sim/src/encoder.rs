//! wgpu implementation of [`StageEncoder`].
//!
//! Each stage records into its own compute pass. Ending a pass is the barrier:
//! storage writes made in one pass are visible to every later pass of the same
//! submission.

use crate::error::SimError;
use crate::kernels::CompiledKernels;
use crate::stage::{Stage, StageEncoder};

pub struct GpuStageEncoder<'a> {
    kernels: &'a CompiledKernels,
    bind_group: &'a wgpu::BindGroup,
    encoder: wgpu::CommandEncoder,
    open: Option<(Stage, wgpu::ComputePass<'static>)>,
}

impl<'a> GpuStageEncoder<'a> {
    pub fn new(
        device: &wgpu::Device,
        kernels: &'a CompiledKernels,
        bind_group: &'a wgpu::BindGroup,
    ) -> Self {
        let encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("sph step encoder"),
        });

        Self {
            kernels,
            bind_group,
            encoder,
            open: None,
        }
    }

    /// Finishes recording. Fails if a stage was bound but never fenced.
    pub fn finish(self) -> Result<wgpu::CommandBuffer, SimError> {
        let Self { encoder, open, .. } = self;
        if let Some((stage, _pass)) = open {
            return Err(SimError::Device(format!("stage {stage:?} left without a barrier")));
        }
        Ok(encoder.finish())
    }
}

impl StageEncoder for GpuStageEncoder<'_> {
    fn bind(&mut self, stage: Stage) -> Result<(), SimError> {
        if let Some((open, _)) = &self.open {
            return Err(SimError::Device(format!(
                "stage {stage:?} bound while {open:?} is still open"
            )));
        }

        let mut pass = self
            .encoder
            .begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(stage.entry_point()),
                timestamp_writes: None,
            })
            .forget_lifetime();
        pass.set_pipeline(self.kernels.pipeline(stage));
        pass.set_bind_group(0, self.bind_group, &[]);

        self.open = Some((stage, pass));
        Ok(())
    }

    fn dispatch(&mut self, stage: Stage, work_groups: u32) -> Result<(), SimError> {
        match &mut self.open {
            Some((open, pass)) if *open == stage => {
                pass.dispatch_workgroups(work_groups, 1, 1);
                Ok(())
            }
            _ => Err(SimError::Device(format!("dispatch of unbound stage {stage:?}"))),
        }
    }

    fn barrier(&mut self, stage: Stage) -> Result<(), SimError> {
        match self.open.take() {
            // Dropping the pass ends it.
            Some((open, _pass)) if open == stage => Ok(()),
            other => {
                self.open = other;
                Err(SimError::Device(format!("barrier for unbound stage {stage:?}")))
            }
        }
    }
}
