//! Glue between the simulation and the `sph-engine` runtime.

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Sender};
use sph_engine::core::{App, AppControl, FrameCtx, PresentOutcome};
use sph_engine::device::Gpu;
use sph_engine::input::InputEvent;

use crate::config::SimConfig;
use crate::controls::KeyBindings;
use crate::diagnostics;
use crate::error::SimError;
use crate::params::TIME_STEP;
use crate::scheduler::{ControlEvent, FrameScheduler, FrameStatus, FrameTarget, SchedulerState};
use crate::simulation::GpuSimulation;

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.02,
    g: 0.02,
    b: 0.03,
    a: 1.0,
};

/// The simulation as an engine [`App`].
///
/// Input never exits directly: it is turned into [`ControlEvent`]s that the
/// scheduler handles at the next frame boundary, so an in-flight step always
/// finishes first.
pub struct SphApp {
    config: SimConfig,
    bindings: KeyBindings,
    events: Sender<ControlEvent>,
    scheduler: FrameScheduler,
    sim: Option<GpuSimulation>,
}

impl SphApp {
    pub fn new(config: SimConfig) -> Self {
        let (events, receiver) = unbounded();
        let scheduler = FrameScheduler::new(receiver, TIME_STEP, config.particle_count);

        Self {
            config,
            bindings: KeyBindings::default(),
            events,
            scheduler,
            sim: None,
        }
    }
}

impl App for SphApp {
    fn on_init(&mut self, gpu: &Gpu<'_>) -> Result<()> {
        let sim = GpuSimulation::new(gpu, &self.config).context("simulation setup failed")?;
        self.sim = Some(sim);

        if let Some(after) = self.config.report_after {
            // Detached; the process may exit before it fires.
            diagnostics::spawn_frame_report(self.scheduler.counter(), after, TIME_STEP)
                .context("failed to spawn frame report thread")?;
        }
        Ok(())
    }

    fn on_input(&mut self, event: &InputEvent) -> AppControl {
        if let Some(control) = self.bindings.map(event) {
            // The receiver lives as long as `self`.
            let _ = self.events.send(control);
        }
        AppControl::Continue
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> Result<AppControl> {
        let sim = self.sim.as_mut().context("frame requested before initialization")?;
        let started = ctx.started;
        let mut target = WindowTarget { ctx, sim };

        let state = self
            .scheduler
            .frame_from(started, &mut target)
            .context("simulation frame failed")?;
        if state == SchedulerState::Terminating {
            log::info!(
                "closing after {} steps ({:.4}s simulated)",
                self.scheduler.frame_counter(),
                self.scheduler.simulated_time()
            );
            return Ok(AppControl::Exit);
        }
        Ok(AppControl::Continue)
    }
}

/// Steps and renders into the runtime's window.
struct WindowTarget<'s, 'a, 'w> {
    ctx: &'s mut FrameCtx<'a, 'w>,
    sim: &'s mut GpuSimulation,
}

impl FrameTarget for WindowTarget<'_, '_, '_> {
    fn step(&mut self) -> Result<(), SimError> {
        self.sim.step(self.ctx.gpu)
    }

    fn render(&mut self) -> Result<(), SimError> {
        let sim = &mut *self.sim;
        let mut drawn = Ok(());
        let outcome = self
            .ctx
            .render(CLEAR_COLOR, |rctx, target| drawn = sim.draw(rctx, target))
            .map_err(|e| SimError::Device(format!("{e:#}")))?;
        drawn?;

        if outcome == PresentOutcome::Skipped {
            log::debug!("frame skipped: surface unavailable");
        }
        if self.ctx.gpu.is_lost() {
            return Err(SimError::Device("GPU device lost while presenting".into()));
        }
        Ok(())
    }

    fn publish_status(&mut self, status: &FrameStatus) {
        self.ctx.window.set_title(&status.to_string());
    }
}
