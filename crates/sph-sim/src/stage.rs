//! Ordered compute stages of one simulation step.
//!
//! A step is three stages in strict order, each followed by a full barrier:
//!
//! | stage            | reads                                  | writes             |
//! |------------------|----------------------------------------|--------------------|
//! | density-pressure | position                               | density, pressure  |
//! | force            | position, velocity, density, pressure  | force              |
//! | integrate        | force, density, velocity, position     | velocity, position |
//!
//! The barrier after `integrate` also separates consecutive steps. Stages
//! update the packed buffer in place; there is no double buffering.

use crate::error::SimError;
use crate::layout::Field;
use crate::params::work_group_count;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Stage {
    DensityPressure,
    Force,
    Integrate,
}

impl Stage {
    /// Mandatory execution order within a step.
    pub const ORDER: [Stage; 3] = [Stage::DensityPressure, Stage::Force, Stage::Integrate];

    /// Kernel entry point and source file stem.
    pub const fn entry_point(self) -> &'static str {
        match self {
            Stage::DensityPressure => "density_pressure",
            Stage::Force => "force",
            Stage::Integrate => "integrate",
        }
    }

    pub const fn reads(self) -> &'static [Field] {
        match self {
            Stage::DensityPressure => &[Field::Position],
            Stage::Force => &[Field::Position, Field::Velocity, Field::Density, Field::Pressure],
            // Acceleration is force over density; velocity and position are
            // updated in place.
            Stage::Integrate => &[Field::Force, Field::Density, Field::Velocity, Field::Position],
        }
    }

    pub const fn writes(self) -> &'static [Field] {
        match self {
            Stage::DensityPressure => &[Field::Density, Field::Pressure],
            Stage::Force => &[Field::Force],
            Stage::Integrate => &[Field::Velocity, Field::Position],
        }
    }
}

/// Records the commands of one step.
///
/// Implementations decide what "barrier" means on their backend; the pipeline
/// only guarantees the call sequence `bind, dispatch, barrier` per stage, in
/// [`Stage::ORDER`].
pub trait StageEncoder {
    /// Makes `stage`'s kernel and the particle bindings current.
    fn bind(&mut self, stage: Stage) -> Result<(), SimError>;

    /// Launches `work_groups` groups of the bound kernel.
    fn dispatch(&mut self, stage: Stage, work_groups: u32) -> Result<(), SimError>;

    /// Makes every write of `stage` visible to whatever runs next.
    fn barrier(&mut self, stage: Stage) -> Result<(), SimError>;
}

/// Issues the stages of one step through a [`StageEncoder`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct StagePipeline {
    particle_count: u32,
    work_groups: u32,
}

impl StagePipeline {
    pub fn new(particle_count: u32) -> Self {
        Self {
            particle_count,
            work_groups: work_group_count(particle_count),
        }
    }

    #[inline]
    pub fn particle_count(&self) -> u32 {
        self.particle_count
    }

    /// Work groups dispatched per stage.
    #[inline]
    pub fn work_groups(&self) -> u32 {
        self.work_groups
    }

    /// Records one full step. Stops at the first encoder error.
    pub fn run_step<E>(&self, encoder: &mut E) -> Result<(), SimError>
    where
        E: StageEncoder + ?Sized,
    {
        for stage in Stage::ORDER {
            encoder.bind(stage)?;
            encoder.dispatch(stage, self.work_groups)?;
            encoder.barrier(stage)?;
        }
        Ok(())
    }
}

/// One recorded encoder call.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum StageCommand {
    Bind(Stage),
    Dispatch(Stage, u32),
    Barrier(Stage),
}

/// [`StageEncoder`] that records calls instead of issuing device work.
#[derive(Debug, Default, Clone)]
pub struct StageTrace {
    commands: Vec<StageCommand>,
}

impl StageTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[StageCommand] {
        &self.commands
    }

    /// Number of fully recorded steps (a step ends with the integrate barrier).
    pub fn completed_steps(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| **c == StageCommand::Barrier(Stage::Integrate))
            .count()
    }

    /// The exact call sequence of one step dispatching `work_groups` per stage.
    pub fn expected_step(work_groups: u32) -> Vec<StageCommand> {
        Stage::ORDER
            .into_iter()
            .flat_map(|s| {
                [
                    StageCommand::Bind(s),
                    StageCommand::Dispatch(s, work_groups),
                    StageCommand::Barrier(s),
                ]
            })
            .collect()
    }
}

impl StageEncoder for StageTrace {
    fn bind(&mut self, stage: Stage) -> Result<(), SimError> {
        self.commands.push(StageCommand::Bind(stage));
        Ok(())
    }

    fn dispatch(&mut self, stage: Stage, work_groups: u32) -> Result<(), SimError> {
        self.commands.push(StageCommand::Dispatch(stage, work_groups));
        Ok(())
    }

    fn barrier(&mut self, stage: Stage) -> Result<(), SimError> {
        self.commands.push(StageCommand::Barrier(stage));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_step_is_three_fenced_stages_in_order() {
        let pipeline = StagePipeline::new(20_000);
        let mut trace = StageTrace::new();
        pipeline.run_step(&mut trace).unwrap();

        assert_eq!(pipeline.work_groups(), 157);
        assert_eq!(trace.commands(), StageTrace::expected_step(157).as_slice());
        assert_eq!(trace.completed_steps(), 1);
    }

    #[test]
    fn order_repeats_every_step() {
        let pipeline = StagePipeline::new(129);
        let mut trace = StageTrace::new();
        for _ in 0..4 {
            pipeline.run_step(&mut trace).unwrap();
        }

        let step = StageTrace::expected_step(2);
        for chunk in trace.commands().chunks(step.len()) {
            assert_eq!(chunk, step.as_slice());
        }
        assert_eq!(trace.completed_steps(), 4);
    }

    #[test]
    fn every_read_is_produced_before_it_is_consumed() {
        // Position and velocity carry over from the previous step's integrate;
        // everything else must be written earlier in the same step.
        let mut ready: Vec<Field> = Stage::Integrate.writes().to_vec();
        for stage in Stage::ORDER {
            for field in stage.reads() {
                assert!(ready.contains(field), "{stage:?} reads {field:?} before it is written");
            }
            ready.extend_from_slice(stage.writes());
        }
    }

    #[test]
    fn each_field_has_one_writer_per_step() {
        for field in Field::ALL {
            let writers = Stage::ORDER.iter().filter(|s| s.writes().contains(&field)).count();
            assert_eq!(writers, 1, "{field:?}");
        }
    }

    struct FailAt {
        stage: Stage,
        trace: StageTrace,
    }

    impl StageEncoder for FailAt {
        fn bind(&mut self, stage: Stage) -> Result<(), SimError> {
            self.trace.bind(stage)
        }

        fn dispatch(&mut self, stage: Stage, work_groups: u32) -> Result<(), SimError> {
            if stage == self.stage {
                return Err(SimError::Device("dispatch rejected".into()));
            }
            self.trace.dispatch(stage, work_groups)
        }

        fn barrier(&mut self, stage: Stage) -> Result<(), SimError> {
            self.trace.barrier(stage)
        }
    }

    #[test]
    fn dispatch_failure_stops_the_step() {
        let mut enc = FailAt {
            stage: Stage::Force,
            trace: StageTrace::new(),
        };
        let err = StagePipeline::new(64).run_step(&mut enc).unwrap_err();

        assert!(matches!(err, SimError::Device(_)));
        assert_eq!(
            enc.trace.commands(),
            &[
                StageCommand::Bind(Stage::DensityPressure),
                StageCommand::Dispatch(Stage::DensityPressure, 1),
                StageCommand::Barrier(Stage::DensityPressure),
                StageCommand::Bind(Stage::Force),
            ]
        );
    }
}
