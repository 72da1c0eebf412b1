//! GPU-resident SPH particle simulation.
//!
//! Layering, leaves first:
//! - `layout` / `store`: the packed per-particle device buffer
//! - `stage`: the ordered compute stages and the `StageEncoder` seam
//! - `scheduler`: per-frame state machine (running / paused / terminating)
//! - `scene`: initial particle placement
//! - `kernels`, `encoder`, `render`, `simulation`: wgpu implementations
//! - `app`: glue that plugs the simulation into the `sph-engine` runtime

pub mod app;
pub mod config;
pub mod controls;
pub mod diagnostics;
pub mod encoder;
pub mod error;
pub mod kernels;
pub mod layout;
pub mod params;
pub mod render;
pub mod scene;
pub mod scheduler;
pub mod simulation;
pub mod stage;
pub mod store;
pub mod vec2;

mod validation;

pub use app::SphApp;
pub use config::SimConfig;
pub use error::{ConfigError, SceneError, SimError};
pub use layout::{Field, FieldRange, ParticleLayout};
pub use scene::Scenario;
pub use scheduler::{ControlEvent, FrameCounter, FrameScheduler, FrameStatus, FrameTarget, SchedulerState};
pub use stage::{Stage, StageCommand, StageEncoder, StagePipeline, StageTrace};
pub use vec2::Vec2;
