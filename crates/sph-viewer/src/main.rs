use std::process::ExitCode;

use anyhow::{Context, Result};
use sph_engine::device::GpuInit;
use sph_engine::logging::{init_logging, LoggingConfig};
use sph_engine::window::{Runtime, RuntimeConfig};
use sph_sim::{SimConfig, SphApp};

fn main() -> ExitCode {
    init_logging(LoggingConfig::default());

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            eprintln!("sph-viewer: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let config = SimConfig::from_args(std::env::args().skip(1)).context("invalid arguments")?;
    log::info!(
        "starting: scenario `{}`, {} particles, vsync {}",
        config.scenario.name(),
        config.particle_count,
        if config.vsync { "on" } else { "off" }
    );

    let runtime = RuntimeConfig {
        title: "SPH".to_string(),
        width: 1000.0,
        height: 1000.0,
        resizable: false,
    };
    let gpu_init = GpuInit {
        present_mode: if config.vsync {
            wgpu::PresentMode::Fifo
        } else {
            wgpu::PresentMode::AutoNoVsync
        },
        ..GpuInit::default()
    };

    Runtime::run(runtime, gpu_init, SphApp::new(config))
}
