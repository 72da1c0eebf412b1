use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::params::PARTICLE_COUNT;
use crate::scene::Scenario;

/// Startup configuration, parsed from command-line arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub scenario: Scenario,
    pub particle_count: u32,
    /// Load kernels from this directory instead of the embedded set.
    pub shader_dir: Option<PathBuf>,
    /// Pace frames to the display.
    pub vsync: bool,
    /// Log the frame counter once after this long.
    pub report_after: Option<Duration>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            scenario: Scenario::Block,
            particle_count: PARTICLE_COUNT,
            shader_dir: None,
            vsync: false,
            report_after: None,
        }
    }
}

impl SimConfig {
    /// Parses arguments (without the program name).
    ///
    /// Unknown arguments are logged and ignored. An unparsable scene id falls
    /// back to scenario 0; every other malformed value is an error.
    pub fn from_args<I, S>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut config = SimConfig::default();
        let mut args = args.into_iter().map(Into::into);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-a" | "--alternate" => config.scenario = Scenario::Column,
                "--vsync" => config.vsync = true,
                "--scene" => {
                    let value = next_value(&mut args, &arg)?;
                    config.scenario = match value.parse::<i64>() {
                        Ok(id) => Scenario::from_id(id),
                        Err(_) => {
                            log::warn!("unparsable scene id `{value}`, using scenario 0");
                            Scenario::Block
                        }
                    };
                }
                "--particles" => {
                    let value = next_value(&mut args, &arg)?;
                    config.particle_count = match value.parse::<u32>() {
                        Ok(n) if n > 0 => n,
                        Ok(_) => return Err(invalid(&arg, &value, "must be positive")),
                        Err(e) => return Err(invalid(&arg, &value, &e.to_string())),
                    };
                }
                "--shader-dir" => {
                    config.shader_dir = Some(PathBuf::from(next_value(&mut args, &arg)?));
                }
                "--report-after" => {
                    let value = next_value(&mut args, &arg)?;
                    let secs = value
                        .parse::<f64>()
                        .map_err(|e| invalid(&arg, &value, &e.to_string()))?;
                    let after = Duration::try_from_secs_f64(secs)
                        .map_err(|e| invalid(&arg, &value, &e.to_string()))?;
                    config.report_after = Some(after);
                }
                other => log::warn!("ignoring unknown argument `{other}`"),
            }
        }

        Ok(config)
    }
}

fn next_value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, ConfigError> {
    args.next()
        .ok_or_else(|| ConfigError::MissingValue(flag.to_string()))
}

fn invalid(flag: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        flag: flag.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
