use thiserror::Error;

/// Fatal simulation errors. None of these are retried.
#[derive(Debug, Error)]
pub enum SimError {
    /// Window, device or context setup failed, or the requested scene or
    /// configuration is unusable.
    #[error("initialization failed: {0}")]
    Initialization(String),

    /// A kernel source could not be read, compiled or linked.
    #[error("kernel `{kernel}` failed to load: {diagnostic}")]
    Asset { kernel: String, diagnostic: String },

    /// The device could not hold the particle buffer.
    #[error("particle buffer allocation failed: {0}")]
    Allocation(String),

    /// Dispatch, submission or presentation failed after startup.
    #[error("device failure: {0}")]
    Device(String),
}

impl SimError {
    pub(crate) fn asset(kernel: impl Into<String>, diagnostic: impl Into<String>) -> Self {
        SimError::Asset {
            kernel: kernel.into(),
            diagnostic: diagnostic.into(),
        }
    }
}

/// Scene generation rejected the requested particle population.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("particle count must be positive")]
    Empty,

    #[error("{count} particles need {rows} rows but scenario `{scenario}` holds at most {capacity}")]
    TooManyRows {
        scenario: &'static str,
        count: u32,
        rows: u32,
        capacity: u32,
    },
}

/// Invalid command-line configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing value for `{0}`")]
    MissingValue(String),

    #[error("invalid value `{value}` for `{flag}`: {reason}")]
    InvalidValue {
        flag: String,
        value: String,
        reason: String,
    },
}

impl From<SceneError> for SimError {
    fn from(err: SceneError) -> Self {
        SimError::Initialization(err.to_string())
    }
}

impl From<ConfigError> for SimError {
    fn from(err: ConfigError) -> Self {
        SimError::Initialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_errors_become_initialization_errors() {
        let err: SimError = SceneError::Empty.into();
        assert!(matches!(err, SimError::Initialization(_)));
        assert!(err.to_string().contains("particle count must be positive"));
    }

    #[test]
    fn asset_error_names_kernel() {
        let err = SimError::asset("force", "line 3: unknown identifier");
        assert_eq!(
            err.to_string(),
            "kernel `force` failed to load: line 3: unknown identifier"
        );
    }
}
