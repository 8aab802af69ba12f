//! Error types for the simulator.
//!
//! Construction-time problems fail fast with a typed error; the running
//! simulation never raises, it absorbs degenerate cases in place.

use thiserror::Error;

use crate::simulation::states::BodyHandle;

/// Errors raised by the simulation core.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Invalid radius: {0} (must be finite and > 0)")]
    InvalidRadius(f64),

    #[error("Invalid mass: {0} (must be finite and >= 0)")]
    InvalidMass(f64),

    #[error("Invalid gravity divisor: {0} (must be finite and > 0)")]
    InvalidGravityDivisor(f64),

    #[error("Invalid world extent: {width} x {height}")]
    InvalidWorld { width: f64, height: f64 },

    #[error("Tick period must be greater than zero")]
    InvalidTickPeriod,

    #[error("Stale body handle: {0}")]
    StaleHandle(BodyHandle),

    #[error("Failed to spawn body thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Errors raised while loading a scenario file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}
