//! Error types for sprung_animation

use sprung_core::FrameError;
use thiserror::Error;

/// A spring configuration was rejected
///
/// Raised synchronously by the call that tried to apply the configuration.
/// The previously applied configuration stays in effect.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Mass must be greater than or equal to 0, got {0}")]
    NegativeMass(f64),

    #[error("Stiffness must be greater than 0, got {0}")]
    NonPositiveStiffness(f64),

    #[error("Precision must be greater than 0, got {0}")]
    NonPositivePrecision(f64),

    #[error("Spring config field `{field}` must be a finite number")]
    NonFinite { field: &'static str },

    /// Failed to deserialize a config (malformed input or unknown field)
    #[error("Invalid spring config: {0}")]
    Parse(String),
}

/// Errors raised by springs and spring drivers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpringError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A target, velocity or time delta was NaN or infinite
    #[error("Invalid spring value: {0}")]
    InvalidValue(f64),

    /// Time was asked to move backwards
    #[error("Cannot advance spring time backwards (dt = {dt} ms)")]
    TimeOrder { dt: f64 },

    /// The time delta needs more 1 ms steps than the simulation allows
    #[error("Spring simulation of {steps} steps exceeds the step limit, snap instead")]
    SimulationTimeout { steps: f64 },

    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Result type for spring operations
pub type Result<T> = std::result::Result<T, SpringError>;
