//! Frame clock error types

use thiserror::Error;

/// Errors raised when requesting frames from a [`FrameClock`](crate::FrameClock)
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// The environment was never registered or has been removed
    #[error("Frame environment is not registered with this clock")]
    UnknownEnvironment,

    /// No environment was given and the clock has no default one
    #[error("No frame environment given and the clock has no default environment")]
    NoEnvironment,
}

/// Result type for frame clock operations
pub type Result<T> = std::result::Result<T, FrameError>;
