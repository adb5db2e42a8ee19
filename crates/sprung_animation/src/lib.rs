//! Sprung Animation System
//!
//! Spring physics and frame-driven spring drivers.
//!
//! # Features
//!
//! - **Spring Physics**: Damped springs with stiffness, damping, mass, clamping
//!   and precision, integrated in 1 ms sub-steps
//! - **Manual Time**: Springs only move when time is advanced, so motion can
//!   be simulated ahead of time or driven by any clock
//! - **Interruptible**: Retargeting keeps the current velocity
//! - **Auto Springs**: Springs that run themselves on a host frame clock,
//!   sharing one frame request per environment
//! - **Presets**: Named configurations for common motion styles
//! - **Registry**: Springs of one animated target keyed by property and index

pub mod config;
pub mod driver;
pub mod error;
pub mod presets;
pub mod registry;
pub mod spring;
pub mod step;

pub use config::{resolve, SpringConfig, SpringConfigInput};
pub use driver::{AutoSpring, MAX_FRAMES_WITHOUT_REST};
pub use error::{ConfigError, Result, SpringError};
pub use presets::PRESET_NAMES;
pub use registry::SpringRegistry;
pub use spring::{calculate_precision, Spring};
pub use step::{step_spring, SpringState, StepParams, MAX_SIMULATION_STEPS};
