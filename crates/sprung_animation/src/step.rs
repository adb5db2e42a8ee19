//! Spring integration
//!
//! Advances a spring by decomposing the time delta into 1 ms sub-steps of
//! semi-implicit Euler integration. A 16 ms frame therefore runs 16 steps.
//! With a single large step the spring could pass the target within one
//! frame without the force ever changing direction, which loses the small
//! wiggle at the end of the motion.
//!
//! The result is a plain `Copy` state; nothing on this path allocates.

use crate::config::SpringConfig;
use crate::error::{Result, SpringError};

/// Largest number of 1 ms steps a single call may simulate (10 seconds)
pub const MAX_SIMULATION_STEPS: f64 = 10_000.0;

/// Position and velocity of a spring
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpringState {
    pub value: f64,
    /// Units per second
    pub velocity: f64,
}

impl SpringState {
    pub fn new(value: f64, velocity: f64) -> Self {
        Self { value, velocity }
    }

    /// Resting exactly at `target`
    pub fn at_rest(target: f64) -> Self {
        Self {
            value: target,
            velocity: 0.0,
        }
    }

    pub fn is_at_rest_at(&self, target: f64) -> bool {
        self.value == target && self.velocity == 0.0
    }
}

/// Everything a step needs besides the moving state
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepParams {
    pub target: f64,
    pub stiffness: f64,
    pub damping: f64,
    pub mass: f64,
    pub clamp: bool,
    /// Absolute snap tolerance for both distance and velocity
    pub precision: f64,
}

impl StepParams {
    pub fn new(target: f64, config: &SpringConfig, precision: f64) -> Self {
        Self {
            target,
            stiffness: config.stiffness,
            damping: config.damping,
            mass: config.mass,
            clamp: config.clamp,
            precision,
        }
    }
}

/// Advance `state` by `dt_ms` milliseconds
///
/// Runs `ceil(dt_ms)` sub-steps; the last one covers only the fractional
/// remainder. Fails with [`SpringError::SimulationTimeout`] when that would
/// take more than [`MAX_SIMULATION_STEPS`] steps. Stops early once the state
/// rests exactly on the target.
pub fn step_spring(dt_ms: f64, state: SpringState, params: &StepParams) -> Result<SpringState> {
    let steps = dt_ms.ceil();

    if steps > MAX_SIMULATION_STEPS {
        return Err(SpringError::SimulationTimeout { steps });
    }

    let mut state = state;
    let count = steps as u32;

    for i in 1..=count {
        let sub_ms = if f64::from(i) > dt_ms {
            dt_ms - f64::from(i - 1)
        } else {
            1.0
        };

        state = step_by(sub_ms, state, params);

        if state.is_at_rest_at(params.target) {
            break;
        }
    }

    Ok(state)
}

fn step_by(dt_ms: f64, state: SpringState, params: &StepParams) -> SpringState {
    let dt = dt_ms / 1000.0;

    let spring_force = -(state.value - params.target) * params.stiffness;
    let friction_force = -state.velocity * params.damping;
    let acceleration = (spring_force + friction_force) / params.mass;

    let velocity = state.velocity + acceleration * dt;
    let value = state.value + velocity * dt;

    if params.clamp {
        let crossed = (state.value < params.target && value > params.target)
            || (state.value > params.target && value < params.target);
        if crossed {
            return SpringState::at_rest(params.target);
        }
    }

    // Without this the spring creeps toward the target forever
    if velocity.abs() < params.precision && (value - params.target).abs() < params.precision {
        return SpringState::at_rest(params.target);
    }

    SpringState { value, velocity }
}
