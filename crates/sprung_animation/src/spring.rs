//! Spring physics animation
//!
//! A damped spring that is not tied to any timer. Time only moves when the
//! owner calls [`Spring::advance_time_by`] or [`Spring::advance_time_to`],
//! so motion can be simulated ahead of time or in lockstep with a frame
//! clock, and the target may change at any point without resetting
//! velocity.
//!
//! ```rust
//! use sprung_animation::{Spring, SpringConfigInput};
//!
//! let mut spring = Spring::new(0.0, SpringConfigInput::new()).unwrap();
//! spring.set_target(100.0).unwrap();
//!
//! while !spring.is_at_rest() {
//!     spring.advance_time_by(16.0).unwrap();
//! }
//!
//! assert_eq!(spring.value(), 100.0);
//! ```

use crate::config::{SpringConfig, SpringConfigInput};
use crate::error::{Result, SpringError};
use crate::step::{step_spring, SpringState, StepParams};

/// Snap tolerance for a move from `from` to `to`
///
/// Scales the base precision with the size of the jump (never below one
/// unit), so large moves still settle in a bounded number of steps instead
/// of creeping over the last fraction of a unit.
pub fn calculate_precision(from: f64, to: f64, precision_base: f64) -> f64 {
    if from == to {
        return 1.0;
    }

    let diff = (from - to).abs().max(1.0);

    diff / (1.0 / precision_base)
}

/// A spring-based animator
#[derive(Clone, Debug)]
pub struct Spring {
    config: SpringConfig,
    value: f64,
    velocity: f64,
    target: f64,
    /// Milliseconds simulated so far
    time: f64,
    /// Snap tolerance derived at the last target change
    precision_scale: f64,
    last_config_update: Option<SpringConfigInput>,
}

impl Spring {
    /// Create a spring resting at `initial`
    ///
    /// Missing config fields take their defaults.
    pub fn new(initial: f64, config: impl Into<SpringConfigInput>) -> Result<Self> {
        let config = SpringConfig::resolve(&config.into())?;
        Self::with_config(initial, config)
    }

    /// Create a spring from an already resolved config
    pub fn with_config(initial: f64, config: SpringConfig) -> Result<Self> {
        config.validate()?;

        if !initial.is_finite() {
            return Err(SpringError::InvalidValue(initial));
        }

        Ok(Self {
            config,
            value: initial,
            velocity: 0.0,
            target: initial,
            time: 0.0,
            precision_scale: 1.0,
            last_config_update: None,
        })
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn config(&self) -> &SpringConfig {
        &self.config
    }

    pub fn precision_scale(&self) -> f64 {
        self.precision_scale
    }

    /// Exactly on target with no velocity
    ///
    /// Only reached through the integrator's snap, `snap_to_target` or `stop`.
    pub fn is_at_rest(&self) -> bool {
        self.target == self.value && self.velocity == 0.0
    }

    /// Move the target, keeping the current value, velocity and time
    pub fn set_target(&mut self, target: f64) -> Result<()> {
        if self.target == target {
            return Ok(());
        }

        if !target.is_finite() {
            return Err(SpringError::InvalidValue(target));
        }

        self.precision_scale = calculate_precision(self.value, target, self.config.precision);
        self.target = target;
        Ok(())
    }

    /// Move the target and replace the current velocity (e.g. a fling)
    pub fn set_target_with_velocity(&mut self, target: f64, velocity: f64) -> Result<()> {
        if !velocity.is_finite() {
            return Err(SpringError::InvalidValue(velocity));
        }

        self.set_target(target)?;
        self.velocity = velocity;
        Ok(())
    }

    /// Merge `input` over the current config
    ///
    /// Nothing is applied if the merged config is invalid. Passing the same
    /// input as the last successful update is a no-op.
    pub fn update_config(&mut self, input: &SpringConfigInput) -> Result<()> {
        if self.last_config_update.as_ref() == Some(input) {
            return Ok(());
        }

        let config = self.config.merge(input);
        config.validate()?;

        self.config = config;
        self.last_config_update = Some(*input);
        Ok(())
    }

    /// Simulate `dt` more milliseconds
    ///
    /// An invalid `dt` leaves the spring untouched. A delta too long to
    /// simulate still moves the clock forward but keeps value and velocity,
    /// so the caller can snap instead.
    pub fn advance_time_by(&mut self, dt: f64) -> Result<()> {
        if dt == 0.0 {
            return Ok(());
        }

        if dt < 0.0 {
            return Err(SpringError::TimeOrder { dt });
        }

        if !dt.is_finite() {
            return Err(SpringError::InvalidValue(dt));
        }

        self.time += dt;

        if self.is_at_rest() {
            return Ok(());
        }

        // Infinite acceleration: arrive immediately
        if self.config.mass == 0.0 {
            self.snap_to_target();
            return Ok(());
        }

        let params = StepParams::new(self.target, &self.config, self.precision_scale);
        let next = step_spring(dt, SpringState::new(self.value, self.velocity), &params)?;

        self.value = next.value;
        self.velocity = next.velocity;
        Ok(())
    }

    /// Simulate up to the absolute time `time` (ms since creation)
    pub fn advance_time_to(&mut self, time: f64) -> Result<()> {
        self.advance_time_by(time - self.time)
    }

    /// Jump to the current target and stop moving
    pub fn snap_to_target(&mut self) {
        self.snap_to(self.target);
    }

    /// Jump to `target`, making it the new target, and stop moving
    pub fn snap_to(&mut self, target: f64) {
        self.value = target;
        self.target = target;
        self.velocity = 0.0;
    }

    /// Freeze where the spring currently is, discarding velocity
    pub fn stop(&mut self) {
        if self.target != self.value {
            self.precision_scale =
                calculate_precision(self.value, self.value, self.config.precision);
            self.target = self.value;
        }
        self.snap_to_target();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spring_at(initial: f64) -> Spring {
        Spring::new(initial, SpringConfigInput::new()).unwrap()
    }

    #[test]
    fn test_new_starts_at_rest() {
        let spring = spring_at(5.0);

        assert_eq!(spring.value(), 5.0);
        assert_eq!(spring.target(), 5.0);
        assert_eq!(spring.velocity(), 0.0);
        assert_eq!(spring.time(), 0.0);
        assert!(spring.is_at_rest());
    }

    #[test]
    fn test_new_rejects_invalid_config_and_value() {
        assert!(matches!(
            Spring::new(0.0, SpringConfigInput::new().mass(-1.0)),
            Err(SpringError::Config(_))
        ));
        assert_eq!(
            Spring::with_config(f64::INFINITY, SpringConfig::default()).unwrap_err(),
            SpringError::InvalidValue(f64::INFINITY)
        );
    }

    #[test]
    fn test_new_accepts_presets() {
        let spring = Spring::new(0.0, SpringConfig::rapid()).unwrap();
        assert_eq!(*spring.config(), SpringConfig::rapid());
    }

    #[test]
    fn test_set_target_rejects_non_finite() {
        let mut spring = spring_at(0.0);
        spring.set_target(10.0).unwrap();
        spring.advance_time_by(16.0).unwrap();
        let before = spring.clone();

        assert!(spring.set_target(f64::NAN).is_err());
        assert_eq!(
            spring.set_target(f64::NEG_INFINITY),
            Err(SpringError::InvalidValue(f64::NEG_INFINITY))
        );

        assert_eq!(spring.target(), before.target());
        assert_eq!(spring.value(), before.value());
        assert_eq!(spring.velocity(), before.velocity());
    }

    #[test]
    fn test_same_target_is_noop() {
        let mut spring = spring_at(0.0);
        spring.set_target(500.0).unwrap();
        let scale = spring.precision_scale();

        spring.advance_time_by(16.0).unwrap();
        spring.set_target(500.0).unwrap();
        assert_eq!(spring.precision_scale(), scale);
    }

    #[test]
    fn test_calculate_precision() {
        assert_eq!(calculate_precision(3.0, 3.0, 0.002), 1.0);
        // Jumps below one unit use the one-unit tolerance
        assert!((calculate_precision(0.0, 0.5, 0.002) - 0.002).abs() < 1e-12);
        assert!((calculate_precision(0.0, 300.0, 0.002) - 0.6).abs() < 1e-12);
        assert!((calculate_precision(100.0, -100.0, 0.01) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_target_change_keeps_velocity_and_time() {
        let mut spring = Spring::new(0.0, SpringConfig::new(180.0, 12.0, 1.0)).unwrap();
        spring.set_target(100.0).unwrap();

        for _ in 0..10 {
            spring.advance_time_by(16.0).unwrap();
        }

        let velocity = spring.velocity();
        assert!(velocity > 0.0);

        spring.set_target(50.0).unwrap();
        assert_eq!(spring.velocity(), velocity);
        assert_eq!(spring.time(), 160.0);
    }

    #[test]
    fn test_advance_time_ordering() {
        let mut spring = spring_at(0.0);
        spring.set_target(10.0).unwrap();

        spring.advance_time_by(0.0).unwrap();
        assert_eq!(spring.time(), 0.0);
        assert_eq!(spring.value(), 0.0);

        assert_eq!(
            spring.advance_time_by(-1.0),
            Err(SpringError::TimeOrder { dt: -1.0 })
        );
        assert!(matches!(
            spring.advance_time_by(f64::NAN),
            Err(SpringError::InvalidValue(_))
        ));

        spring.advance_time_to(40.0).unwrap();
        assert_eq!(spring.time(), 40.0);
        assert!(matches!(
            spring.advance_time_to(20.0),
            Err(SpringError::TimeOrder { .. })
        ));
    }

    #[test]
    fn test_time_accumulates_at_rest() {
        let mut spring = spring_at(1.0);
        spring.advance_time_by(16.0).unwrap();
        spring.advance_time_by(20_000.0).unwrap();

        assert_eq!(spring.time(), 20_016.0);
        assert!(spring.is_at_rest());
    }

    #[test]
    fn test_timeout_keeps_motion_and_moves_clock() {
        let mut spring = spring_at(0.0);
        spring.set_target(100.0).unwrap();
        spring.advance_time_by(16.0).unwrap();
        let (value, velocity) = (spring.value(), spring.velocity());

        assert!(matches!(
            spring.advance_time_to(60_016.0),
            Err(SpringError::SimulationTimeout { .. })
        ));
        assert_eq!(spring.value(), value);
        assert_eq!(spring.velocity(), velocity);
        assert_eq!(spring.time(), 60_016.0);

        // The gap is behind us; following frames simulate normally
        spring.advance_time_to(60_016.0).unwrap();
        spring.advance_time_to(60_032.0).unwrap();
        assert_ne!(spring.value(), value);
    }

    #[test]
    fn test_zero_mass_snaps() {
        let mut spring = Spring::new(0.0, SpringConfig::instant()).unwrap();
        spring.set_target(250.0).unwrap();
        spring.advance_time_by(0.001).unwrap();

        assert_eq!(spring.value(), 250.0);
        assert_eq!(spring.velocity(), 0.0);
        assert!(spring.is_at_rest());
    }

    #[test]
    fn test_stop_freezes_in_place() {
        let mut spring = spring_at(0.0);
        spring.set_target(100.0).unwrap();
        spring.advance_time_by(48.0).unwrap();
        let value = spring.value();
        assert!(value > 0.0 && value < 100.0);

        spring.stop();
        assert_eq!(spring.value(), value);
        assert_eq!(spring.target(), value);
        assert_eq!(spring.velocity(), 0.0);
        assert!(spring.is_at_rest());
        assert_eq!(spring.precision_scale(), 1.0);
    }

    #[test]
    fn test_snap_to() {
        let mut spring = spring_at(0.0);
        spring.set_target(100.0).unwrap();
        spring.advance_time_by(16.0).unwrap();

        spring.snap_to(-20.0);
        assert_eq!(spring.value(), -20.0);
        assert_eq!(spring.target(), -20.0);
        assert!(spring.is_at_rest());

        spring.set_target(10.0).unwrap();
        spring.snap_to_target();
        assert_eq!(spring.value(), 10.0);
    }

    #[test]
    fn test_update_config_is_atomic() {
        let mut spring = spring_at(0.0);
        let before = *spring.config();

        let result = spring.update_config(&SpringConfigInput::new().damping(10.0).stiffness(0.0));
        assert!(matches!(result, Err(SpringError::Config(_))));
        assert_eq!(*spring.config(), before);

        spring
            .update_config(&SpringConfigInput::new().damping(10.0))
            .unwrap();
        assert_eq!(spring.config().damping, 10.0);
        assert_eq!(spring.config().stiffness, before.stiffness);
    }

    #[test]
    fn test_update_config_keeps_motion() {
        let mut spring = spring_at(0.0);
        spring.set_target(100.0).unwrap();
        spring.advance_time_by(32.0).unwrap();
        let (value, velocity) = (spring.value(), spring.velocity());

        spring
            .update_config(&SpringConfigInput::new().stiffness(900.0))
            .unwrap();
        assert_eq!(spring.value(), value);
        assert_eq!(spring.velocity(), velocity);
        assert_eq!(spring.target(), 100.0);
    }

    #[test]
    fn test_fling_velocity() {
        let mut spring = spring_at(0.0);
        spring.set_target_with_velocity(0.0, 2000.0).unwrap();
        assert!(!spring.is_at_rest());

        spring.advance_time_by(16.0).unwrap();
        assert!(spring.value() > 0.0);

        assert!(spring.set_target_with_velocity(10.0, f64::NAN).is_err());
        assert_eq!(spring.target(), 0.0);
    }

    #[test]
    fn test_settles_at_60fps() {
        let mut spring = Spring::new(0.0, SpringConfig::rapid()).unwrap();
        spring.set_target(100.0).unwrap();

        // 2 seconds at 60fps
        for _ in 0..120 {
            spring.advance_time_by(1000.0 / 60.0).unwrap();
        }

        assert!(spring.is_at_rest());
        assert_eq!(spring.value(), 100.0);
    }
}
