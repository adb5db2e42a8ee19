//! Frame-driven spring driver
//!
//! [`AutoSpring`] owns a [`Spring`] and advances it from a host frame clock
//! until it comes to rest. It sits idle until a target change moves the
//! spring out of rest, then runs a loop of frame callbacks:
//!
//! 1. the first frame only records a baseline timestamp
//! 2. every following frame advances the spring by the time since the
//!    previous frame and publishes the new value to `on_change` subscribers
//! 3. the loop ends when the spring rests, when `stop()`/`destroy()` is
//!    called, or after [`MAX_FRAMES_WITHOUT_REST`] frames without settling,
//!    in which case the spring is snapped to its target
//!
//! Changing the target mid-flight never restarts the loop; the running loop
//! picks the new target up on its next frame. Cancellation is cooperative:
//! a frame requested by a loop that has since been stopped (or replaced by a
//! newer loop) is dropped when it fires.
//!
//! # Example
//!
//! ```rust
//! use sprung_animation::{AutoSpring, SpringConfigInput};
//! use sprung_core::{FrameClock, ManualFrameSource};
//!
//! let source = ManualFrameSource::new();
//! let clock = FrameClock::new();
//! clock.add_environment(source.clone());
//!
//! let opacity = AutoSpring::new(0.0, SpringConfigInput::new(), &clock, None).unwrap();
//! opacity.set_target(1.0).unwrap();
//!
//! let mut now = 0.0;
//! while opacity.is_animating() {
//!     source.fire(now);
//!     now += 16.0;
//! }
//!
//! assert_eq!(opacity.value(), 1.0);
//! ```

use crate::config::{SpringConfig, SpringConfigInput};
use crate::error::{Result, SpringError};
use crate::spring::Spring;
use sprung_core::{Channel, EnvironmentId, FrameClock, FrameError, Subscription};
use std::cell::RefCell;
use std::rc::Rc;

/// Frames a loop may run after the last target change before force-settling
pub const MAX_FRAMES_WITHOUT_REST: u32 = 2000;

#[derive(Clone, Copy, Debug, PartialEq)]
enum Phase {
    Idle,
    Animating {
        loop_id: u64,
        /// `None` until the baseline frame has fired
        last_frame_time: Option<f64>,
    },
}

struct DriverState {
    spring: Spring,
    phase: Phase,
    next_loop_id: u64,
    frames_since_target_change: u32,
    last_error: Option<SpringError>,
}

impl DriverState {
    fn is_animating(&self) -> bool {
        matches!(self.phase, Phase::Animating { .. })
    }

    fn owns_loop(&self, loop_id: u64) -> bool {
        matches!(self.phase, Phase::Animating { loop_id: current, .. } if current == loop_id)
    }

    fn finish(&mut self, loop_id: u64) {
        self.phase = Phase::Idle;
        tracing::debug!("AutoSpring: animation loop {} finished", loop_id);
    }

    /// End the loop because its frames will never arrive
    fn abandon(&mut self, loop_id: u64, err: FrameError) {
        if !self.owns_loop(loop_id) {
            return;
        }
        tracing::error!("AutoSpring: stopping animation loop {}: {}", loop_id, err);
        self.spring.stop();
        self.last_error = Some(err.into());
        self.finish(loop_id);
    }

    /// Apply one frame. Returns the value to publish and whether to keep looping.
    fn advance_frame(&mut self, loop_id: u64, dt: f64) -> (f64, bool) {
        match self.spring.advance_time_by(dt) {
            Ok(()) => {}
            Err(SpringError::SimulationTimeout { .. }) => {
                tracing::warn!(
                    "AutoSpring: {} ms frame gap is too long to simulate, snapping to target",
                    dt
                );
                self.spring.snap_to_target();
                self.finish(loop_id);
                return (self.spring.value(), false);
            }
            Err(err) => {
                tracing::error!("AutoSpring: stopping animation loop {}: {}", loop_id, err);
                self.spring.stop();
                self.last_error = Some(err);
                self.finish(loop_id);
                return (self.spring.value(), false);
            }
        }

        self.frames_since_target_change += 1;

        if self.spring.is_at_rest() {
            self.finish(loop_id);
            return (self.spring.value(), false);
        }

        if self.frames_since_target_change >= MAX_FRAMES_WITHOUT_REST {
            tracing::warn!(
                "AutoSpring: spring did not settle within {} frames, snapping to target",
                MAX_FRAMES_WITHOUT_REST
            );
            self.spring.snap_to_target();
            self.finish(loop_id);
            return (self.spring.value(), false);
        }

        (self.spring.value(), true)
    }
}

struct Shared {
    state: RefCell<DriverState>,
    changes: Channel<f64>,
    clock: FrameClock,
    environment: EnvironmentId,
}

impl Shared {
    fn start_loop(this: &Rc<Self>) -> Result<()> {
        let loop_id = {
            let mut state = this.state.borrow_mut();
            if state.is_animating() {
                tracing::warn!("AutoSpring: already animating, ignoring duplicate start");
                return Ok(());
            }

            let loop_id = state.next_loop_id;
            state.next_loop_id += 1;
            state.phase = Phase::Animating {
                loop_id,
                last_frame_time: None,
            };
            loop_id
        };

        tracing::debug!("AutoSpring: animation loop {} started", loop_id);

        if let Err(err) = Self::schedule_frame(this, loop_id) {
            this.state.borrow_mut().phase = Phase::Idle;
            return Err(err.into());
        }
        Ok(())
    }

    fn schedule_frame(this: &Rc<Self>, loop_id: u64) -> sprung_core::Result<()> {
        let weak = Rc::downgrade(this);
        this.clock.request_frame(this.environment, move |frame| {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            match frame {
                Ok(timestamp) => Shared::on_frame(&shared, loop_id, timestamp),
                // Environment removed while this frame was pending
                Err(err) => shared.state.borrow_mut().abandon(loop_id, err),
            };
        })
    }

    fn on_frame(this: &Rc<Self>, loop_id: u64, timestamp: f64) {
        let publish = {
            let mut state = this.state.borrow_mut();
            let last_frame_time = match state.phase {
                Phase::Animating {
                    loop_id: current,
                    last_frame_time,
                } if current == loop_id => last_frame_time,
                // Stopped or superseded while this frame was pending
                _ => return,
            };

            state.phase = Phase::Animating {
                loop_id,
                last_frame_time: Some(timestamp),
            };

            match last_frame_time {
                None => None,
                Some(last) => Some(state.advance_frame(loop_id, timestamp - last)),
            }
        };

        if let Some((value, _)) = publish {
            this.changes.emit(&value);
        }

        if let Some((_, false)) = publish {
            return;
        }

        // Subscribers may have stopped, snapped or retargeted the spring
        let keep_going = {
            let mut state = this.state.borrow_mut();
            if !state.owns_loop(loop_id) {
                false
            } else if state.spring.is_at_rest() {
                state.finish(loop_id);
                false
            } else {
                true
            }
        };

        if keep_going {
            if let Err(err) = Self::schedule_frame(this, loop_id) {
                this.state.borrow_mut().abandon(loop_id, err);
            }
        }
    }

    fn publish(&self) {
        let value = self.state.borrow().spring.value();
        self.changes.emit(&value);
    }
}

/// A spring that animates itself on a frame clock
///
/// All methods take `&self` so that change subscribers can retarget or stop
/// the spring from inside their callback. Dropping an `AutoSpring` tears it
/// down like [`AutoSpring::destroy`], without the final publish.
pub struct AutoSpring {
    shared: Rc<Shared>,
}

impl AutoSpring {
    /// Create a spring resting at `initial`, driven by `environment`
    ///
    /// `None` selects the clock's default environment.
    pub fn new(
        initial: f64,
        config: impl Into<SpringConfigInput>,
        clock: &FrameClock,
        environment: Option<EnvironmentId>,
    ) -> Result<Self> {
        let spring = Spring::new(initial, config)?;
        let environment = clock.resolve_environment(environment)?;

        Ok(Self {
            shared: Rc::new(Shared {
                state: RefCell::new(DriverState {
                    spring,
                    phase: Phase::Idle,
                    next_loop_id: 0,
                    frames_since_target_change: 0,
                    last_error: None,
                }),
                changes: Channel::new(),
                clock: clock.clone(),
                environment,
            }),
        })
    }

    /// Animate toward `target`
    pub fn set_target(&self, target: f64) -> Result<()> {
        self.retarget(|spring| spring.set_target(target))
    }

    /// Animate toward `target`, starting from `velocity`
    pub fn set_target_with_velocity(&self, target: f64, velocity: f64) -> Result<()> {
        self.retarget(|spring| spring.set_target_with_velocity(target, velocity))
    }

    /// Update the config and animate toward `target`
    ///
    /// Nothing is applied if either the target or the config is invalid.
    pub fn set_target_with_config(&self, target: f64, config: &SpringConfigInput) -> Result<()> {
        self.retarget(|spring| {
            spring.update_config(config)?;
            spring.set_target(target)
        })
    }

    /// Apply a target change, starting the loop if it moves the spring
    ///
    /// The change is made on a copy and only committed once it has
    /// succeeded and the loop, if needed, has an environment to run in.
    fn retarget<F>(&self, apply: F) -> Result<()>
    where
        F: FnOnce(&mut Spring) -> Result<()>,
    {
        let should_start = {
            let mut state = self.shared.state.borrow_mut();
            let mut spring = state.spring.clone();
            apply(&mut spring)?;

            let should_start = !spring.is_at_rest() && !state.is_animating();
            if should_start && !self.shared.clock.contains_environment(self.shared.environment) {
                return Err(FrameError::UnknownEnvironment.into());
            }

            state.spring = spring;
            state.frames_since_target_change = 0;
            should_start
        };

        if should_start {
            Shared::start_loop(&self.shared)?;
        }
        Ok(())
    }

    /// Merge `input` over the current config without touching the motion
    pub fn update_config(&self, input: &SpringConfigInput) -> Result<()> {
        self.shared.state.borrow_mut().spring.update_config(input)
    }

    /// Start the frame loop if the spring is moving
    ///
    /// Target changes start the loop on their own; this is only needed to
    /// resume after `stop()` left a retargeted spring idle. Calling it while
    /// a loop is running logs a warning and does nothing.
    pub fn animate(&self) -> Result<()> {
        if self.shared.state.borrow().spring.is_at_rest() {
            return Ok(());
        }
        Shared::start_loop(&self.shared)
    }

    /// Jump to the target and publish
    pub fn snap_to_target(&self) {
        self.shared.state.borrow_mut().spring.snap_to_target();
        self.shared.publish();
    }

    /// Jump to `value`, making it the new target, and publish
    pub fn snap_to(&self, value: f64) {
        self.shared.state.borrow_mut().spring.snap_to(value);
        self.shared.publish();
    }

    /// End the loop and freeze the spring where it is, then publish
    pub fn stop(&self) {
        {
            let mut state = self.shared.state.borrow_mut();
            state.phase = Phase::Idle;
            state.spring.stop();
        }
        self.shared.publish();
    }

    /// Stop and drop every change subscriber
    ///
    /// Safe to call at any time, including repeatedly.
    pub fn destroy(&self) {
        self.stop();
        self.shared.changes.destroy();
    }

    /// Subscribe to published values
    pub fn on_change<F>(&self, callback: F) -> Subscription<f64>
    where
        F: Fn(&f64) + 'static,
    {
        self.shared.changes.subscribe(callback)
    }

    pub fn value(&self) -> f64 {
        self.shared.state.borrow().spring.value()
    }

    pub fn target(&self) -> f64 {
        self.shared.state.borrow().spring.target()
    }

    pub fn velocity(&self) -> f64 {
        self.shared.state.borrow().spring.velocity()
    }

    pub fn config(&self) -> SpringConfig {
        *self.shared.state.borrow().spring.config()
    }

    pub fn is_at_rest(&self) -> bool {
        self.shared.state.borrow().spring.is_at_rest()
    }

    /// Whether a frame loop is currently running
    pub fn is_animating(&self) -> bool {
        self.shared.state.borrow().is_animating()
    }

    pub fn frames_since_target_change(&self) -> u32 {
        self.shared.state.borrow().frames_since_target_change
    }

    pub fn environment(&self) -> EnvironmentId {
        self.shared.environment
    }

    /// Take the error that ended the last loop, if any
    ///
    /// Errors inside the frame loop have no caller to return to; a
    /// non-monotonic clock or a removed environment ends the loop, freezes
    /// the spring and is kept here instead.
    pub fn take_error(&self) -> Option<SpringError> {
        self.shared.state.borrow_mut().last_error.take()
    }
}

impl Drop for AutoSpring {
    fn drop(&mut self) {
        if let Ok(mut state) = self.shared.state.try_borrow_mut() {
            state.phase = Phase::Idle;
            state.spring.stop();
        }
        self.shared.changes.destroy();
    }
}
