//! Frame clock adapter
//!
//! A host may expose several independent frame clocks (one per window,
//! embedded surface or display). Each is registered with a [`FrameClock`] as
//! an environment. Springs sharing an environment ask for its next frame
//! through the clock, which forwards only the first request to the
//! underlying [`FrameSource`] and resolves every waiter with the same
//! timestamp when that frame fires. The pending slot is removed on fire, so
//! the next request registers anew. Removing an environment fails its
//! pending waiters with [`FrameError::UnknownEnvironment`].
//!
//! # Example
//!
//! ```rust
//! use sprung_core::{FrameClock, ManualFrameSource};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let source = ManualFrameSource::new();
//! let clock = FrameClock::new();
//! let window = clock.add_environment(source.clone());
//!
//! let seen = Rc::new(Cell::new(0.0));
//! for _ in 0..3 {
//!     let seen = Rc::clone(&seen);
//!     clock
//!         .request_frame(window, move |t| seen.set(seen.get() + t.unwrap()))
//!         .unwrap();
//! }
//!
//! // Three waiters, one registration with the source
//! assert_eq!(source.registration_count(), 1);
//!
//! source.fire(16.0);
//! assert_eq!(seen.get(), 48.0);
//! ```

use crate::error::{FrameError, Result};
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Single-shot callback receiving a frame timestamp in milliseconds
pub type FrameCallback = Box<dyn FnOnce(f64)>;

/// Single-shot callback receiving the frame timestamp, or the reason the
/// frame will never come
pub type FrameWaiter = Box<dyn FnOnce(Result<f64>)>;

/// A host frame clock (`requestAnimationFrame`-style)
///
/// Implementations must invoke each registered callback exactly once, with
/// timestamps that never decrease across frames.
pub trait FrameSource {
    fn request_animation_frame(&self, callback: FrameCallback);
}

new_key_type! {
    /// Handle to a frame environment registered with a [`FrameClock`]
    pub struct EnvironmentId;
}

struct Environment {
    source: Rc<dyn FrameSource>,
    /// Waiters for the frame currently requested from `source`
    pending: Option<SmallVec<[FrameWaiter; 4]>>,
}

struct FrameClockInner {
    environments: SlotMap<EnvironmentId, Environment>,
    default_environment: Option<EnvironmentId>,
}

/// Deduplicating front for one or more frame sources
///
/// This is a cheap handle; clones share the same environments and pending
/// requests. All access happens on the thread that drives the frame
/// callbacks.
#[derive(Clone)]
pub struct FrameClock {
    inner: Rc<RefCell<FrameClockInner>>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(FrameClockInner {
                environments: SlotMap::with_key(),
                default_environment: None,
            })),
        }
    }

    /// Register a frame source as a new environment
    ///
    /// The first environment added becomes the default one.
    pub fn add_environment<S>(&self, source: S) -> EnvironmentId
    where
        S: FrameSource + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let id = inner.environments.insert(Environment {
            source: Rc::new(source),
            pending: None,
        });
        if inner.default_environment.is_none() {
            inner.default_environment = Some(id);
        }
        tracing::debug!("FrameClock: added environment {:?}", id);
        id
    }

    /// Unregister an environment
    ///
    /// Waiters for its pending frame run immediately with
    /// [`FrameError::UnknownEnvironment`]; the source's own callback later
    /// fires into nothing.
    pub fn remove_environment(&self, id: EnvironmentId) -> bool {
        let removed = {
            let mut inner = self.inner.borrow_mut();
            if inner.default_environment == Some(id) {
                inner.default_environment = None;
            }
            inner.environments.remove(id)
        };

        let Some(environment) = removed else {
            return false;
        };

        tracing::debug!("FrameClock: removed environment {:?}", id);

        // Borrow released: waiters may call back into the clock
        for waiter in environment.pending.into_iter().flatten() {
            waiter(Err(FrameError::UnknownEnvironment));
        }
        true
    }

    pub fn contains_environment(&self, id: EnvironmentId) -> bool {
        self.inner.borrow().environments.contains_key(id)
    }

    pub fn default_environment(&self) -> Option<EnvironmentId> {
        self.inner.borrow().default_environment
    }

    pub fn set_default_environment(&self, id: EnvironmentId) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        if !inner.environments.contains_key(id) {
            return Err(FrameError::UnknownEnvironment);
        }
        inner.default_environment = Some(id);
        Ok(())
    }

    /// Pick `environment` if given, the default environment otherwise
    pub fn resolve_environment(&self, environment: Option<EnvironmentId>) -> Result<EnvironmentId> {
        match environment {
            Some(id) if self.contains_environment(id) => Ok(id),
            Some(_) => Err(FrameError::UnknownEnvironment),
            None => self.default_environment().ok_or(FrameError::NoEnvironment),
        }
    }

    /// Whether a frame has been requested from this environment's source and not fired yet
    pub fn has_pending_frame(&self, id: EnvironmentId) -> bool {
        self.inner
            .borrow()
            .environments
            .get(id)
            .map(|env| env.pending.is_some())
            .unwrap_or(false)
    }

    /// Wait for the next frame of `environment`
    ///
    /// `waiter` runs once with the frame timestamp. Requests made before the
    /// frame fires share a single registration with the source and all see
    /// the same timestamp, in request order. If the environment is removed
    /// first, `waiter` gets [`FrameError::UnknownEnvironment`] instead.
    pub fn request_frame<F>(&self, environment: EnvironmentId, waiter: F) -> Result<()>
    where
        F: FnOnce(Result<f64>) + 'static,
    {
        let source = {
            let mut inner = self.inner.borrow_mut();
            let env = inner
                .environments
                .get_mut(environment)
                .ok_or(FrameError::UnknownEnvironment)?;

            if let Some(pending) = env.pending.as_mut() {
                pending.push(Box::new(waiter));
                return Ok(());
            }

            let mut waiters: SmallVec<[FrameWaiter; 4]> = SmallVec::new();
            waiters.push(Box::new(waiter));
            env.pending = Some(waiters);
            Rc::clone(&env.source)
        };

        // Borrow released: sources are free to fire synchronously
        let clock = Rc::downgrade(&self.inner);
        source.request_animation_frame(Box::new(move |timestamp| {
            if let Some(inner) = clock.upgrade() {
                FrameClock { inner }.fire(environment, timestamp);
            }
        }));
        Ok(())
    }

    fn fire(&self, environment: EnvironmentId, timestamp: f64) {
        let waiters = self
            .inner
            .borrow_mut()
            .environments
            .get_mut(environment)
            .and_then(|env| env.pending.take());

        if let Some(waiters) = waiters {
            for waiter in waiters {
                waiter(Ok(timestamp));
            }
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

struct ManualFrameSourceInner {
    queue: RefCell<Vec<FrameCallback>>,
    registrations: Cell<usize>,
}

/// A frame source fired explicitly by the host
///
/// Used by headless hosts and tests to step animation deterministically.
/// Clones share the same callback queue.
#[derive(Clone)]
pub struct ManualFrameSource {
    inner: Rc<ManualFrameSourceInner>,
}

impl ManualFrameSource {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(ManualFrameSourceInner {
                queue: RefCell::new(Vec::new()),
                registrations: Cell::new(0),
            }),
        }
    }

    /// Run every callback queued before this call with `timestamp`
    ///
    /// Callbacks registered while firing wait for the next `fire`. Returns
    /// the number of callbacks run.
    pub fn fire(&self, timestamp: f64) -> usize {
        let callbacks = std::mem::take(&mut *self.inner.queue.borrow_mut());
        let count = callbacks.len();
        for callback in callbacks {
            callback(timestamp);
        }
        count
    }

    /// Number of callbacks waiting for the next `fire`
    pub fn queued(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    /// Total number of callbacks ever registered with this source
    pub fn registration_count(&self) -> usize {
        self.inner.registrations.get()
    }
}

impl Default for ManualFrameSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for ManualFrameSource {
    fn request_animation_frame(&self, callback: FrameCallback) {
        self.inner.queue.borrow_mut().push(callback);
        self.inner
            .registrations
            .set(self.inner.registrations.get() + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concurrent_requests_share_one_registration() {
        let source = ManualFrameSource::new();
        let clock = FrameClock::new();
        let env = clock.add_environment(source.clone());

        let first = Rc::new(Cell::new(None));
        let second = Rc::new(Cell::new(None));
        {
            let first = Rc::clone(&first);
            clock.request_frame(env, move |t| first.set(t.ok())).unwrap();
        }
        {
            let second = Rc::clone(&second);
            clock.request_frame(env, move |t| second.set(t.ok())).unwrap();
        }

        assert_eq!(source.registration_count(), 1);
        assert!(clock.has_pending_frame(env));

        assert_eq!(source.fire(33.5), 1);
        assert_eq!(first.get(), Some(33.5));
        assert_eq!(second.get(), Some(33.5));
        assert!(!clock.has_pending_frame(env));
    }

    #[test]
    fn test_request_after_fire_registers_again() {
        let source = ManualFrameSource::new();
        let clock = FrameClock::new();
        let env = clock.add_environment(source.clone());

        clock.request_frame(env, |_| {}).unwrap();
        source.fire(16.0);
        clock.request_frame(env, |_| {}).unwrap();

        assert_eq!(source.registration_count(), 2);
        assert_eq!(source.queued(), 1);
    }

    #[test]
    fn test_waiters_fire_in_request_order() {
        let source = ManualFrameSource::new();
        let clock = FrameClock::new();
        let env = clock.add_environment(source.clone());
        let order = Rc::new(RefCell::new(Vec::new()));

        for i in 0..4 {
            let order = Rc::clone(&order);
            clock
                .request_frame(env, move |_| order.borrow_mut().push(i))
                .unwrap();
        }
        source.fire(1.0);

        assert_eq!(*order.borrow(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_rerequest_from_waiter_waits_for_next_frame() {
        let source = ManualFrameSource::new();
        let clock = FrameClock::new();
        let env = clock.add_environment(source.clone());
        let frames = Rc::new(RefCell::new(Vec::new()));

        {
            let clock_handle = clock.clone();
            let frames = Rc::clone(&frames);
            clock
                .request_frame(env, move |t| {
                    frames.borrow_mut().push(t.unwrap());
                    let frames = Rc::clone(&frames);
                    clock_handle
                        .request_frame(env, move |t| frames.borrow_mut().push(t.unwrap()))
                        .unwrap();
                })
                .unwrap();
        }

        source.fire(10.0);
        assert_eq!(*frames.borrow(), vec![10.0]);
        source.fire(20.0);
        assert_eq!(*frames.borrow(), vec![10.0, 20.0]);
    }

    #[test]
    fn test_environments_are_independent() {
        let main = ManualFrameSource::new();
        let popup = ManualFrameSource::new();
        let clock = FrameClock::new();
        let main_env = clock.add_environment(main.clone());
        let popup_env = clock.add_environment(popup.clone());

        clock.request_frame(main_env, |_| {}).unwrap();
        clock.request_frame(popup_env, |_| {}).unwrap();

        assert_eq!(main.registration_count(), 1);
        assert_eq!(popup.registration_count(), 1);

        main.fire(5.0);
        assert!(!clock.has_pending_frame(main_env));
        assert!(clock.has_pending_frame(popup_env));
    }

    #[test]
    fn test_default_and_unknown_environments() {
        let clock = FrameClock::new();
        assert_eq!(clock.resolve_environment(None), Err(FrameError::NoEnvironment));

        let first = clock.add_environment(ManualFrameSource::new());
        let second = clock.add_environment(ManualFrameSource::new());
        assert_eq!(clock.resolve_environment(None), Ok(first));

        clock.set_default_environment(second).unwrap();
        assert_eq!(clock.resolve_environment(None), Ok(second));

        assert!(clock.remove_environment(second));
        assert_eq!(clock.default_environment(), None);
        assert_eq!(
            clock.resolve_environment(Some(second)),
            Err(FrameError::UnknownEnvironment)
        );
        assert_eq!(
            clock.request_frame(second, |_| {}),
            Err(FrameError::UnknownEnvironment)
        );
    }

    #[test]
    fn test_removed_environment_fails_pending_waiters() {
        let source = ManualFrameSource::new();
        let clock = FrameClock::new();
        let env = clock.add_environment(source.clone());
        let results = Rc::new(RefCell::new(Vec::new()));

        for _ in 0..2 {
            let results = Rc::clone(&results);
            clock
                .request_frame(env, move |t| results.borrow_mut().push(t))
                .unwrap();
        }

        assert!(clock.remove_environment(env));
        assert_eq!(
            *results.borrow(),
            vec![
                Err(FrameError::UnknownEnvironment),
                Err(FrameError::UnknownEnvironment)
            ]
        );

        // The source still holds its callback; firing it reaches nobody
        assert_eq!(source.fire(16.0), 1);
        assert_eq!(results.borrow().len(), 2);
        assert!(!clock.remove_environment(env));
    }

    #[test]
    fn test_waiter_can_request_again_after_removal() {
        let clock = FrameClock::new();
        let env = clock.add_environment(ManualFrameSource::new());
        let retry = Rc::new(Cell::new(None));

        {
            let clock_handle = clock.clone();
            let retry = Rc::clone(&retry);
            clock
                .request_frame(env, move |_| {
                    retry.set(Some(clock_handle.request_frame(env, |_| {})));
                })
                .unwrap();
        }
        clock.remove_environment(env);

        assert_eq!(retry.get(), Some(Err(FrameError::UnknownEnvironment)));
    }
}
