//! Sprung Core Runtime
//!
//! Foundational primitives shared by the Sprung animation crates:
//!
//! - **Change Channels**: Snapshot-iterating multi-subscriber fan-out
//! - **Frame Clocks**: Per-environment deduplication of frame requests
//! - **Manual Frame Sources**: Deterministic frames for headless hosts and tests
//!
//! Everything here is single-threaded. Frame callbacks, emits and spring
//! updates all run on the thread that owns the host's frame clock.

pub mod channel;
pub mod error;
pub mod frame;

pub use channel::{Channel, Subscription, SubscriptionId};
pub use error::{FrameError, Result};
pub use frame::{
    EnvironmentId, FrameCallback, FrameClock, FrameSource, FrameWaiter, ManualFrameSource,
};
