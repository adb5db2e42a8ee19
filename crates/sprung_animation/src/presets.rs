//! Spring presets
//!
//! Named configurations for common motion styles. Clamp and precision keep
//! their defaults.

use crate::config::SpringConfig;

/// Names accepted by [`SpringConfig::preset`]
pub const PRESET_NAMES: [&str; 8] = [
    "slow",
    "mellow",
    "rapid",
    "quick",
    "almost_instant",
    "instant",
    "non_overshooting",
    "hide",
];

impl SpringConfig {
    /// Heavy and slow (large surfaces, page transitions)
    pub fn slow() -> Self {
        Self::new(170.0, 50.0, 3.0)
    }

    /// Heavy but responsive, no visible wobble
    pub fn mellow() -> Self {
        Self::new(470.0, 70.0, 3.0)
    }

    /// Light and fast with a little overshoot
    pub fn rapid() -> Self {
        Self::new(530.0, 40.0, 1.0)
    }

    pub fn quick() -> Self {
        Self::new(340.0, 60.0, 3.0)
    }

    pub fn almost_instant() -> Self {
        Self::new(1000.0, 40.0, 1.0)
    }

    /// Zero mass: jumps to the target on the next time step
    pub fn instant() -> Self {
        Self::new(1.0, 1.0, 0.0)
    }

    /// Light mass relative to damping, settles without crossing the target
    pub fn non_overshooting() -> Self {
        Self::new(300.0, 30.0, 0.3)
    }

    /// Fast exit motion for elements being hidden
    pub fn hide() -> Self {
        Self::new(600.0, 50.0, 1.0)
    }

    /// Look up a preset by its snake_case name
    pub fn preset(name: &str) -> Option<Self> {
        let config = match name {
            "slow" => Self::slow(),
            "mellow" => Self::mellow(),
            "rapid" => Self::rapid(),
            "quick" => Self::quick(),
            "almost_instant" => Self::almost_instant(),
            "instant" => Self::instant(),
            "non_overshooting" => Self::non_overshooting(),
            "hide" => Self::hide(),
            _ => return None,
        };
        Some(config)
    }
}
