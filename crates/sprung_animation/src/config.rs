//! Spring configuration
//!
//! [`SpringConfig`] is the fully resolved parameter set a spring simulates
//! with. [`SpringConfigInput`] is the partial form callers pass around: every
//! field is optional and missing fields fall back to the defaults (on
//! creation) or to the spring's current values (on update).
//!
//! The recognized options are exactly `stiffness`, `damping`, `mass`,
//! `clamp` and `precision`. Deserializing an input with any other field
//! fails with [`ConfigError::Parse`].
//!
//! ```rust
//! use sprung_animation::{SpringConfig, SpringConfigInput};
//!
//! let input = SpringConfigInput::new().stiffness(500.0).clamp(true);
//! let config = SpringConfig::resolve(&input).unwrap();
//!
//! assert_eq!(config.stiffness, 500.0);
//! assert_eq!(config.damping, 30.0);
//! assert!(config.clamp);
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Configuration for a spring animation
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpringConfig {
    /// Pull toward the target: force = distance to target * stiffness
    pub stiffness: f64,
    /// Resistance to movement: force = velocity * damping
    pub damping: f64,
    /// Inertia. A mass of 0 makes the spring jump straight to its target
    pub mass: f64,
    /// Never overshoot: stop at the target the moment the value crosses it
    pub clamp: bool,
    /// Base snap tolerance, scaled by the size of each target change
    pub precision: f64,
}

impl SpringConfig {
    /// Create a config from the physical parameters, with default clamp and precision
    pub fn new(stiffness: f64, damping: f64, mass: f64) -> Self {
        Self {
            stiffness,
            damping,
            mass,
            ..Self::default()
        }
    }

    pub fn with_clamp(mut self, clamp: bool) -> Self {
        self.clamp = clamp;
        self
    }

    pub fn with_precision(mut self, precision: f64) -> Self {
        self.precision = precision;
        self
    }

    /// Merge `input` over the defaults and validate the result
    pub fn resolve(input: &SpringConfigInput) -> Result<Self, ConfigError> {
        let config = Self::default().merge(input);
        config.validate()?;
        Ok(config)
    }

    /// Overlay the fields present in `input`, without validating
    pub fn merge(&self, input: &SpringConfigInput) -> Self {
        Self {
            stiffness: input.stiffness.unwrap_or(self.stiffness),
            damping: input.damping.unwrap_or(self.damping),
            mass: input.mass.unwrap_or(self.mass),
            clamp: input.clamp.unwrap_or(self.clamp),
            precision: input.precision.unwrap_or(self.precision),
        }
    }

    /// Check the parameter bounds
    ///
    /// Mass must be `>= 0`, stiffness and precision `> 0`. Damping is
    /// unbounded. Every numeric field must be finite.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("stiffness", self.stiffness),
            ("damping", self.damping),
            ("mass", self.mass),
            ("precision", self.precision),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { field });
            }
        }

        if self.mass < 0.0 {
            return Err(ConfigError::NegativeMass(self.mass));
        }

        if self.stiffness <= 0.0 {
            return Err(ConfigError::NonPositiveStiffness(self.stiffness));
        }

        if self.precision <= 0.0 {
            return Err(ConfigError::NonPositivePrecision(self.precision));
        }

        Ok(())
    }

    /// Calculate critical damping for this spring's stiffness and mass
    pub fn critical_damping(&self) -> f64 {
        2.0 * (self.stiffness * self.mass).sqrt()
    }

    /// Check if the spring is underdamped (will oscillate)
    pub fn is_underdamped(&self) -> bool {
        self.damping < self.critical_damping()
    }

    /// Check if the spring is overdamped (slow settling, no oscillation)
    pub fn is_overdamped(&self) -> bool {
        self.damping > self.critical_damping()
    }
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self {
            stiffness: 300.0,
            damping: 30.0,
            mass: 1.0,
            clamp: false,
            precision: 0.002,
        }
    }
}

/// Merge `input` over the default config and validate it
pub fn resolve(input: &SpringConfigInput) -> Result<SpringConfig, ConfigError> {
    SpringConfig::resolve(input)
}

/// A partial spring configuration
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpringConfigInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stiffness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damping: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mass: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clamp: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<f64>,
}

impl SpringConfigInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stiffness(mut self, stiffness: f64) -> Self {
        self.stiffness = Some(stiffness);
        self
    }

    pub fn damping(mut self, damping: f64) -> Self {
        self.damping = Some(damping);
        self
    }

    pub fn mass(mut self, mass: f64) -> Self {
        self.mass = Some(mass);
        self
    }

    pub fn clamp(mut self, clamp: bool) -> Self {
        self.clamp = Some(clamp);
        self
    }

    pub fn precision(mut self, precision: f64) -> Self {
        self.precision = Some(precision);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Parse an input from a TOML table
    ///
    /// ```rust
    /// use sprung_animation::SpringConfigInput;
    ///
    /// let input = SpringConfigInput::from_toml_str("stiffness = 170.0\nmass = 3.0").unwrap();
    /// assert_eq!(input.stiffness, Some(170.0));
    /// assert_eq!(input.damping, None);
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Parse an input from a JSON object
    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

impl From<SpringConfig> for SpringConfigInput {
    fn from(config: SpringConfig) -> Self {
        Self {
            stiffness: Some(config.stiffness),
            damping: Some(config.damping),
            mass: Some(config.mass),
            clamp: Some(config.clamp),
            precision: Some(config.precision),
        }
    }
}
