//! Spring registry
//!
//! Holds the [`AutoSpring`]s of one animated target, keyed by property name
//! and index. A property can own several springs (for example one per
//! component of a transform), addressed by their position in the order the
//! binding layer asks for them.
//!
//! ```rust
//! use sprung_animation::SpringRegistry;
//! use sprung_core::{FrameClock, ManualFrameSource};
//!
//! let source = ManualFrameSource::new();
//! let clock = FrameClock::new();
//! clock.add_environment(source.clone());
//!
//! let mut registry = SpringRegistry::new(clock, None);
//!
//! // First request creates the spring at its target
//! assert_eq!(registry.spring_value("opacity", 0, 1.0, None).unwrap(), 1.0);
//!
//! // Later requests retarget it and return the current (animated) value
//! assert_eq!(registry.spring_value("opacity", 0, 0.0, None).unwrap(), 1.0);
//! assert!(registry.is_animating());
//! ```

use crate::config::SpringConfigInput;
use crate::driver::AutoSpring;
use crate::error::Result;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use sprung_core::{EnvironmentId, FrameClock};

type PropertySprings = SmallVec<[(usize, AutoSpring); 2]>;

/// Springs of a single animated target
pub struct SpringRegistry {
    clock: FrameClock,
    environment: Option<EnvironmentId>,
    springs: FxHashMap<String, PropertySprings>,
}

impl SpringRegistry {
    /// `environment` is the frame environment the target lives in; `None`
    /// uses the clock's default.
    pub fn new(clock: FrameClock, environment: Option<EnvironmentId>) -> Self {
        Self {
            clock,
            environment,
            springs: FxHashMap::default(),
        }
    }

    /// Drive spring `(property, index)` toward `target` and return its current value
    ///
    /// The spring is created resting at `target` on first use. Afterwards
    /// each call retargets it and merges `config` over its current config.
    pub fn spring_value(
        &mut self,
        property: &str,
        index: usize,
        target: f64,
        config: Option<&SpringConfigInput>,
    ) -> Result<f64> {
        let config = config.copied().unwrap_or_default();

        if let Some(spring) = self.get(property, index) {
            spring.set_target_with_config(target, &config)?;
            return Ok(spring.value());
        }

        let spring = AutoSpring::new(target, config, &self.clock, self.environment)?;
        let value = spring.value();
        self.springs
            .entry(property.to_string())
            .or_default()
            .push((index, spring));
        Ok(value)
    }

    pub fn get(&self, property: &str, index: usize) -> Option<&AutoSpring> {
        self.springs
            .get(property)?
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, spring)| spring)
    }

    /// Number of springs across all properties
    pub fn len(&self) -> usize {
        self.springs.values().map(|springs| springs.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether any spring is still moving
    pub fn is_animating(&self) -> bool {
        self.springs
            .values()
            .flat_map(|springs| springs.iter())
            .any(|(_, spring)| spring.is_animating())
    }

    /// Destroy and forget every spring of `property`
    pub fn remove_property(&mut self, property: &str) -> bool {
        match self.springs.remove(property) {
            Some(springs) => {
                for (_, spring) in &springs {
                    spring.destroy();
                }
                true
            }
            None => false,
        }
    }

    /// Destroy and forget every spring, e.g. when the target is removed
    pub fn clear(&mut self) {
        for (_, springs) in self.springs.drain() {
            for (_, spring) in &springs {
                spring.destroy();
            }
        }
    }
}
