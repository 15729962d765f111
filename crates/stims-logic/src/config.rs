//! Runtime tunables shared by the recorder, scheduler and host.

use serde::{Deserialize, Serialize};

use crate::constants::{MAX_STACK_SIZE, TICKS_PER_SECOND};
use crate::error::StimError;

/// Configuration for a stims runtime. Missing JSON fields take defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StimsConfig {
    /// World ticks per simulated second.
    pub ticks_per_second: u64,
    /// Maximum items per stim stack.
    pub max_stack_size: u32,
    /// Seed for one-of branch draws (`None` = seeded from entropy).
    pub rng_seed: Option<u64>,
}

impl Default for StimsConfig {
    fn default() -> Self {
        Self {
            ticks_per_second: TICKS_PER_SECOND,
            max_stack_size: MAX_STACK_SIZE,
            rng_seed: None,
        }
    }
}

impl StimsConfig {
    pub fn from_json(json: &str) -> Result<Self, StimError> {
        let config: StimsConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no runtime can work with. A zero tick rate would make
    /// every delay and duration zero ticks long.
    pub fn validate(&self) -> Result<(), StimError> {
        if self.ticks_per_second == 0 {
            return Err(StimError::Catalog(
                "ticks_per_second must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }
}
