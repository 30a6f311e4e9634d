//! Action specification for bandit problems

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::{BanditError, Result};

/// Bounded scalar action spec: an action is an arm index in `[0, num_actions)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpec {
    /// Number of arms
    pub num_actions: usize,
}

impl ActionSpec {
    /// Create a new action spec with `num_actions` arms
    pub fn new(num_actions: usize) -> Result<Self> {
        if num_actions == 0 {
            return Err(BanditError::InvalidParameter(
                "action spec needs at least one action".to_string(),
            ));
        }
        Ok(Self { num_actions })
    }

    /// Smallest valid action
    #[must_use]
    pub fn minimum(&self) -> usize {
        0
    }

    /// Largest valid action
    #[must_use]
    pub fn maximum(&self) -> usize {
        self.num_actions - 1
    }

    /// Check if an action is within bounds
    #[must_use]
    pub fn contains(&self, action: usize) -> bool {
        action < self.num_actions
    }

    /// Check every action of a batch, failing on the first out-of-range one
    pub fn check(&self, actions: &[usize]) -> Result<()> {
        match actions.iter().find(|&&a| !self.contains(a)) {
            Some(a) => Err(BanditError::InvalidAction(format!(
                "action {a} outside [0, {})",
                self.num_actions
            ))),
            None => Ok(()),
        }
    }

    /// Sample an action uniformly at random
    pub fn sample(&self, rng: &mut dyn RngCore) -> usize {
        rng.gen_range(0..self.num_actions)
    }
}
