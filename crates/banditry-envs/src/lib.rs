//! Contextual bandit environments
//!
//! This crate provides synthetic environments for evaluating bandit agents:
//! - Stationary stochastic per-arm environments
//! - Linear reward functions with Gaussian noise

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod per_arm;

// Re-export environments
pub use per_arm::{ContextSampler, LinearNormalReward, StationaryStochasticPerArmEnvironment};

// Re-export core types
pub use banditry_core::{
    ActionSpec, Environment, ObservationSpec, PerArmObservation, Reward, RewardFunction,
    TimeStep, TimeStepSpec,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{LinearNormalReward, StationaryStochasticPerArmEnvironment};
    pub use banditry_core::prelude::*;
}
