//! Core contextual bandit traits and types
//!
//! This crate provides the foundational abstractions shared by bandit
//! environments, agents and trainers: specs, per-arm observations, time
//! steps, trajectories, and the `Environment`, `Policy` and `Agent` traits.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod action;
pub mod agent;
pub mod environment;
pub mod error;
pub mod observation;
pub mod policy;
pub mod reward;
pub mod trajectory;

// Re-export core traits and types
pub use action::ActionSpec;
pub use agent::{Agent, AgentMetrics, LossInfo};
pub use environment::{Environment, StepType, TimeStep};
pub use error::{BanditError, Result};
pub use observation::{ObservationSpec, PerArmObservation, TimeStepSpec};
pub use policy::{
    BanditPolicyType, EpsilonGreedyPolicy, InfoField, Policy, PolicyInfo, PolicyStep,
    RandomPolicy,
};
pub use reward::{Reward, RewardFunction};
pub use trajectory::{drop_arm_features_fn, Trajectory, TrajectoryTransform};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        ActionSpec, Agent, Environment, ObservationSpec, PerArmObservation, Policy, Result,
        TimeStep, TimeStepSpec, Trajectory,
    };
}
