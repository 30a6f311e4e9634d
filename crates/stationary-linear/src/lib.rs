//! Per-arm stationary linear bandit experiment
//!
//! A neural epsilon-greedy agent learns to pick among arms whose expected
//! reward is linear in the global context concatenated with the arm context.
//! Regret and the rate of suboptimal arms are measured against a noise-free
//! oracle.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod experiment;
pub mod oracle;

pub use config::{ExperimentConfig, NetworkKind};
pub use experiment::run;
pub use oracle::{all_rewards, optimal_action, optimal_reward};
