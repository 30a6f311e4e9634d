//! Neural contextual bandit agents
//!
//! This crate provides:
//! - Reward networks (common tower and dot product) with hand-written backprop
//! - Adam and SGD optimizers over flat parameter vectors
//! - A greedy reward-prediction policy
//! - `NeuralEpsilonGreedyAgent`
//! - A trajectory buffer for on-policy training

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod buffer;
pub mod greedy;
pub mod network;
pub mod neural_epsilon_greedy;
pub mod optimizer;

// Re-export agents
pub use neural_epsilon_greedy::{NeuralEpsilonGreedyAgent, NeuralEpsilonGreedyConfig};

// Re-export networks and optimizers
pub use network::{Activation, CommonTowerNetwork, Dense, DotProductNetwork, RewardNetwork, Tower};
pub use optimizer::{clip_by_global_norm, Adam, Optimizer, OptimizerState, Sgd};

// Re-export policy and buffer components
pub use buffer::TrajectoryBuffer;
pub use greedy::{argmax_rows, GreedyRewardPredictionPolicy};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Adam, CommonTowerNetwork, DotProductNetwork, NeuralEpsilonGreedyAgent,
        NeuralEpsilonGreedyConfig, RewardNetwork, TrajectoryBuffer,
    };
    pub use banditry_core::prelude::*;
}
