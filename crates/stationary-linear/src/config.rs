//! Experiment configuration

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Batch size of the environment
pub const BATCH_SIZE: usize = 16;
/// Number of arms
pub const NUM_ACTIONS: usize = 7;
/// Coefficients of the linear reward over global ++ arm features
pub const HIDDEN_PARAM: [f32; 9] = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
/// Number of collect-and-train loops
pub const TRAINING_LOOPS: usize = 2000;
/// Environment steps per loop
pub const STEPS_PER_LOOP: usize = 2;
/// Exploration rate
pub const EPSILON: f64 = 0.01;
/// Adam learning rate
pub const LR: f32 = 0.05;
/// Length of the global context
pub const GLOBAL_DIM: usize = 4;
/// Length of each arm context
pub const PER_ARM_DIM: usize = 5;

/// Reward network architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NetworkKind {
    /// Global and arm towers feeding a common tower
    #[default]
    #[value(name = "commontower")]
    CommonTower,
    /// Dot product of global and arm tower outputs
    #[value(name = "dotproduct")]
    DotProduct,
}

impl std::fmt::Display for NetworkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CommonTower => write!(f, "commontower"),
            Self::DotProduct => write!(f, "dotproduct"),
        }
    }
}

/// Full configuration of one experiment run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Reward network architecture
    pub network: NetworkKind,
    /// Remove per-arm observations from training trajectories
    pub drop_arm_obs: bool,
    /// Environment batch size
    pub batch_size: usize,
    /// Number of arms
    pub num_actions: usize,
    /// Linear reward coefficients
    pub hidden_param: Vec<f32>,
    /// Number of training loops
    pub training_loops: usize,
    /// Environment steps per loop
    pub steps_per_loop: usize,
    /// Exploration rate
    pub epsilon: f64,
    /// Adam learning rate
    pub learning_rate: f32,
    /// Global context length
    pub global_dim: usize,
    /// Arm context length
    pub per_arm_dim: usize,
    /// Global tower widths of the common-tower network
    pub common_tower_global_layers: Vec<usize>,
    /// Arm tower widths of the common-tower network
    pub common_tower_arm_layers: Vec<usize>,
    /// Common tower widths of the common-tower network
    pub common_tower_common_layers: Vec<usize>,
    /// Global tower widths of the dot-product network
    pub dot_product_global_layers: Vec<usize>,
    /// Arm tower widths of the dot-product network
    pub dot_product_arm_layers: Vec<usize>,
    /// Checkpoint every this many loops
    pub checkpoint_interval: usize,
    /// Seed for every random source; entropy when unset
    pub seed: Option<u64>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            network: NetworkKind::default(),
            drop_arm_obs: false,
            batch_size: BATCH_SIZE,
            num_actions: NUM_ACTIONS,
            hidden_param: HIDDEN_PARAM.to_vec(),
            training_loops: TRAINING_LOOPS,
            steps_per_loop: STEPS_PER_LOOP,
            epsilon: EPSILON,
            learning_rate: LR,
            global_dim: GLOBAL_DIM,
            per_arm_dim: PER_ARM_DIM,
            common_tower_global_layers: vec![4, 3],
            common_tower_arm_layers: vec![3, 4],
            common_tower_common_layers: vec![4, 2],
            dot_product_global_layers: vec![4, 3, 6],
            dot_product_arm_layers: vec![3, 4, 6],
            checkpoint_interval: 100,
            seed: None,
        }
    }
}

impl ExperimentConfig {
    /// Default configuration with the given network and arm-dropping choice
    #[must_use]
    pub fn new(network: NetworkKind, drop_arm_obs: bool) -> Self {
        Self {
            network,
            drop_arm_obs,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExperimentConfig::default();
        assert_eq!(config.network, NetworkKind::CommonTower);
        assert!(!config.drop_arm_obs);
        assert_eq!(config.hidden_param.len(), config.global_dim + config.per_arm_dim);
        assert_eq!(config.training_loops, 2000);
        assert_eq!(config.steps_per_loop, 2);
        assert_eq!(config.batch_size, 16);
        assert_eq!(config.num_actions, 7);
    }

    #[test]
    fn test_json_fills_missing_fields() {
        let config: ExperimentConfig =
            serde_json::from_str(r#"{"network": "dotproduct", "seed": 7}"#).unwrap();
        assert_eq!(config.network, NetworkKind::DotProduct);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.dot_product_arm_layers, vec![3, 4, 6]);
    }

    #[test]
    fn test_network_names() {
        assert_eq!(NetworkKind::CommonTower.to_string(), "commontower");
        assert_eq!(
            NetworkKind::from_str("dotproduct", false).unwrap(),
            NetworkKind::DotProduct
        );
        assert!(NetworkKind::from_str("rnn", false).is_err());
    }
}
