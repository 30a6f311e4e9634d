//! Greedy policy over a reward network

use ndarray::Array2;
use rand::RngCore;

use banditry_core::{
    ActionSpec, BanditError, InfoField, Policy, PolicyInfo, PolicyStep, Result, TimeStep,
};

use crate::network::RewardNetwork;

/// Picks the arm with the highest predicted reward
pub struct GreedyRewardPredictionPolicy {
    network: Box<dyn RewardNetwork>,
    action_spec: ActionSpec,
    accepts_per_arm_features: bool,
    emit_policy_info: Vec<InfoField>,
}

impl GreedyRewardPredictionPolicy {
    /// Create a new greedy policy
    #[must_use]
    pub fn new(
        network: Box<dyn RewardNetwork>,
        action_spec: ActionSpec,
        accepts_per_arm_features: bool,
        emit_policy_info: Vec<InfoField>,
    ) -> Self {
        Self {
            network,
            action_spec,
            accepts_per_arm_features,
            emit_policy_info,
        }
    }

    /// Reward network
    #[must_use]
    pub fn network(&self) -> &dyn RewardNetwork {
        self.network.as_ref()
    }

    /// Mutable reward network, used by the owning agent for training
    pub fn network_mut(&mut self) -> &mut dyn RewardNetwork {
        self.network.as_mut()
    }
}

/// Row-wise argmax; ties go to the lowest index
#[must_use]
pub fn argmax_rows(values: &Array2<f32>) -> Vec<usize> {
    values
        .rows()
        .into_iter()
        .map(|row| {
            let mut best = 0;
            for (k, &v) in row.iter().enumerate() {
                if v > row[best] {
                    best = k;
                }
            }
            best
        })
        .collect()
}

impl Policy for GreedyRewardPredictionPolicy {
    fn action_spec(&self) -> ActionSpec {
        self.action_spec
    }

    fn emit_policy_info(&self) -> &[InfoField] {
        &self.emit_policy_info
    }

    fn action(&self, time_step: &TimeStep, _rng: &mut dyn RngCore) -> Result<PolicyStep> {
        let predictions = self.network.predict(&time_step.observation)?;
        if predictions.ncols() != self.action_spec.num_actions {
            return Err(BanditError::DimensionMismatch {
                expected: self.action_spec.num_actions,
                actual: predictions.ncols(),
            });
        }
        let action = argmax_rows(&predictions);

        let chosen_arm_features = if self.accepts_per_arm_features {
            Some(time_step.observation.arm_features(&action)?)
        } else {
            None
        };
        let predicted_rewards_mean = self
            .emit_policy_info
            .contains(&InfoField::PredictedRewardsMean)
            .then_some(predictions);

        Ok(PolicyStep {
            action,
            info: PolicyInfo {
                predicted_rewards_mean,
                chosen_arm_features,
                bandit_policy_type: None,
            },
        })
    }
}
