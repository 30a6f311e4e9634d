//! Trajectories collected from bandit environments

use std::sync::Arc;

use ndarray::{concatenate, Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::{BanditError, PerArmObservation, PolicyInfo, PolicyStep, TimeStep};

/// Function applied to trajectories before they reach the training buffer
pub type TrajectoryTransform = Arc<dyn Fn(Trajectory) -> Trajectory + Send + Sync>;

/// Batched record of one bandit interaction
///
/// Row `b` pairs the observation the policy acted on, the arm it chose, and
/// the reward the environment returned for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    /// Observation the action was chosen for
    pub observation: PerArmObservation,
    /// Chosen arm per batch element
    pub action: Vec<usize>,
    /// Reward received per batch element
    pub reward: Array1<f32>,
    /// Policy side information
    pub policy_info: PolicyInfo,
}

impl Trajectory {
    /// Build a trajectory from a transition
    pub fn from_transition(
        time_step: &TimeStep,
        policy_step: &PolicyStep,
        next_time_step: &TimeStep,
    ) -> crate::Result<Self> {
        let batch = time_step.batch_size();
        if policy_step.action.len() != batch {
            return Err(BanditError::DimensionMismatch {
                expected: batch,
                actual: policy_step.action.len(),
            });
        }
        if next_time_step.reward.len() != batch {
            return Err(BanditError::DimensionMismatch {
                expected: batch,
                actual: next_time_step.reward.len(),
            });
        }

        Ok(Self {
            observation: time_step.observation.clone(),
            action: policy_step.action.clone(),
            reward: next_time_step.reward.clone(),
            policy_info: policy_step.info.clone(),
        })
    }

    /// Number of batch elements
    #[must_use]
    pub fn len(&self) -> usize {
        self.action.len()
    }

    /// Check if the trajectory is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.action.is_empty()
    }

    /// Copy of the trajectory with per-arm observation features removed
    ///
    /// Chosen arm features in the policy info are kept, so a per-arm agent
    /// can still train on the result.
    #[must_use]
    pub fn drop_arm_features(mut self) -> Self {
        self.observation.per_arm = None;
        self
    }

    /// Concatenate trajectories along the batch axis
    pub fn concatenate(parts: &[Trajectory]) -> crate::Result<Self> {
        if parts.is_empty() {
            return Err(BanditError::EmptyExperience);
        }

        let observations: Vec<_> = parts.iter().map(|t| &t.observation).collect();
        let observation = PerArmObservation::concatenate(&observations)?;

        let action = parts.iter().flat_map(|t| t.action.iter().copied()).collect();

        let rewards: Vec<_> = parts.iter().map(|t| t.reward.view()).collect();
        let reward = concatenate(Axis(0), &rewards)
            .map_err(|e| BanditError::Computation(format!("rewards: {e}")))?;

        let policy_info = PolicyInfo {
            predicted_rewards_mean: concat_optional(
                parts.iter().map(|t| t.policy_info.predicted_rewards_mean.as_ref()),
            )?,
            chosen_arm_features: concat_optional(
                parts.iter().map(|t| t.policy_info.chosen_arm_features.as_ref()),
            )?,
            bandit_policy_type: parts
                .iter()
                .map(|t| t.policy_info.bandit_policy_type.clone())
                .collect::<Option<Vec<_>>>()
                .map(|v| v.concat()),
        };

        Ok(Self {
            observation,
            action,
            reward,
            policy_info,
        })
    }
}

/// Stack optional matrices row-wise; `None` if any part is missing
fn concat_optional<'a>(
    parts: impl Iterator<Item = Option<&'a Array2<f32>>>,
) -> crate::Result<Option<Array2<f32>>> {
    let Some(parts) = parts.collect::<Option<Vec<_>>>() else {
        return Ok(None);
    };
    let views: Vec<_> = parts.iter().map(|m| m.view()).collect();
    concatenate(Axis(0), &views)
        .map(Some)
        .map_err(|e| BanditError::Computation(format!("policy info: {e}")))
}

/// Transformation that strips per-arm features from every trajectory
#[must_use]
pub fn drop_arm_features_fn() -> TrajectoryTransform {
    Arc::new(Trajectory::drop_arm_features)
}
