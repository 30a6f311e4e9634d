//! Environment traits and time steps

use async_trait::async_trait;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::{ActionSpec, PerArmObservation, TimeStepSpec};

/// Position of a time step inside its episode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepType {
    /// First step of an episode, produced by `reset`
    First,
    /// Last step of an episode
    Last,
}

impl StepType {
    /// Whether the step closes an episode
    #[must_use]
    pub fn is_last(&self) -> bool {
        matches!(self, Self::Last)
    }
}

/// Batched output of an environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeStep {
    /// Step type, shared by the whole batch
    pub step_type: StepType,
    /// Reward for the action that led here, one per batch element
    pub reward: Array1<f32>,
    /// Observation to act on next
    pub observation: PerArmObservation,
}

impl TimeStep {
    /// First step of an episode: rewards are zero
    #[must_use]
    pub fn restart(observation: PerArmObservation) -> Self {
        Self {
            step_type: StepType::First,
            reward: Array1::zeros(observation.batch_size()),
            observation,
        }
    }

    /// Final step of an episode
    #[must_use]
    pub fn termination(observation: PerArmObservation, reward: Array1<f32>) -> Self {
        Self {
            step_type: StepType::Last,
            reward,
            observation,
        }
    }

    /// Number of batch elements
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.observation.batch_size()
    }
}

/// Core environment trait
///
/// A bandit environment is a sequence of one-step episodes: every call to
/// `step` scores the given actions against the current observation and then
/// samples a fresh one.
#[async_trait]
pub trait Environment: Send + Sync {
    /// Spec of emitted time steps
    fn time_step_spec(&self) -> TimeStepSpec;

    /// Spec of accepted actions
    fn action_spec(&self) -> ActionSpec;

    /// Number of parallel batch elements
    fn batch_size(&self) -> usize;

    /// Reset the environment
    async fn reset(&mut self) -> crate::Result<TimeStep>;

    /// Apply one action per batch element
    async fn step(&mut self, actions: &[usize]) -> crate::Result<TimeStep>;

    /// Close the environment
    async fn close(&mut self) -> crate::Result<()> {
        Ok(())
    }
}
