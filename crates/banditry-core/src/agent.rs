//! Agent traits and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{ActionSpec, ObservationSpec, Policy, TimeStepSpec, Trajectory};

/// Losses reported by one training step
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LossInfo {
    /// Total loss
    pub loss: f32,
    /// Reward prediction error
    pub error_loss: f32,
    /// Weight regularization term
    pub regularization_loss: f32,
}

/// Agent metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentMetrics {
    /// Number of training steps taken
    pub train_steps: u64,
    /// Number of trajectory rows trained on
    pub samples_seen: u64,
    /// Most recent loss
    pub loss: Option<f32>,
    /// Additional metrics
    #[serde(flatten)]
    pub custom: serde_json::Map<String, serde_json::Value>,
}

/// Core agent trait
#[async_trait]
pub trait Agent: Send + Sync {
    /// Spec of the time steps the agent acts on
    fn time_step_spec(&self) -> TimeStepSpec;

    /// Spec of the actions it emits
    fn action_spec(&self) -> ActionSpec;

    /// Spec of the observations it expects at training time
    fn training_data_spec(&self) -> ObservationSpec;

    /// Policy used for evaluation
    fn policy(&self) -> &dyn Policy;

    /// Policy used to collect experience
    fn collect_policy(&self) -> &dyn Policy {
        self.policy()
    }

    /// Train on a batch of experience
    async fn train(&mut self, experience: &Trajectory) -> crate::Result<LossInfo>;

    /// Number of completed training steps
    fn train_step_counter(&self) -> u64;

    /// Save the agent
    async fn save(&self, path: &std::path::Path) -> crate::Result<()>;

    /// Load the agent
    async fn load(&mut self, path: &std::path::Path) -> crate::Result<()>;

    /// Get agent metrics
    fn metrics(&self) -> AgentMetrics {
        AgentMetrics::default()
    }
}
