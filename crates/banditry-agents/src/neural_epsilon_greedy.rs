//! Neural epsilon-greedy agent
//!
//! The agent fits a reward network to observed rewards and acts greedily
//! with respect to its predictions, exploring uniformly with probability
//! `epsilon`. Evaluation and collection use the same exploring policy.

use std::path::Path;

use async_trait::async_trait;
use ndarray::{Array1, Array2, Array3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use banditry_core::{
    ActionSpec, Agent, AgentMetrics, BanditError, EpsilonGreedyPolicy, InfoField, LossInfo,
    ObservationSpec, PerArmObservation, Policy, PolicyInfo, Result, TimeStepSpec, Trajectory,
    TrajectoryTransform,
};

use crate::greedy::GreedyRewardPredictionPolicy;
use crate::network::RewardNetwork;
use crate::optimizer::{clip_by_global_norm, Optimizer, OptimizerState};

/// Neural epsilon-greedy configuration
#[derive(Clone)]
pub struct NeuralEpsilonGreedyConfig {
    /// Exploration rate
    pub epsilon: f64,
    /// Train on the chosen arm's features instead of the arm index
    pub accepts_per_arm_features: bool,
    /// Transformation applied to trajectories before they reach the agent
    pub training_data_spec_transformation_fn: Option<TrajectoryTransform>,
    /// Side information the policies attach to actions
    pub emit_policy_info: Vec<InfoField>,
    /// Clip gradients to this global norm
    pub gradient_clipping: Option<f32>,
}

impl Default for NeuralEpsilonGreedyConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.1,
            accepts_per_arm_features: false,
            training_data_spec_transformation_fn: None,
            emit_policy_info: Vec::new(),
            gradient_clipping: None,
        }
    }
}

impl std::fmt::Debug for NeuralEpsilonGreedyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NeuralEpsilonGreedyConfig")
            .field("epsilon", &self.epsilon)
            .field("accepts_per_arm_features", &self.accepts_per_arm_features)
            .field(
                "training_data_spec_transformation_fn",
                &self.training_data_spec_transformation_fn.is_some(),
            )
            .field("emit_policy_info", &self.emit_policy_info)
            .field("gradient_clipping", &self.gradient_clipping)
            .finish()
    }
}

/// On-disk form of a trained agent
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AgentCheckpoint {
    network: String,
    parameters: Vec<f32>,
    optimizer: OptimizerState,
    train_step: u64,
    epsilon: f64,
}

/// Epsilon-greedy agent backed by a reward network
pub struct NeuralEpsilonGreedyAgent {
    time_step_spec: TimeStepSpec,
    action_spec: ActionSpec,
    training_data_spec: ObservationSpec,
    policy: EpsilonGreedyPolicy<GreedyRewardPredictionPolicy>,
    optimizer: Box<dyn Optimizer>,
    accepts_per_arm_features: bool,
    gradient_clipping: Option<f32>,
    train_step: u64,
    samples_seen: u64,
    last_loss: Option<f32>,
}

impl NeuralEpsilonGreedyAgent {
    /// Create a new agent
    pub fn new(
        time_step_spec: TimeStepSpec,
        action_spec: ActionSpec,
        network: Box<dyn RewardNetwork>,
        optimizer: Box<dyn Optimizer>,
        config: NeuralEpsilonGreedyConfig,
    ) -> Result<Self> {
        let observation_spec = time_step_spec.observation;
        if action_spec.num_actions == 0 {
            return Err(BanditError::InvalidParameter(
                "num_actions must be at least 1".to_string(),
            ));
        }
        if observation_spec.num_actions != action_spec.num_actions {
            return Err(BanditError::DimensionMismatch {
                expected: action_spec.num_actions,
                actual: observation_spec.num_actions,
            });
        }
        if config.accepts_per_arm_features && observation_spec.per_arm_dim.is_none() {
            return Err(BanditError::MissingFeature(
                "per-arm agent needs per-arm features in the observation spec".to_string(),
            ));
        }
        let input_spec = network.input_spec();
        if input_spec.global_dim != observation_spec.global_dim
            || input_spec.per_arm_dim != observation_spec.per_arm_dim
        {
            return Err(BanditError::InvalidParameter(format!(
                "network input {input_spec:?} does not match observation {observation_spec:?}"
            )));
        }

        let training_data_spec = match &config.training_data_spec_transformation_fn {
            Some(transform) => transformed_spec(&observation_spec, transform)?,
            None => observation_spec,
        };

        let greedy = GreedyRewardPredictionPolicy::new(
            network,
            action_spec,
            config.accepts_per_arm_features,
            config.emit_policy_info,
        );
        let policy = EpsilonGreedyPolicy::new(greedy, config.epsilon)?;

        Ok(Self {
            time_step_spec,
            action_spec,
            training_data_spec,
            policy,
            optimizer,
            accepts_per_arm_features: config.accepts_per_arm_features,
            gradient_clipping: config.gradient_clipping,
            train_step: 0,
            samples_seen: 0,
            last_loss: None,
        })
    }

    /// Exploration rate
    #[must_use]
    pub fn epsilon(&self) -> f64 {
        self.policy.epsilon
    }

    /// Reward network
    #[must_use]
    pub fn network(&self) -> &dyn RewardNetwork {
        self.policy.policy.network()
    }

    /// Observation and target columns the network is fitted on
    fn training_inputs(&self, experience: &Trajectory) -> Result<(PerArmObservation, Vec<usize>)> {
        if !self.accepts_per_arm_features {
            return Ok((experience.observation.clone(), experience.action.clone()));
        }

        let chosen = experience
            .policy_info
            .chosen_arm_features
            .as_ref()
            .ok_or_else(|| {
                BanditError::MissingFeature("chosen arm features in policy info".to_string())
            })?;
        let (rows, dim) = chosen.dim();
        let per_arm = Array3::from_shape_vec((rows, 1, dim), chosen.iter().copied().collect())
            .map_err(|e| BanditError::Computation(e.to_string()))?;
        let observation = PerArmObservation::new(experience.observation.global.clone(), Some(per_arm))?;
        Ok((observation, vec![0; rows]))
    }
}

/// Spec of the trajectories the agent trains on, found by running the
/// transformation on a zero-valued probe
fn transformed_spec(spec: &ObservationSpec, transform: &TrajectoryTransform) -> Result<ObservationSpec> {
    let per_arm = spec
        .per_arm_dim
        .map(|dim| Array3::zeros((1, spec.num_actions, dim)));
    let probe = Trajectory {
        observation: PerArmObservation::new(Array2::zeros((1, spec.global_dim)), per_arm)?,
        action: vec![0],
        reward: Array1::zeros(1),
        policy_info: PolicyInfo::default(),
    };
    let transformed = transform(probe);
    Ok(ObservationSpec {
        global_dim: transformed.observation.global.ncols(),
        per_arm_dim: transformed.observation.per_arm.as_ref().map(|a| a.dim().2),
        num_actions: spec.num_actions,
    })
}

#[async_trait]
impl Agent for NeuralEpsilonGreedyAgent {
    fn time_step_spec(&self) -> TimeStepSpec {
        self.time_step_spec
    }

    fn action_spec(&self) -> ActionSpec {
        self.action_spec
    }

    fn training_data_spec(&self) -> ObservationSpec {
        self.training_data_spec
    }

    /// Epsilon-greedy for both evaluation and collection
    fn policy(&self) -> &dyn Policy {
        &self.policy
    }

    async fn train(&mut self, experience: &Trajectory) -> Result<LossInfo> {
        if experience.is_empty() {
            return Err(BanditError::EmptyExperience);
        }
        if experience.reward.len() != experience.len() {
            return Err(BanditError::DimensionMismatch {
                expected: experience.len(),
                actual: experience.reward.len(),
            });
        }
        self.action_spec.check(&experience.action)?;

        let (observation, columns) = self.training_inputs(experience)?;
        let predictions = self.network().predict(&observation)?;

        let n = experience.len() as f32;
        let mut grad_predictions = Array2::zeros(predictions.dim());
        let mut error_loss = 0.0;
        for (row, (&column, &reward)) in columns.iter().zip(experience.reward.iter()).enumerate() {
            let diff = predictions[[row, column]] - reward;
            error_loss += diff * diff;
            grad_predictions[[row, column]] = 2.0 * diff / n;
        }
        error_loss /= n;

        let mut grads = self.network().backward(&observation, &grad_predictions)?;
        if let Some(clip_norm) = self.gradient_clipping {
            let norm = clip_by_global_norm(&mut grads, clip_norm);
            debug!(norm, clip_norm, "clipped gradients");
        }

        let network = self.policy.policy_mut().network_mut();
        let mut params = network.parameters();
        self.optimizer.apply_gradients(&mut params, &grads)?;
        network.set_parameters(&params)?;

        self.train_step += 1;
        self.samples_seen += experience.len() as u64;
        self.last_loss = Some(error_loss);
        debug!(
            train_step = self.train_step,
            loss = error_loss,
            rows = experience.len(),
            "trained reward network"
        );

        Ok(LossInfo {
            loss: error_loss,
            error_loss,
            regularization_loss: 0.0,
        })
    }

    fn train_step_counter(&self) -> u64 {
        self.train_step
    }

    async fn save(&self, path: &Path) -> Result<()> {
        let checkpoint = AgentCheckpoint {
            network: self.network().name().to_string(),
            parameters: self.network().parameters(),
            optimizer: self.optimizer.state(),
            train_step: self.train_step,
            epsilon: self.policy.epsilon,
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(&checkpoint)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    async fn load(&mut self, path: &Path) -> Result<()> {
        let json = tokio::fs::read_to_string(path).await?;
        let checkpoint: AgentCheckpoint = serde_json::from_str(&json)?;

        if checkpoint.network != self.network().name() {
            return Err(BanditError::Agent(format!(
                "checkpoint holds a {} network, agent uses {}",
                checkpoint.network,
                self.network().name()
            )));
        }
        self.policy
            .policy_mut()
            .network_mut()
            .set_parameters(&checkpoint.parameters)?;
        self.optimizer.restore(checkpoint.optimizer)?;
        self.policy.set_epsilon(checkpoint.epsilon);
        self.train_step = checkpoint.train_step;
        Ok(())
    }

    fn metrics(&self) -> AgentMetrics {
        let mut custom = serde_json::Map::new();
        custom.insert("epsilon".to_string(), serde_json::json!(self.policy.epsilon));
        AgentMetrics {
            train_steps: self.train_step,
            samples_seen: self.samples_seen,
            loss: self.last_loss,
            custom,
        }
    }
}
