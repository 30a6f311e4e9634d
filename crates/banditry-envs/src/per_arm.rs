//! Stationary stochastic per-arm environment

use async_trait::async_trait;
use ndarray::{Array1, Array2, Array3};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rand_distr::{Distribution, Normal};
use tracing::debug;

use banditry_core::{
    ActionSpec, BanditError, Environment, ObservationSpec, PerArmObservation, Result, Reward,
    RewardFunction, TimeStep, TimeStepSpec,
};

/// Draws one context vector
pub type ContextSampler = Box<dyn Fn(&mut dyn RngCore) -> Vec<f32> + Send + Sync>;

/// Linear reward with Gaussian noise: `N(dot(x, theta), stddev)`
#[derive(Debug, Clone)]
pub struct LinearNormalReward {
    /// Hidden parameter vector
    pub theta: Vec<f32>,
    /// Noise standard deviation
    pub stddev: f32,
}

impl LinearNormalReward {
    /// Unit-variance linear reward
    #[must_use]
    pub fn new(theta: Vec<f32>) -> Self {
        Self { theta, stddev: 1.0 }
    }

    /// Noise-free expected reward
    pub fn mean(&self, features: &[f32]) -> Result<f32> {
        if features.len() != self.theta.len() {
            return Err(BanditError::DimensionMismatch {
                expected: self.theta.len(),
                actual: features.len(),
            });
        }
        Ok(features.iter().zip(&self.theta).map(|(x, t)| x * t).sum())
    }
}

impl RewardFunction for LinearNormalReward {
    fn reward(&self, features: &[f32], rng: &mut dyn RngCore) -> Result<Reward> {
        let mu = self.mean(features)?;
        let noise = Normal::new(mu, self.stddev)
            .map_err(|e| BanditError::InvalidParameter(format!("reward noise: {e}")))?;
        Ok(Reward(noise.sample(rng)))
    }
}

/// Per-arm bandit environment whose contexts are drawn i.i.d. every step
///
/// Each observation holds `batch_size` global vectors and
/// `batch_size * num_actions` arm vectors. The reward of arm `k` is the reward
/// function applied to the global vector concatenated with arm `k`'s vector.
pub struct StationaryStochasticPerArmEnvironment {
    global_sampler: ContextSampler,
    arm_sampler: ContextSampler,
    reward_fn: Box<dyn RewardFunction>,
    spec: ObservationSpec,
    batch_size: usize,
    observation: Option<PerArmObservation>,
    rng: StdRng,
}

impl StationaryStochasticPerArmEnvironment {
    /// Create a new environment
    ///
    /// Samples one global and one arm context to infer the observation spec.
    pub fn new(
        global_sampler: ContextSampler,
        arm_sampler: ContextSampler,
        num_actions: usize,
        reward_fn: Box<dyn RewardFunction>,
        batch_size: usize,
        seed: Option<u64>,
    ) -> Result<Self> {
        if num_actions == 0 {
            return Err(BanditError::InvalidParameter(
                "num_actions must be positive".to_string(),
            ));
        }
        if batch_size == 0 {
            return Err(BanditError::InvalidParameter(
                "batch_size must be positive".to_string(),
            ));
        }

        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let global_dim = global_sampler(&mut rng).len();
        let per_arm_dim = arm_sampler(&mut rng).len();
        if global_dim == 0 || per_arm_dim == 0 {
            return Err(BanditError::InvalidParameter(
                "context samplers must return non-empty vectors".to_string(),
            ));
        }

        Ok(Self {
            global_sampler,
            arm_sampler,
            reward_fn,
            spec: ObservationSpec::per_arm(global_dim, per_arm_dim, num_actions),
            batch_size,
            observation: None,
            rng,
        })
    }

    /// Draw a fresh batched observation
    fn observe(&mut self) -> Result<PerArmObservation> {
        let ObservationSpec {
            global_dim,
            per_arm_dim,
            num_actions,
        } = self.spec;
        let per_arm_dim = per_arm_dim.unwrap_or_default();

        let mut global = Array2::zeros((self.batch_size, global_dim));
        for mut row in global.rows_mut() {
            let sample = (self.global_sampler)(&mut self.rng);
            if sample.len() != global_dim {
                return Err(BanditError::DimensionMismatch {
                    expected: global_dim,
                    actual: sample.len(),
                });
            }
            row.assign(&Array1::from(sample));
        }

        let mut arms = Array3::zeros((self.batch_size, num_actions, per_arm_dim));
        for b in 0..self.batch_size {
            for k in 0..num_actions {
                let sample = (self.arm_sampler)(&mut self.rng);
                if sample.len() != per_arm_dim {
                    return Err(BanditError::DimensionMismatch {
                        expected: per_arm_dim,
                        actual: sample.len(),
                    });
                }
                arms.slice_mut(ndarray::s![b, k, ..])
                    .assign(&Array1::from(sample));
            }
        }

        PerArmObservation::new(global, Some(arms))
    }

    /// Score `actions` against the current observation
    fn apply_action(&mut self, observation: &PerArmObservation, actions: &[usize]) -> Result<Array1<f32>> {
        let chosen = observation.arm_features(actions)?;
        let mut rewards = Array1::zeros(self.batch_size);
        for b in 0..self.batch_size {
            let features: Vec<f32> = observation
                .global
                .row(b)
                .iter()
                .chain(chosen.row(b).iter())
                .copied()
                .collect();
            rewards[b] = self.reward_fn.reward(&features, &mut self.rng)?.value();
        }
        Ok(rewards)
    }
}

#[async_trait]
impl Environment for StationaryStochasticPerArmEnvironment {
    fn time_step_spec(&self) -> TimeStepSpec {
        TimeStepSpec::new(self.spec)
    }

    fn action_spec(&self) -> ActionSpec {
        ActionSpec {
            num_actions: self.spec.num_actions,
        }
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    async fn reset(&mut self) -> Result<TimeStep> {
        let observation = self.observe()?;
        self.observation = Some(observation.clone());
        Ok(TimeStep::restart(observation))
    }

    async fn step(&mut self, actions: &[usize]) -> Result<TimeStep> {
        if actions.len() != self.batch_size {
            return Err(BanditError::DimensionMismatch {
                expected: self.batch_size,
                actual: actions.len(),
            });
        }
        self.action_spec().check(actions)?;

        let current = match self.observation.take() {
            Some(observation) => observation,
            None => {
                debug!("step called before reset; sampling an initial observation");
                self.observe()?
            }
        };
        let rewards = self.apply_action(&current, actions)?;

        let next = self.observe()?;
        self.observation = Some(next.clone());
        Ok(TimeStep::termination(next, rewards))
    }
}
