//! Policy abstractions for arm selection

use ndarray::Array2;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::{ActionSpec, BanditError, TimeStep};

/// Optional side information a policy can attach to its actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InfoField {
    /// Predicted mean reward of every arm
    PredictedRewardsMean,
    /// Whether each action was greedy or exploratory
    BanditPolicyType,
}

/// How an action was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BanditPolicyType {
    /// Argmax of the reward model
    Greedy,
    /// Uniform exploration
    Uniform,
}

/// Side information emitted with a batch of actions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyInfo {
    /// `[batch, num_actions]` predicted rewards
    pub predicted_rewards_mean: Option<Array2<f32>>,
    /// `[batch, per_arm_dim]` features of the arm that was chosen
    pub chosen_arm_features: Option<Array2<f32>>,
    /// Per batch element
    pub bandit_policy_type: Option<Vec<BanditPolicyType>>,
}

/// Output of a policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyStep {
    /// One arm per batch element
    pub action: Vec<usize>,
    /// Side information
    pub info: PolicyInfo,
}

/// Core policy trait for selecting arms
pub trait Policy: Send + Sync {
    /// Action spec this policy emits into
    fn action_spec(&self) -> ActionSpec;

    /// Info fields this policy emits
    fn emit_policy_info(&self) -> &[InfoField] {
        &[]
    }

    /// Select one arm per batch element of `time_step`
    fn action(&self, time_step: &TimeStep, rng: &mut dyn RngCore) -> crate::Result<PolicyStep>;
}

/// Epsilon-greedy policy wrapper
pub struct EpsilonGreedyPolicy<P> {
    /// Base (greedy) policy
    pub policy: P,
    /// Exploration rate
    pub epsilon: f64,
}

impl<P: Policy> EpsilonGreedyPolicy<P> {
    /// Create a new epsilon-greedy policy
    pub fn new(policy: P, epsilon: f64) -> crate::Result<Self> {
        if !(0.0..=1.0).contains(&epsilon) {
            return Err(BanditError::InvalidParameter(format!(
                "epsilon must be in [0, 1], got {epsilon}"
            )));
        }
        Ok(Self { policy, epsilon })
    }

    /// Set the exploration rate
    pub fn set_epsilon(&mut self, epsilon: f64) {
        self.epsilon = epsilon.clamp(0.0, 1.0);
    }

    /// Mutable access to the wrapped policy
    pub fn policy_mut(&mut self) -> &mut P {
        &mut self.policy
    }
}

impl<P: Policy> Policy for EpsilonGreedyPolicy<P> {
    fn action_spec(&self) -> ActionSpec {
        self.policy.action_spec()
    }

    fn emit_policy_info(&self) -> &[InfoField] {
        self.policy.emit_policy_info()
    }

    fn action(&self, time_step: &TimeStep, rng: &mut dyn RngCore) -> crate::Result<PolicyStep> {
        let mut step = self.policy.action(time_step, rng)?;
        let spec = self.action_spec();

        let mut kinds = Vec::with_capacity(step.action.len());
        let mut explored = false;
        for action in &mut step.action {
            if rng.gen::<f64>() < self.epsilon {
                *action = spec.sample(rng);
                kinds.push(BanditPolicyType::Uniform);
                explored = true;
            } else {
                kinds.push(BanditPolicyType::Greedy);
            }
        }

        // Arm features must follow the final action, not the greedy one.
        if explored && step.info.chosen_arm_features.is_some() {
            step.info.chosen_arm_features = Some(time_step.observation.arm_features(&step.action)?);
        }
        if self.emit_policy_info().contains(&InfoField::BanditPolicyType) {
            step.info.bandit_policy_type = Some(kinds);
        }

        Ok(step)
    }
}

/// Policy that selects arms uniformly at random
pub struct RandomPolicy {
    /// Action spec
    pub action_spec: ActionSpec,
    /// Whether to emit the chosen arm's features
    pub accepts_per_arm_features: bool,
}

impl RandomPolicy {
    /// Create a new random policy
    #[must_use]
    pub fn new(action_spec: ActionSpec, accepts_per_arm_features: bool) -> Self {
        Self {
            action_spec,
            accepts_per_arm_features,
        }
    }
}

impl Policy for RandomPolicy {
    fn action_spec(&self) -> ActionSpec {
        self.action_spec
    }

    fn action(&self, time_step: &TimeStep, rng: &mut dyn RngCore) -> crate::Result<PolicyStep> {
        let action: Vec<usize> = (0..time_step.batch_size())
            .map(|_| self.action_spec.sample(rng))
            .collect();

        let chosen_arm_features = if self.accepts_per_arm_features {
            Some(time_step.observation.arm_features(&action)?)
        } else {
            None
        };

        Ok(PolicyStep {
            action,
            info: PolicyInfo {
                chosen_arm_features,
                ..PolicyInfo::default()
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PerArmObservation;
    use ndarray::{Array2, Array3};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Always picks arm 0
    struct FirstArm {
        spec: ActionSpec,
    }

    impl Policy for FirstArm {
        fn action_spec(&self) -> ActionSpec {
            self.spec
        }

        fn emit_policy_info(&self) -> &[InfoField] {
            &[InfoField::BanditPolicyType]
        }

        fn action(&self, time_step: &TimeStep, _rng: &mut dyn RngCore) -> crate::Result<PolicyStep> {
            let action = vec![0; time_step.batch_size()];
            let chosen = time_step.observation.arm_features(&action)?;
            Ok(PolicyStep {
                action,
                info: PolicyInfo {
                    chosen_arm_features: Some(chosen),
                    ..PolicyInfo::default()
                },
            })
        }
    }

    fn time_step(batch: usize, arms: usize) -> TimeStep {
        let per_arm = Array3::from_shape_fn((batch, arms, 2), |(_, k, j)| (k * 10 + j) as f32);
        let obs = PerArmObservation::new(Array2::zeros((batch, 1)), Some(per_arm)).unwrap();
        TimeStep::restart(obs)
    }

    #[test]
    fn test_zero_epsilon_is_greedy() {
        let spec = ActionSpec::new(4).unwrap();
        let policy = EpsilonGreedyPolicy::new(FirstArm { spec }, 0.0).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let step = policy.action(&time_step(8, 4), &mut rng).unwrap();
        assert!(step.action.iter().all(|&a| a == 0));
        assert_eq!(
            step.info.bandit_policy_type.unwrap(),
            vec![BanditPolicyType::Greedy; 8]
        );
    }

    #[test]
    fn test_full_epsilon_explores_and_regathers_features() {
        let spec = ActionSpec::new(4).unwrap();
        let policy = EpsilonGreedyPolicy::new(FirstArm { spec }, 1.0).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let ts = time_step(64, 4);
        let step = policy.action(&ts, &mut rng).unwrap();

        assert!(step.action.iter().any(|&a| a != 0));
        let chosen = step.info.chosen_arm_features.unwrap();
        for (b, &a) in step.action.iter().enumerate() {
            assert_eq!(chosen[[b, 0]], (a * 10) as f32);
        }
        assert!(step
            .info
            .bandit_policy_type
            .unwrap()
            .iter()
            .all(|t| *t == BanditPolicyType::Uniform));
    }

    #[test]
    fn test_invalid_epsilon() {
        let spec = ActionSpec::new(2).unwrap();
        assert!(EpsilonGreedyPolicy::new(FirstArm { spec }, 1.5).is_err());
        assert!(EpsilonGreedyPolicy::new(FirstArm { spec }, -0.1).is_err());
    }

    #[test]
    fn test_random_policy_in_range() {
        let spec = ActionSpec::new(3).unwrap();
        let policy = RandomPolicy::new(spec, true);
        let mut rng = StdRng::seed_from_u64(5);
        let step = policy.action(&time_step(10, 3), &mut rng).unwrap();
        assert_eq!(step.action.len(), 10);
        assert!(step.action.iter().all(|&a| a < 3));
        assert_eq!(step.info.chosen_arm_features.unwrap().nrows(), 10);
    }
}
