//! Reward signals and reward functions

use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Reward signal from the environment
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Reward(pub f32);

impl Reward {
    /// Create a new reward
    #[must_use]
    pub fn new(value: f32) -> Self {
        Self(value)
    }

    /// Get the reward value
    #[must_use]
    pub fn value(&self) -> f32 {
        self.0
    }
}

impl From<f32> for Reward {
    fn from(value: f32) -> Self {
        Self(value)
    }
}

impl From<Reward> for f32 {
    fn from(reward: Reward) -> Self {
        reward.0
    }
}

impl std::ops::Add for Reward {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self(self.0 + other.0)
    }
}

/// Stochastic reward of an arm, given the global features concatenated with
/// that arm's features
pub trait RewardFunction: Send + Sync {
    /// Sample a reward for one feature vector
    fn reward(&self, features: &[f32], rng: &mut dyn RngCore) -> crate::Result<Reward>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct Sum;

    impl RewardFunction for Sum {
        fn reward(&self, features: &[f32], _rng: &mut dyn RngCore) -> crate::Result<Reward> {
            Ok(Reward(features.iter().sum()))
        }
    }

    #[test]
    fn test_reward_function() {
        let sum = Sum;
        let mut rng = StdRng::seed_from_u64(0);
        let r = sum.reward(&[1.0, 2.0, 3.0], &mut rng).unwrap();
        assert_eq!(r.value(), 6.0);
        assert_eq!(f32::from(r + Reward::new(1.0)), 7.0);
    }
}
