//! First-order optimizers over flat parameter vectors

use serde::{Deserialize, Serialize};

use banditry_core::{BanditError, Result};

/// Serializable optimizer state, stored in agent checkpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OptimizerState {
    /// Adam moment estimates
    Adam {
        /// Number of updates applied
        step: u64,
        /// First moment
        m: Vec<f32>,
        /// Second moment
        v: Vec<f32>,
    },
    /// Plain gradient descent has no state
    Sgd,
}

/// Updates parameters from gradients
pub trait Optimizer: Send + Sync {
    /// Apply one update in place
    fn apply_gradients(&mut self, params: &mut [f32], grads: &[f32]) -> Result<()>;

    /// Base learning rate
    fn learning_rate(&self) -> f32;

    /// Snapshot of the internal state
    fn state(&self) -> OptimizerState;

    /// Restore a snapshot taken with `state`
    fn restore(&mut self, state: OptimizerState) -> Result<()>;
}

fn check_lengths(params: &[f32], grads: &[f32]) -> Result<()> {
    if params.len() == grads.len() {
        Ok(())
    } else {
        Err(BanditError::DimensionMismatch {
            expected: params.len(),
            actual: grads.len(),
        })
    }
}

/// Adam with bias-corrected step size
#[derive(Debug, Clone)]
pub struct Adam {
    /// Learning rate
    pub learning_rate: f32,
    /// First moment decay
    pub beta1: f32,
    /// Second moment decay
    pub beta2: f32,
    /// Numerical stability term
    pub epsilon: f32,
    step: u64,
    m: Vec<f32>,
    v: Vec<f32>,
}

impl Adam {
    /// Adam with the usual defaults
    #[must_use]
    pub fn new(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            step: 0,
            m: Vec::new(),
            v: Vec::new(),
        }
    }

    /// Number of updates applied so far
    #[must_use]
    pub fn iterations(&self) -> u64 {
        self.step
    }
}

impl Optimizer for Adam {
    fn apply_gradients(&mut self, params: &mut [f32], grads: &[f32]) -> Result<()> {
        check_lengths(params, grads)?;
        if self.m.len() != params.len() {
            self.m = vec![0.0; params.len()];
            self.v = vec![0.0; params.len()];
            self.step = 0;
        }

        self.step += 1;
        let t = i32::try_from(self.step).unwrap_or(i32::MAX);
        let lr_t = self.learning_rate * (1.0 - self.beta2.powi(t)).sqrt()
            / (1.0 - self.beta1.powi(t));

        for (((p, &g), m), v) in params
            .iter_mut()
            .zip(grads)
            .zip(&mut self.m)
            .zip(&mut self.v)
        {
            *m = self.beta1 * *m + (1.0 - self.beta1) * g;
            *v = self.beta2 * *v + (1.0 - self.beta2) * g * g;
            *p -= lr_t * *m / (v.sqrt() + self.epsilon);
        }
        Ok(())
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn state(&self) -> OptimizerState {
        OptimizerState::Adam {
            step: self.step,
            m: self.m.clone(),
            v: self.v.clone(),
        }
    }

    fn restore(&mut self, state: OptimizerState) -> Result<()> {
        match state {
            OptimizerState::Adam { step, m, v } if m.len() == v.len() => {
                self.step = step;
                self.m = m;
                self.v = v;
                Ok(())
            }
            other => Err(BanditError::Agent(format!(
                "cannot restore Adam from {other:?}"
            ))),
        }
    }
}

/// Plain stochastic gradient descent
#[derive(Debug, Clone)]
pub struct Sgd {
    /// Learning rate
    pub learning_rate: f32,
}

impl Sgd {
    /// Create a new SGD optimizer
    #[must_use]
    pub fn new(learning_rate: f32) -> Self {
        Self { learning_rate }
    }
}

impl Optimizer for Sgd {
    fn apply_gradients(&mut self, params: &mut [f32], grads: &[f32]) -> Result<()> {
        check_lengths(params, grads)?;
        for (p, g) in params.iter_mut().zip(grads) {
            *p -= self.learning_rate * g;
        }
        Ok(())
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn state(&self) -> OptimizerState {
        OptimizerState::Sgd
    }

    fn restore(&mut self, state: OptimizerState) -> Result<()> {
        match state {
            OptimizerState::Sgd => Ok(()),
            other => Err(BanditError::Agent(format!(
                "cannot restore SGD from {other:?}"
            ))),
        }
    }
}

/// Rescale `grads` so their global L2 norm is at most `clip_norm`
///
/// Returns the norm before clipping.
pub fn clip_by_global_norm(grads: &mut [f32], clip_norm: f32) -> f32 {
    let norm = grads.iter().map(|g| g * g).sum::<f32>().sqrt();
    if norm > clip_norm && norm > 0.0 {
        let scale = clip_norm / norm;
        for g in grads.iter_mut() {
            *g *= scale;
        }
    }
    norm
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_adam_first_step_moves_by_learning_rate() {
        // bias correction makes the first step size exactly lr per coordinate
        let mut adam = Adam::new(0.05);
        let mut params = vec![1.0, -1.0];
        adam.apply_gradients(&mut params, &[3.0, -0.5]).unwrap();
        assert_abs_diff_eq!(params[0], 0.95, epsilon = 1e-5);
        assert_abs_diff_eq!(params[1], -0.95, epsilon = 1e-5);
        assert_eq!(adam.iterations(), 1);
    }

    #[test]
    fn test_adam_minimizes_quadratic() {
        let mut adam = Adam::new(0.1);
        let mut params = vec![5.0_f32];
        for _ in 0..500 {
            let grad = [2.0 * (params[0] - 2.0)];
            adam.apply_gradients(&mut params, &grad).unwrap();
        }
        assert_abs_diff_eq!(params[0], 2.0, epsilon = 0.1);
    }

    #[test]
    fn test_adam_state_roundtrip() {
        let mut adam = Adam::new(0.01);
        let mut params = vec![0.0; 3];
        adam.apply_gradients(&mut params, &[1.0, 2.0, 3.0]).unwrap();

        let json = serde_json::to_string(&adam.state()).unwrap();
        let mut restored = Adam::new(0.01);
        restored.restore(serde_json::from_str(&json).unwrap()).unwrap();
        assert_eq!(restored.state(), adam.state());
        assert!(restored.restore(OptimizerState::Sgd).is_err());
    }

    #[test]
    fn test_sgd_step() {
        let mut sgd = Sgd::new(0.5);
        let mut params = vec![1.0, 1.0];
        sgd.apply_gradients(&mut params, &[2.0, -2.0]).unwrap();
        assert_eq!(params, vec![0.0, 2.0]);
        assert!(sgd.apply_gradients(&mut params, &[1.0]).is_err());
    }

    #[test]
    fn test_clip_by_global_norm() {
        let mut grads = vec![3.0, 4.0];
        let norm = clip_by_global_norm(&mut grads, 1.0);
        assert_abs_diff_eq!(norm, 5.0);
        assert_abs_diff_eq!(grads[0], 0.6, epsilon = 1e-6);
        assert_abs_diff_eq!(grads[1], 0.8, epsilon = 1e-6);

        let mut small = vec![0.1, 0.1];
        clip_by_global_norm(&mut small, 1.0);
        assert_eq!(small, vec![0.1, 0.1]);
    }
}
