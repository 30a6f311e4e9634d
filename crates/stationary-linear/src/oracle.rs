//! Noise-free reward oracle for the stationary linear environment
//!
//! The expected reward of arm `i` in batch element `b` is the dot product of
//! the hidden parameter with the global features of `b` concatenated with the
//! features of arm `i`. Regret and suboptimal-arm metrics are computed from
//! these values.

use ndarray::{s, Array1, Array2, ArrayView1, Axis};

use banditry_core::{BanditError, PerArmObservation, Result};

/// Expected reward of every arm, `[batch, num_arms]`
pub fn all_rewards(observation: &PerArmObservation, hidden_param: &[f32]) -> Result<Array2<f32>> {
    let arms = observation.per_arm_features()?;
    let (batch, num_arms, arm_dim) = arms.dim();
    let global_dim = observation.global.ncols();
    if global_dim + arm_dim != hidden_param.len() {
        return Err(BanditError::DimensionMismatch {
            expected: hidden_param.len(),
            actual: global_dim + arm_dim,
        });
    }

    let theta = ArrayView1::from(hidden_param);
    let global_part = observation.global.dot(&theta.slice(s![..global_dim]));
    let arm_theta = theta.slice(s![global_dim..]);

    let mut rewards = Array2::zeros((batch, num_arms));
    for ((b, i), reward) in rewards.indexed_iter_mut() {
        *reward = global_part[b] + arms.slice(s![b, i, ..]).dot(&arm_theta);
    }
    Ok(rewards)
}

/// Expected reward of the best arm per batch element
pub fn optimal_reward(observation: &PerArmObservation, hidden_param: &[f32]) -> Result<Array1<f32>> {
    let rewards = all_rewards(observation, hidden_param)?;
    Ok(rewards.map_axis(Axis(1), |row| {
        row.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }))
}

/// Index of the best arm per batch element; ties go to the lowest index
pub fn optimal_action(observation: &PerArmObservation, hidden_param: &[f32]) -> Result<Array1<usize>> {
    let rewards = all_rewards(observation, hidden_param)?;
    Ok(rewards.map_axis(Axis(1), |row| {
        let mut best = 0;
        for (i, &r) in row.iter().enumerate() {
            if r > row[best] {
                best = i;
            }
        }
        best
    }))
}
