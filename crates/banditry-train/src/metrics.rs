//! Training metrics observed on collected trajectories

use std::collections::VecDeque;
use std::sync::Arc;

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use banditry_core::{BanditError, PerArmObservation, Result, Trajectory};

/// Expected reward of the best arm, per batch element
pub type OptimalRewardFn = Arc<dyn Fn(&PerArmObservation) -> Result<Array1<f32>> + Send + Sync>;

/// Index of the best arm, per batch element
pub type OptimalActionFn = Arc<dyn Fn(&PerArmObservation) -> Result<Array1<usize>> + Send + Sync>;

/// Metric updated from every collected trajectory
pub trait TrainMetric: Send + Sync {
    /// Name used in logs and summaries
    fn name(&self) -> &str;

    /// Update from one batched trajectory
    fn observe(&mut self, trajectory: &Trajectory) -> Result<()>;

    /// Current value
    fn result(&self) -> f64;

    /// Reset to the initial state
    fn reset(&mut self);

    /// Checkpointable state
    fn state(&self) -> Value;

    /// Restore a value produced by `state`
    fn restore(&mut self, state: Value) -> Result<()>;
}

fn restore_from<T: for<'de> Deserialize<'de>>(name: &str, state: Value) -> Result<T> {
    serde_json::from_value(state)
        .map_err(|e| BanditError::InvalidParameter(format!("cannot restore {name}: {e}")))
}

/// Counts episodes; each batch element of a bandit step is one episode
#[derive(Debug, Clone, Default)]
pub struct NumberOfEpisodes {
    count: u64,
}

impl NumberOfEpisodes {
    /// Create a new counter
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TrainMetric for NumberOfEpisodes {
    fn name(&self) -> &str {
        "NumberOfEpisodes"
    }

    fn observe(&mut self, trajectory: &Trajectory) -> Result<()> {
        self.count += trajectory.len() as u64;
        Ok(())
    }

    fn result(&self) -> f64 {
        self.count as f64
    }

    fn reset(&mut self) {
        self.count = 0;
    }

    fn state(&self) -> Value {
        Value::from(self.count)
    }

    fn restore(&mut self, state: Value) -> Result<()> {
        self.count = restore_from(self.name(), state)?;
        Ok(())
    }
}

/// Counts environment steps across the batch
#[derive(Debug, Clone, Default)]
pub struct EnvironmentSteps {
    count: u64,
}

impl EnvironmentSteps {
    /// Create a new counter
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TrainMetric for EnvironmentSteps {
    fn name(&self) -> &str {
        "EnvironmentSteps"
    }

    fn observe(&mut self, trajectory: &Trajectory) -> Result<()> {
        self.count += trajectory.len() as u64;
        Ok(())
    }

    fn result(&self) -> f64 {
        self.count as f64
    }

    fn reset(&mut self) {
        self.count = 0;
    }

    fn state(&self) -> Value {
        Value::from(self.count)
    }

    fn restore(&mut self, state: Value) -> Result<()> {
        self.count = restore_from(self.name(), state)?;
        Ok(())
    }
}

/// Mean return over a window of recent episodes
#[derive(Debug, Clone)]
pub struct AverageReturnMetric {
    returns: VecDeque<f32>,
    buffer_size: usize,
}

impl AverageReturnMetric {
    /// Average over the last `buffer_size` episodes
    #[must_use]
    pub fn new(buffer_size: usize) -> Self {
        Self {
            returns: VecDeque::with_capacity(buffer_size),
            buffer_size: buffer_size.max(1),
        }
    }
}

impl TrainMetric for AverageReturnMetric {
    fn name(&self) -> &str {
        "AverageReturn"
    }

    fn observe(&mut self, trajectory: &Trajectory) -> Result<()> {
        for &reward in &trajectory.reward {
            if self.returns.len() >= self.buffer_size {
                self.returns.pop_front();
            }
            self.returns.push_back(reward);
        }
        Ok(())
    }

    fn result(&self) -> f64 {
        if self.returns.is_empty() {
            return 0.0;
        }
        self.returns.iter().map(|&r| f64::from(r)).sum::<f64>() / self.returns.len() as f64
    }

    fn reset(&mut self) {
        self.returns.clear();
    }

    fn state(&self) -> Value {
        serde_json::json!(self.returns)
    }

    fn restore(&mut self, state: Value) -> Result<()> {
        let returns: Vec<f32> = restore_from(self.name(), state)?;
        let skip = returns.len().saturating_sub(self.buffer_size);
        self.returns = returns.into_iter().skip(skip).collect();
        Ok(())
    }
}

/// Mean regret of the latest trajectory: optimal expected reward minus the
/// observed reward
pub struct RegretMetric {
    optimal_reward_fn: OptimalRewardFn,
    value: f64,
}

impl RegretMetric {
    /// Create a regret metric from an oracle
    #[must_use]
    pub fn new(optimal_reward_fn: OptimalRewardFn) -> Self {
        Self {
            optimal_reward_fn,
            value: 0.0,
        }
    }
}

impl TrainMetric for RegretMetric {
    fn name(&self) -> &str {
        "RegretMetric"
    }

    fn observe(&mut self, trajectory: &Trajectory) -> Result<()> {
        if trajectory.is_empty() {
            return Ok(());
        }
        let optimal = (self.optimal_reward_fn)(&trajectory.observation)?;
        if optimal.len() != trajectory.reward.len() {
            return Err(BanditError::DimensionMismatch {
                expected: trajectory.reward.len(),
                actual: optimal.len(),
            });
        }
        let regret: f64 = optimal
            .iter()
            .zip(&trajectory.reward)
            .map(|(&best, &reward)| f64::from(best - reward))
            .sum();
        self.value = regret / trajectory.len() as f64;
        Ok(())
    }

    fn result(&self) -> f64 {
        self.value
    }

    fn reset(&mut self) {
        self.value = 0.0;
    }

    fn state(&self) -> Value {
        serde_json::json!(self.value)
    }

    fn restore(&mut self, state: Value) -> Result<()> {
        self.value = restore_from(self.name(), state)?;
        Ok(())
    }
}

/// Fraction of the latest trajectory's actions that were not optimal
pub struct SuboptimalArmsMetric {
    optimal_action_fn: OptimalActionFn,
    value: f64,
}

impl SuboptimalArmsMetric {
    /// Create a suboptimal-arms metric from an oracle
    #[must_use]
    pub fn new(optimal_action_fn: OptimalActionFn) -> Self {
        Self {
            optimal_action_fn,
            value: 0.0,
        }
    }
}

impl TrainMetric for SuboptimalArmsMetric {
    fn name(&self) -> &str {
        "SuboptimalArmsMetric"
    }

    fn observe(&mut self, trajectory: &Trajectory) -> Result<()> {
        if trajectory.is_empty() {
            return Ok(());
        }
        let optimal = (self.optimal_action_fn)(&trajectory.observation)?;
        if optimal.len() != trajectory.len() {
            return Err(BanditError::DimensionMismatch {
                expected: trajectory.len(),
                actual: optimal.len(),
            });
        }
        let suboptimal = optimal
            .iter()
            .zip(&trajectory.action)
            .filter(|(best, taken)| best != taken)
            .count();
        self.value = suboptimal as f64 / trajectory.len() as f64;
        Ok(())
    }

    fn result(&self) -> f64 {
        self.value
    }

    fn reset(&mut self) {
        self.value = 0.0;
    }

    fn state(&self) -> Value {
        serde_json::json!(self.value)
    }

    fn restore(&mut self, state: Value) -> Result<()> {
        self.value = restore_from(self.name(), state)?;
        Ok(())
    }
}

/// Snapshot of metric values, keyed by name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricValues(pub std::collections::BTreeMap<String, f64>);

impl MetricValues {
    /// Collect current results
    #[must_use]
    pub fn collect(metrics: &[Box<dyn TrainMetric>]) -> Self {
        Self(
            metrics
                .iter()
                .map(|m| (m.name().to_string(), m.result()))
                .collect(),
        )
    }

    /// Value of one metric
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }
}
