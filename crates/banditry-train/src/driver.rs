//! Step driver: runs a policy in an environment and routes trajectories

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use banditry_agents::TrajectoryBuffer;
use banditry_core::{BanditError, Environment, Policy, Result, TimeStep, Trajectory, TrajectoryTransform};

use crate::metrics::TrainMetric;

/// Drives a fixed number of environment steps per run
///
/// The last time step is carried across runs, so consecutive runs continue
/// the same stream of contexts.
pub struct StepDriver {
    num_steps: usize,
    time_step: Option<TimeStep>,
    rng: StdRng,
}

impl StepDriver {
    /// Create a driver taking `num_steps` steps per run
    pub fn new(num_steps: usize, seed: Option<u64>) -> Result<Self> {
        if num_steps == 0 {
            return Err(BanditError::InvalidParameter(
                "num_steps must be positive".to_string(),
            ));
        }
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            num_steps,
            time_step: None,
            rng,
        })
    }

    /// Number of steps per run
    #[must_use]
    pub fn num_steps(&self) -> usize {
        self.num_steps
    }

    /// Run `num_steps` steps
    ///
    /// Every raw trajectory is shown to `metrics`; the buffer receives it
    /// after `transform`.
    pub async fn run<E>(
        &mut self,
        environment: &mut E,
        policy: &dyn Policy,
        metrics: &mut [Box<dyn TrainMetric>],
        buffer: &mut TrajectoryBuffer,
        transform: Option<&TrajectoryTransform>,
    ) -> Result<()>
    where
        E: Environment + ?Sized,
    {
        for step in 0..self.num_steps {
            let time_step = match self.time_step.take() {
                Some(time_step) => time_step,
                None => environment.reset().await?,
            };

            let policy_step = policy.action(&time_step, &mut self.rng)?;
            let next_time_step = environment.step(&policy_step.action).await?;
            let trajectory = Trajectory::from_transition(&time_step, &policy_step, &next_time_step)?;

            for metric in metrics.iter_mut() {
                metric.observe(&trajectory)?;
            }
            let trajectory = match transform {
                Some(transform) => transform(trajectory),
                None => trajectory,
            };
            buffer.push(trajectory);

            debug!(step, batch = next_time_step.batch_size(), "collected step");
            self.time_step = Some(next_time_step);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::EnvironmentSteps;
    use banditry_core::{drop_arm_features_fn, ActionSpec, RandomPolicy};
    use banditry_envs::{LinearNormalReward, StationaryStochasticPerArmEnvironment};
    use rand::RngCore;

    fn environment() -> StationaryStochasticPerArmEnvironment {
        StationaryStochasticPerArmEnvironment::new(
            Box::new(|rng: &mut dyn RngCore| vec![(rng.next_u32() % 5) as f32; 2]),
            Box::new(|rng: &mut dyn RngCore| vec![(rng.next_u32() % 3) as f32; 3]),
            4,
            Box::new(LinearNormalReward::new(vec![1.0; 5])),
            3,
            Some(0),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_driver_fills_buffer_and_metrics() {
        let mut env = environment();
        let policy = RandomPolicy::new(ActionSpec::new(4).unwrap(), true);
        let mut metrics: Vec<Box<dyn TrainMetric>> = vec![Box::new(EnvironmentSteps::new())];
        let mut buffer = TrajectoryBuffer::new(2).unwrap();
        let mut driver = StepDriver::new(2, Some(1)).unwrap();

        let transform = drop_arm_features_fn();
        driver
            .run(&mut env, &policy, &mut metrics, &mut buffer, Some(&transform))
            .await
            .unwrap();

        assert_eq!(buffer.len(), 2);
        let experience = buffer.gather_all().unwrap();
        assert_eq!(experience.len(), 6);
        assert!(experience.observation.per_arm.is_none());
        assert!(experience.policy_info.chosen_arm_features.is_some());
        assert_eq!(metrics[0].result(), 6.0);
    }

    #[tokio::test]
    async fn test_driver_carries_time_step() {
        let mut env = environment();
        let policy = RandomPolicy::new(ActionSpec::new(4).unwrap(), false);
        let mut metrics: Vec<Box<dyn TrainMetric>> = Vec::new();
        let mut buffer = TrajectoryBuffer::new(1).unwrap();
        let mut driver = StepDriver::new(1, Some(2)).unwrap();

        driver
            .run(&mut env, &policy, &mut metrics, &mut buffer, None)
            .await
            .unwrap();
        let carried = driver.time_step.clone().unwrap();

        buffer.clear();
        driver
            .run(&mut env, &policy, &mut metrics, &mut buffer, None)
            .await
            .unwrap();
        let second = buffer.gather_all().unwrap();
        assert_eq!(second.observation, carried.observation);
    }

    #[test]
    fn test_zero_steps() {
        assert!(StepDriver::new(0, None).is_err());
    }
}
