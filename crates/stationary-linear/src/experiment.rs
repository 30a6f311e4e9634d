//! Assembly of the per-arm stationary linear experiment

use std::path::Path;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use tracing::info;

use banditry_agents::{
    Adam, CommonTowerNetwork, DotProductNetwork, NeuralEpsilonGreedyAgent,
    NeuralEpsilonGreedyConfig, RewardNetwork,
};
use banditry_core::{
    drop_arm_features_fn, Environment, InfoField, ObservationSpec, PerArmObservation, Result,
    TrajectoryTransform,
};
use banditry_envs::{ContextSampler, LinearNormalReward, StationaryStochasticPerArmEnvironment};
use banditry_train::{
    train_with_options, OptimalActionFn, OptimalRewardFn, RegretMetric, SuboptimalArmsMetric,
    TrainMetric, TrainerOptions, TrainingSummary,
};

use crate::config::{ExperimentConfig, NetworkKind};
use crate::oracle::{optimal_action, optimal_reward};

/// Derive a per-component seed so components do not share random streams
fn component_seed(seed: Option<u64>, component: u64) -> Option<u64> {
    seed.map(|s| s.wrapping_add(component))
}

fn rng_from(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Global contexts: integers uniform in `[-10, 10)`
#[must_use]
pub fn global_context_sampler(dim: usize) -> ContextSampler {
    Box::new(move |rng: &mut dyn RngCore| {
        (0..dim).map(|_| rng.gen_range(-10..10) as f32).collect()
    })
}

/// Arm contexts: integers uniform in `[-2, 3)`
#[must_use]
pub fn arm_context_sampler(dim: usize) -> ContextSampler {
    Box::new(move |rng: &mut dyn RngCore| {
        (0..dim).map(|_| rng.gen_range(-2..3) as f32).collect()
    })
}

/// Batched per-arm environment with linear Gaussian rewards
pub fn build_environment(config: &ExperimentConfig) -> Result<StationaryStochasticPerArmEnvironment> {
    StationaryStochasticPerArmEnvironment::new(
        global_context_sampler(config.global_dim),
        arm_context_sampler(config.per_arm_dim),
        config.num_actions,
        Box::new(LinearNormalReward::new(config.hidden_param.clone())),
        config.batch_size,
        component_seed(config.seed, 0),
    )
}

/// Reward network selected by `config.network`
pub fn build_network(
    config: &ExperimentConfig,
    spec: &ObservationSpec,
    rng: &mut dyn RngCore,
) -> Result<Box<dyn RewardNetwork>> {
    Ok(match config.network {
        NetworkKind::CommonTower => Box::new(CommonTowerNetwork::new(
            spec,
            &config.common_tower_global_layers,
            &config.common_tower_arm_layers,
            &config.common_tower_common_layers,
            rng,
        )?),
        NetworkKind::DotProduct => Box::new(DotProductNetwork::new(
            spec,
            &config.dot_product_global_layers,
            &config.dot_product_arm_layers,
            rng,
        )?),
    })
}

/// Trajectory transformation applied before training
#[must_use]
pub fn training_transform(config: &ExperimentConfig) -> Option<TrajectoryTransform> {
    config.drop_arm_obs.then(drop_arm_features_fn)
}

/// Neural epsilon-greedy agent trained on per-arm features
pub fn build_agent<E>(config: &ExperimentConfig, environment: &E) -> Result<NeuralEpsilonGreedyAgent>
where
    E: Environment + ?Sized,
{
    let time_step_spec = environment.time_step_spec();
    let mut rng = rng_from(component_seed(config.seed, 1));
    let network = build_network(config, &time_step_spec.observation, &mut rng)?;

    NeuralEpsilonGreedyAgent::new(
        time_step_spec,
        environment.action_spec(),
        network,
        Box::new(Adam::new(config.learning_rate)),
        NeuralEpsilonGreedyConfig {
            epsilon: config.epsilon,
            accepts_per_arm_features: true,
            training_data_spec_transformation_fn: training_transform(config),
            emit_policy_info: vec![InfoField::PredictedRewardsMean],
            gradient_clipping: None,
        },
    )
}

/// Regret and suboptimal-arm metrics against the noise-free oracle
#[must_use]
pub fn bandit_metrics(config: &ExperimentConfig) -> Vec<Box<dyn TrainMetric>> {
    let hidden: Arc<[f32]> = config.hidden_param.clone().into();

    let reward_param = Arc::clone(&hidden);
    let optimal_reward_fn: OptimalRewardFn =
        Arc::new(move |obs: &PerArmObservation| optimal_reward(obs, &reward_param));

    let action_param = hidden;
    let optimal_action_fn: OptimalActionFn =
        Arc::new(move |obs: &PerArmObservation| optimal_action(obs, &action_param));

    vec![
        Box::new(RegretMetric::new(optimal_reward_fn)),
        Box::new(SuboptimalArmsMetric::new(optimal_action_fn)),
    ]
}

/// Build every component and train
pub async fn run(root_dir: &Path, config: &ExperimentConfig) -> Result<TrainingSummary> {
    let mut environment = build_environment(config)?;
    let mut agent = build_agent(config, &environment)?;

    info!(
        network = %config.network,
        drop_arm_obs = config.drop_arm_obs,
        parameters = agent.network().num_parameters(),
        root_dir = %root_dir.display(),
        "assembled per-arm stationary linear experiment"
    );

    let options = TrainerOptions {
        checkpoint_interval: config.checkpoint_interval,
        seed: component_seed(config.seed, 2),
        experiment_config: Some(serde_json::to_value(config)?),
        ..TrainerOptions::default()
    };

    let summary = train_with_options(
        root_dir,
        &mut agent,
        &mut environment,
        config.training_loops,
        config.steps_per_loop,
        bandit_metrics(config),
        training_transform(config),
        &options,
    )
    .await?;

    environment.close().await?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use banditry_core::Agent;

    #[test]
    fn test_samplers_respect_ranges() {
        let mut rng = StdRng::seed_from_u64(0);
        let global = global_context_sampler(4);
        let arm = arm_context_sampler(5);
        for _ in 0..200 {
            let g = global(&mut rng);
            let a = arm(&mut rng);
            assert_eq!(g.len(), 4);
            assert_eq!(a.len(), 5);
            assert!(g.iter().all(|&x| (-10.0..10.0).contains(&x) && x.fract() == 0.0));
            assert!(a.iter().all(|&x| (-2.0..3.0).contains(&x) && x.fract() == 0.0));
        }
    }

    #[test]
    fn test_agent_matches_environment() {
        for network in [NetworkKind::CommonTower, NetworkKind::DotProduct] {
            for drop_arm_obs in [false, true] {
                let config = ExperimentConfig {
                    seed: Some(1),
                    ..ExperimentConfig::new(network, drop_arm_obs)
                };
                let env = build_environment(&config).unwrap();
                let agent = build_agent(&config, &env).unwrap();

                assert_eq!(agent.action_spec().num_actions, 7);
                assert_eq!(agent.network().name(), network.to_string());
                assert_eq!(
                    agent.training_data_spec().per_arm_dim.is_none(),
                    drop_arm_obs
                );
                assert_eq!(training_transform(&config).is_some(), drop_arm_obs);
            }
        }
    }

    #[test]
    fn test_seeded_builds_are_reproducible() {
        let config = ExperimentConfig {
            seed: Some(11),
            ..ExperimentConfig::default()
        };
        let a = build_agent(&config, &build_environment(&config).unwrap()).unwrap();
        let b = build_agent(&config, &build_environment(&config).unwrap()).unwrap();
        assert_eq!(a.network().parameters(), b.network().parameters());
    }

    #[test]
    fn test_bandit_metric_names() {
        let metrics = bandit_metrics(&ExperimentConfig::default());
        let names: Vec<_> = metrics.iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["RegretMetric", "SuboptimalArmsMetric"]);
    }
}
