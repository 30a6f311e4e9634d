use banditry_train::SummaryRecord;
use stationary_linear::{run, ExperimentConfig, NetworkKind};

fn small(network: NetworkKind, drop_arm_obs: bool) -> ExperimentConfig {
    ExperimentConfig {
        training_loops: 4,
        checkpoint_interval: 2,
        seed: Some(5),
        ..ExperimentConfig::new(network, drop_arm_obs)
    }
}

#[tokio::test]
async fn test_common_tower_run() {
    let dir = tempfile::tempdir().unwrap();
    let summary = run(dir.path(), &small(NetworkKind::CommonTower, false))
        .await
        .unwrap();

    assert_eq!(summary.loops_run, 4);
    assert_eq!(summary.train_step, 4);
    // 4 loops of 2 steps with 16 episodes each
    assert_eq!(summary.metrics.get("NumberOfEpisodes"), Some(128.0));
    let regret = summary.metrics.get("RegretMetric").unwrap();
    assert!(regret.is_finite());
    let suboptimal = summary.metrics.get("SuboptimalArmsMetric").unwrap();
    assert!((0.0..=1.0).contains(&suboptimal));

    let config: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("train/config.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(config["options"]["experiment_config"]["network"], "commontower");
}

#[tokio::test]
async fn test_dot_product_run_without_arm_observations() {
    let dir = tempfile::tempdir().unwrap();
    let summary = run(dir.path(), &small(NetworkKind::DotProduct, true))
        .await
        .unwrap();
    assert_eq!(summary.completed_loops, 4);

    let lines = std::fs::read_to_string(dir.path().join("train/summaries.jsonl")).unwrap();
    let records: Vec<SummaryRecord> = lines
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(records.len(), 4);
    assert!(records.iter().all(|r| r.loss.loss.is_finite()));
}

#[tokio::test]
async fn test_seeded_runs_match() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    let config = small(NetworkKind::CommonTower, true);

    let a = run(first.path(), &config).await.unwrap();
    let b = run(second.path(), &config).await.unwrap();
    assert_eq!(a.metrics, b.metrics);
    assert_eq!(a.last_loss, b.last_loss);
}
