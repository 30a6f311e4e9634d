//! Train a neural epsilon-greedy agent on a per-arm stationary linear bandit

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use stationary_linear::{run, ExperimentConfig, NetworkKind};

#[derive(Debug, Parser)]
#[command(name = "train_eval_per_arm_stationary_linear")]
#[command(about = "Per-arm stationary linear bandit: neural epsilon-greedy training", version)]
struct Cli {
    /// Root directory for writing logs/summaries/checkpoints
    #[arg(long = "root_dir", env = "TEST_UNDECLARED_OUTPUTS_DIR")]
    root_dir: PathBuf,

    /// Which network architecture to use
    #[arg(long, value_enum, default_value_t = NetworkKind::CommonTower)]
    network: NetworkKind,

    /// Whether to wipe the arm observations from the trajectories
    #[arg(long = "drop_arm_obs")]
    drop_arm_obs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = ExperimentConfig::new(cli.network, cli.drop_arm_obs);

    let summary = run(&cli.root_dir, &config)
        .await
        .with_context(|| format!("training failed under {}", cli.root_dir.display()))?;

    info!(
        run_id = %summary.run_id,
        loops = summary.completed_loops,
        train_step = summary.train_step,
        regret = summary.metrics.get("RegretMetric"),
        suboptimal_arms = summary.metrics.get("SuboptimalArmsMetric"),
        "training finished"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT_ENV: &str = "TEST_UNDECLARED_OUTPUTS_DIR";

    #[test]
    fn test_explicit_flags() {
        let cli = Cli::try_parse_from([
            "train_eval_per_arm_stationary_linear",
            "--root_dir",
            "/tmp/run",
            "--network",
            "dotproduct",
            "--drop_arm_obs",
        ])
        .unwrap();
        assert_eq!(cli.root_dir, PathBuf::from("/tmp/run"));
        assert_eq!(cli.network, NetworkKind::DotProduct);
        assert!(cli.drop_arm_obs);
    }

    #[test]
    fn test_unknown_network_rejected() {
        let result = Cli::try_parse_from([
            "train_eval_per_arm_stationary_linear",
            "--root_dir",
            "/tmp/run",
            "--network",
            "rnn",
        ]);
        assert!(result.is_err());
    }

    // Both cases touch the same process-wide variable, so they share a test.
    #[test]
    fn test_root_dir_from_environment() {
        std::env::remove_var(ROOT_ENV);
        assert!(Cli::try_parse_from(["train_eval_per_arm_stationary_linear"]).is_err());

        std::env::set_var(ROOT_ENV, "/tmp/envdir");
        let parsed = Cli::try_parse_from(["train_eval_per_arm_stationary_linear"]);
        std::env::remove_var(ROOT_ENV);

        let cli = parsed.unwrap();
        assert_eq!(cli.root_dir, PathBuf::from("/tmp/envdir"));
        assert_eq!(cli.network, NetworkKind::CommonTower);
        assert!(!cli.drop_arm_obs);
    }
}
