//! Training loop for bandit agents
//!
//! Each loop collects `steps_per_loop` batched steps with the agent's collect
//! policy, trains once on everything collected, and records the loss and
//! metrics. Everything is written under `root_dir/train`:
//!
//! - `config.json`: effective configuration of the run
//! - `summaries.jsonl`: one line per training loop
//! - `checkpoint/ckpt.json`: loop counter and metric state, naming the
//!   `checkpoint/agent-<train_step>.json` agent snapshot it belongs to
//!
//! Checkpoint files are written to a `.tmp` sibling and renamed into place.
//! `ckpt.json` is replaced last, so it only ever names a complete snapshot.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use banditry_agents::TrajectoryBuffer;
use banditry_core::{
    ActionSpec, Agent, BanditError, Environment, LossInfo, ObservationSpec, Result, TimeStepSpec,
    TrajectoryTransform,
};

use crate::driver::StepDriver;
use crate::metrics::{
    AverageReturnMetric, EnvironmentSteps, MetricValues, NumberOfEpisodes, TrainMetric,
};

/// Subdirectory of `root_dir` holding training output
pub const TRAIN_DIR: &str = "train";
/// Checkpoint subdirectory of the train directory
pub const CHECKPOINT_DIR: &str = "checkpoint";
/// Trainer checkpoint file name
pub const CHECKPOINT_FILE: &str = "ckpt.json";
/// Prefix of agent snapshot file names
pub const AGENT_FILE_PREFIX: &str = "agent-";
/// Run configuration file name
pub const CONFIG_FILE: &str = "config.json";
/// Per-loop summaries file name
pub const SUMMARIES_FILE: &str = "summaries.jsonl";

/// Trainer options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerOptions {
    /// Save a checkpoint every this many loops (0: only after the last loop)
    pub checkpoint_interval: usize,
    /// Log metrics every this many loops
    pub log_interval: usize,
    /// Seed for the collect policy's randomness
    pub seed: Option<u64>,
    /// Caller configuration recorded in `config.json`
    pub experiment_config: Option<Value>,
}

impl Default for TrainerOptions {
    fn default() -> Self {
        Self {
            checkpoint_interval: 100,
            log_interval: 1,
            seed: None,
            experiment_config: None,
        }
    }
}

/// Result of a call to `train`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    /// Run identifier, kept across resumed runs
    pub run_id: Uuid,
    /// Loops run by this call
    pub loops_run: usize,
    /// Loops completed in total, including restored ones
    pub completed_loops: usize,
    /// Agent train step after the last loop
    pub train_step: u64,
    /// Final metric values
    pub metrics: MetricValues,
    /// Loss of the last loop run by this call
    pub last_loss: Option<LossInfo>,
}

/// One line of `summaries.jsonl`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRecord {
    /// Run identifier
    pub run_id: Uuid,
    /// Time the loop finished
    pub timestamp: DateTime<Utc>,
    /// 1-based loop number
    pub iteration: usize,
    /// Agent train step
    pub train_step: u64,
    /// Training loss
    pub loss: LossInfo,
    /// Metric values after the loop
    pub metrics: MetricValues,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TrainerCheckpoint {
    run_id: Uuid,
    completed_loops: usize,
    train_step: u64,
    saved_at: DateTime<Utc>,
    agent_file: String,
    metrics: BTreeMap<String, Value>,
}

#[derive(Debug, Serialize)]
struct RunConfig<'a> {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    training_loops: usize,
    steps_per_loop: usize,
    batch_size: usize,
    time_step_spec: TimeStepSpec,
    action_spec: ActionSpec,
    training_data_spec: ObservationSpec,
    metrics: Vec<&'a str>,
    options: &'a TrainerOptions,
}

/// Appends JSON lines to the summaries file
struct SummaryWriter {
    file: File,
}

impl SummaryWriter {
    async fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path).await?;
        Ok(Self { file })
    }

    async fn write(&mut self, record: &SummaryRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        self.file.write_all(line.as_bytes()).await?;
        self.file.flush().await?;
        Ok(())
    }
}

struct Paths {
    train: PathBuf,
    checkpoint_dir: PathBuf,
}

impl Paths {
    fn new(root_dir: &Path) -> Self {
        let train = root_dir.join(TRAIN_DIR);
        let checkpoint_dir = train.join(CHECKPOINT_DIR);
        Self {
            train,
            checkpoint_dir,
        }
    }

    fn checkpoint(&self) -> PathBuf {
        self.checkpoint_dir.join(CHECKPOINT_FILE)
    }

    fn agent(&self, file_name: &str) -> PathBuf {
        self.checkpoint_dir.join(file_name)
    }
}

fn agent_file_name(train_step: u64) -> String {
    format!("{AGENT_FILE_PREFIX}{train_step}.json")
}

/// Sibling path a file is written to before being renamed over `path`
fn temporary_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

async fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let tmp = temporary_path(path);
    tokio::fs::write(&tmp, contents).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Remove agent snapshots and temporaries other than `keep`
async fn prune_checkpoints(paths: &Paths, keep: &str) -> Result<()> {
    let mut entries = tokio::fs::read_dir(&paths.checkpoint_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let stale_agent = name.starts_with(AGENT_FILE_PREFIX) && name != keep;
        if stale_agent || name.ends_with(".tmp") {
            tokio::fs::remove_file(entry.path()).await?;
        }
    }
    Ok(())
}

/// Train with default options
pub async fn train<A, E>(
    root_dir: &Path,
    agent: &mut A,
    environment: &mut E,
    training_loops: usize,
    steps_per_loop: usize,
    additional_metrics: Vec<Box<dyn TrainMetric>>,
    training_data_spec_transformation_fn: Option<TrajectoryTransform>,
) -> Result<TrainingSummary>
where
    A: Agent + ?Sized,
    E: Environment + ?Sized,
{
    train_with_options(
        root_dir,
        agent,
        environment,
        training_loops,
        steps_per_loop,
        additional_metrics,
        training_data_spec_transformation_fn,
        &TrainerOptions::default(),
    )
    .await
}

/// Train `agent` on `environment` for `training_loops` loops
///
/// Resumes from `root_dir/train/checkpoint` when a checkpoint is present;
/// loops already completed there are not run again.
#[allow(clippy::too_many_arguments)]
pub async fn train_with_options<A, E>(
    root_dir: &Path,
    agent: &mut A,
    environment: &mut E,
    training_loops: usize,
    steps_per_loop: usize,
    additional_metrics: Vec<Box<dyn TrainMetric>>,
    training_data_spec_transformation_fn: Option<TrajectoryTransform>,
    options: &TrainerOptions,
) -> Result<TrainingSummary>
where
    A: Agent + ?Sized,
    E: Environment + ?Sized,
{
    if training_loops == 0 {
        return Err(BanditError::InvalidParameter(
            "training_loops must be positive".to_string(),
        ));
    }
    if steps_per_loop == 0 {
        return Err(BanditError::InvalidParameter(
            "steps_per_loop must be positive".to_string(),
        ));
    }
    if options.log_interval == 0 {
        return Err(BanditError::InvalidParameter(
            "log_interval must be positive".to_string(),
        ));
    }

    let paths = Paths::new(root_dir);
    tokio::fs::create_dir_all(&paths.checkpoint_dir).await?;

    let batch_size = environment.batch_size();
    let mut metrics: Vec<Box<dyn TrainMetric>> = vec![
        Box::new(NumberOfEpisodes::new()),
        Box::new(EnvironmentSteps::new()),
        Box::new(AverageReturnMetric::new(10 * batch_size)),
    ];
    metrics.extend(additional_metrics);

    let mut run_id = Uuid::new_v4();
    let mut completed = 0;
    if tokio::fs::try_exists(paths.checkpoint()).await? {
        let checkpoint = restore(&paths, agent, &mut metrics).await?;
        run_id = checkpoint.run_id;
        completed = checkpoint.completed_loops;
    }

    let config = RunConfig {
        run_id,
        started_at: Utc::now(),
        training_loops,
        steps_per_loop,
        batch_size,
        time_step_spec: agent.time_step_spec(),
        action_spec: agent.action_spec(),
        training_data_spec: agent.training_data_spec(),
        metrics: metrics.iter().map(|m| m.name()).collect(),
        options,
    };
    tokio::fs::write(
        paths.train.join(CONFIG_FILE),
        serde_json::to_string_pretty(&config)?,
    )
    .await?;

    info!(
        %run_id,
        training_loops,
        steps_per_loop,
        batch_size,
        resumed_from = completed,
        "starting training"
    );

    let mut driver = StepDriver::new(steps_per_loop, options.seed)?;
    let mut buffer = TrajectoryBuffer::new(steps_per_loop)?;
    let mut summaries = SummaryWriter::open(&paths.train.join(SUMMARIES_FILE)).await?;
    let transform = training_data_spec_transformation_fn.as_ref();

    let start = completed;
    let mut last_loss = None;
    for iteration in (start + 1)..=training_loops {
        driver
            .run(
                &mut *environment,
                agent.collect_policy(),
                &mut metrics,
                &mut buffer,
                transform,
            )
            .await?;

        let experience = buffer.gather_all()?;
        let loss = agent.train(&experience).await?;
        buffer.clear();

        let train_step = agent.train_step_counter();
        let values = MetricValues::collect(&metrics);
        if iteration % options.log_interval == 0 {
            info!(iteration, train_step, loss = loss.loss, "training loop");
            for (name, value) in &values.0 {
                info!(iteration, metric = %name, value, "metric");
            }
        }

        summaries.write(&SummaryRecord {
            run_id,
            timestamp: Utc::now(),
            iteration,
            train_step,
            loss,
            metrics: values,
        })
        .await?;

        let periodic = options.checkpoint_interval > 0 && iteration % options.checkpoint_interval == 0;
        if periodic || iteration == training_loops {
            save(&paths, agent, &metrics, run_id, iteration).await?;
        }
        last_loss = Some(loss);
    }

    Ok(TrainingSummary {
        run_id,
        loops_run: training_loops.saturating_sub(start),
        completed_loops: training_loops.max(start),
        train_step: agent.train_step_counter(),
        metrics: MetricValues::collect(&metrics),
        last_loss,
    })
}

async fn save<A: Agent + ?Sized>(
    paths: &Paths,
    agent: &A,
    metrics: &[Box<dyn TrainMetric>],
    run_id: Uuid,
    completed_loops: usize,
) -> Result<()> {
    let train_step = agent.train_step_counter();
    let agent_file = agent_file_name(train_step);
    let agent_path = paths.agent(&agent_file);
    let agent_tmp = temporary_path(&agent_path);
    agent.save(&agent_tmp).await?;
    tokio::fs::rename(&agent_tmp, &agent_path).await?;

    let checkpoint = TrainerCheckpoint {
        run_id,
        completed_loops,
        train_step,
        saved_at: Utc::now(),
        agent_file,
        metrics: metrics
            .iter()
            .map(|m| (m.name().to_string(), m.state()))
            .collect(),
    };
    write_atomic(&paths.checkpoint(), &serde_json::to_string_pretty(&checkpoint)?).await?;
    prune_checkpoints(paths, &checkpoint.agent_file).await?;
    debug!(completed_loops, path = %paths.checkpoint().display(), "saved checkpoint");
    Ok(())
}

async fn restore<A: Agent + ?Sized>(
    paths: &Paths,
    agent: &mut A,
    metrics: &mut [Box<dyn TrainMetric>],
) -> Result<TrainerCheckpoint> {
    let json = tokio::fs::read_to_string(paths.checkpoint()).await?;
    let mut checkpoint: TrainerCheckpoint = serde_json::from_str(&json)?;
    agent.load(&paths.agent(&checkpoint.agent_file)).await?;
    if agent.train_step_counter() != checkpoint.train_step {
        return Err(BanditError::Agent(format!(
            "{} holds train step {}, checkpoint expects {}",
            checkpoint.agent_file,
            agent.train_step_counter(),
            checkpoint.train_step
        )));
    }

    for metric in metrics.iter_mut() {
        if let Some(state) = checkpoint.metrics.remove(metric.name()) {
            metric.restore(state)?;
        }
    }

    warn!(
        run_id = %checkpoint.run_id,
        completed_loops = checkpoint.completed_loops,
        train_step = checkpoint.train_step,
        saved_at = %checkpoint.saved_at,
        "restored training from checkpoint"
    );
    Ok(checkpoint)
}
