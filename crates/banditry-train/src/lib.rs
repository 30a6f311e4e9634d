//! Training loop and metrics for contextual bandit agents
//!
//! This crate provides:
//! - `StepDriver`, which collects batched steps with a policy
//! - Training metrics, including regret and suboptimal-arm rate
//! - `train`, a checkpointed training loop writing JSON-lines summaries

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod driver;
pub mod metrics;
pub mod trainer;

pub use driver::StepDriver;
pub use metrics::{
    AverageReturnMetric, EnvironmentSteps, MetricValues, NumberOfEpisodes, OptimalActionFn,
    OptimalRewardFn, RegretMetric, SuboptimalArmsMetric, TrainMetric,
};
pub use trainer::{train, train_with_options, SummaryRecord, TrainerOptions, TrainingSummary};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        train, train_with_options, RegretMetric, StepDriver, SuboptimalArmsMetric, TrainMetric,
        TrainerOptions, TrainingSummary,
    };
    pub use banditry_core::prelude::*;
}
