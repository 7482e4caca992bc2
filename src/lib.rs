pub mod activation;
pub mod checkpoint;
pub mod config;
pub mod data;
pub mod distributed;
pub mod error;
pub mod layers;
pub mod loss;
pub mod math;
pub mod metrics;
pub mod model;
pub mod network;
pub mod optim;
pub mod progress;
pub mod run;
pub mod tracking;
pub mod train;

// Convenience re-exports
pub use activation::activation::ActivationFunction;
pub use checkpoint::CheckpointManager;
pub use config::RunConfig;
pub use data::{Batch, DataSource, InMemoryDataSource, Sample};
pub use distributed::{ExecutionContext, LocalContext, ProjectConfig, RankInfo};
pub use error::{Result, TrainError};
pub use layers::dense::Layer;
pub use loss::LossType;
pub use math::matrix::Matrix;
pub use metrics::{Metrics, MetricsSink};
pub use model::{Model, SavePretrained};
pub use network::{Network, NetworkSpec};
pub use optim::{LrScheduler, Optimizer, Sgd};
pub use progress::DistributedProgressBar;
pub use run::run_from_config;
pub use tracking::LossTracker;
pub use train::{evaluate, Trainer, TrainerOptions, TrainingSummary};
