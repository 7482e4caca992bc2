pub mod run_config;

pub use run_config::{
    AcceleratorSection, DataSection, DataSourceConfig, LoggingSection, OptimizerSection, ProjectSection, RunConfig,
    SchedulerKind, SchedulerSection, TrainerSection,
};
