pub mod context;
pub mod local;
pub mod project;
pub mod role;

pub use context::{AccumulationStep, ExecutionContext};
pub use local::LocalContext;
pub use project::ProjectConfig;
pub use role::{ProcessRole, RankInfo};
