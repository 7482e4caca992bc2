pub mod epoch_stats;
pub mod evaluate;
pub mod train_config;
pub mod trainer;

pub use epoch_stats::{EpochSummary, TrainingSummary};
pub use evaluate::evaluate;
pub use train_config::TrainerOptions;
pub use trainer::Trainer;
