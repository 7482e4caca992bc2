pub mod distributed;
pub mod indicator;

pub use distributed::DistributedProgressBar;
pub use indicator::{ConsoleProgress, DrawTarget, NoopProgress, ProgressIndicator};
