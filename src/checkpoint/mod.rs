pub mod manager;
pub mod naming;

pub use manager::CheckpointManager;
pub use naming::{checkpoint_dir_name, trailing_index};
