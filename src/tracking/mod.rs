pub mod loss_tracker;

pub use loss_tracker::LossTracker;
